//! Memts Config - Configuration Structures
//!
//! Configuration types for the memts database. Supports loading from TOML
//! files and programmatic construction. Every field has a default, so a
//! configuration document only needs to name what it overrides.
//!
//! Key Features:
//! - Series cardinality limits per measurement
//! - Default result limit for queries
//! - Aggregation policy for missing fields and empty inputs
//!
//! @version 0.1.0
//! @author Memts Development Team

use crate::error::{MemtsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// Aggregation Configuration
// =============================================================================

/// What an aggregation does with a point that lacks the target field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingFieldPolicy {
    /// Fail the whole aggregation with `MissingField`.
    #[default]
    Fail,
    /// Leave the point out of the computation.
    Skip,
}

/// Configuration for aggregation over query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub missing_field: MissingFieldPolicy,
    pub empty_sum_is_zero: bool,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            missing_field: MissingFieldPolicy::Fail,
            empty_sum_is_zero: true,
        }
    }
}

// =============================================================================
// Database Configuration
// =============================================================================

/// Top-level database configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub max_series_per_measurement: Option<usize>,
    pub default_query_limit: Option<usize>,
    pub aggregate: AggregateConfig,
}

impl DatabaseConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| MemtsError::Configuration(e.to_string()))
    }

    /// Set the maximum number of series a single measurement may hold.
    pub fn with_max_series_per_measurement(mut self, limit: usize) -> Self {
        self.max_series_per_measurement = Some(limit);
        self
    }

    /// Set the limit applied to queries that do not set their own.
    pub fn with_default_query_limit(mut self, limit: usize) -> Self {
        self.default_query_limit = Some(limit);
        self
    }

    pub fn with_aggregate(mut self, aggregate: AggregateConfig) -> Self {
        self.aggregate = aggregate;
        self
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_series_per_measurement, None);
        assert_eq!(config.default_query_limit, None);
        assert_eq!(config.aggregate.missing_field, MissingFieldPolicy::Fail);
        assert!(config.aggregate.empty_sum_is_zero);
    }

    #[test]
    fn test_from_toml_str() {
        let config = DatabaseConfig::from_toml_str(
            r#"
            max_series_per_measurement = 10

            [aggregate]
            missing_field = "skip"
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.max_series_per_measurement, Some(10));
        assert_eq!(config.default_query_limit, None);
        assert_eq!(config.aggregate.missing_field, MissingFieldPolicy::Skip);
        assert!(config.aggregate.empty_sum_is_zero);
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let result = DatabaseConfig::from_toml_str("max_series_per_measurement = \"many\"");
        assert!(matches!(result, Err(MemtsError::Configuration(_))));
    }

    #[test]
    fn test_from_missing_file() {
        let result = DatabaseConfig::from_file("/nonexistent/memts.toml");
        assert!(matches!(result, Err(MemtsError::Io(_))));
    }

    #[test]
    fn test_builders() {
        let config = DatabaseConfig::default()
            .with_max_series_per_measurement(3)
            .with_default_query_limit(100);
        assert_eq!(config.max_series_per_measurement, Some(3));
        assert_eq!(config.default_query_limit, Some(100));
    }
}
