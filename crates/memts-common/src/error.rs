//! Memts Error - Unified Error Types
//!
//! Error handling for all memts operations. Every error is raised
//! synchronously at the point of misuse; nothing is retried internally.
//!
//! Key Features:
//! - Write validation errors for malformed points
//! - Query errors for unsupported field predicate operators
//! - Aggregation errors for missing fields and empty inputs
//! - User vs system error classification
//!
//! @version 0.1.0
//! @author Memts Development Team

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Unified error type for all memts operations.
#[derive(Error, Debug)]
pub enum MemtsError {
    // Write errors
    #[error("validation error: {0}")]
    Validation(String),

    #[error("series limit exceeded for measurement '{measurement}': at most {limit} series")]
    SeriesLimitExceeded { measurement: String, limit: usize },

    // Query errors
    #[error("invalid operator: {0}")]
    InvalidOperator(String),

    // Aggregation errors
    #[error("missing field '{field}' in point of measurement '{measurement}'")]
    MissingField { field: String, measurement: String },

    #[error("empty result: {0}")]
    EmptyResult(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Type Aliases
// =============================================================================

/// Result type alias for memts operations.
pub type Result<T> = std::result::Result<T, MemtsError>;

// =============================================================================
// Error Classification
// =============================================================================

impl MemtsError {
    /// Returns true if the operation can be safely retried.
    ///
    /// The store is purely in-memory, so no failure is transient.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Returns true if this is a user error (vs system error).
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            MemtsError::Validation(_)
                | MemtsError::SeriesLimitExceeded { .. }
                | MemtsError::InvalidOperator(_)
                | MemtsError::MissingField { .. }
                | MemtsError::EmptyResult(_)
        )
    }

    /// Convenience constructor for validation failures.
    pub fn validation(msg: impl Into<String>) -> Self {
        MemtsError::Validation(msg.into())
    }
}

// =============================================================================
// Tests
// =============================================================================
