//! Memts Database
//!
//! Owned database instance that coordinates writes, deletes and queries
//! over the series index. The whole index sits behind one read-write lock:
//! writers are exclusive and every query reads the state visible when it
//! started.
//!
//! @version 0.1.0
//! @author Memts Development Team

use crate::aggregation::{Aggregate, AggregateFunction, Aggregator};
use crate::index::SeriesIndex;
use crate::query::{Query, QueryBuilder, QueryExecutor};
use crate::types::{Fields, Point, SeriesKey, Tags};
use chrono::{DateTime, Utc};
use memts_common::{DatabaseConfig, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// Database
// =============================================================================

/// In-memory time series database.
pub struct Database {
    config: DatabaseConfig,
    index: RwLock<SeriesIndex>,
}

impl Database {
    /// Create an empty database with default configuration.
    pub fn new() -> Self {
        Self::with_config(DatabaseConfig::default())
    }

    /// Create an empty database with custom configuration.
    pub fn with_config(config: DatabaseConfig) -> Self {
        Self {
            index: RwLock::new(SeriesIndex::with_series_limit(
                config.max_series_per_measurement,
            )),
            config,
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Data Ingestion
    // -------------------------------------------------------------------------

    /// Write one sample. The timestamp defaults to now.
    pub fn write(
        &self,
        measurement: &str,
        fields: Fields,
        tags: Tags,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut point = Point::new(measurement).with_fields(fields).with_tags(tags);
        if let Some(timestamp) = timestamp {
            point = point.with_timestamp(timestamp);
        }
        self.write_point(point)
    }

    /// Validate and insert a prebuilt point.
    pub fn write_point(&self, point: Point) -> Result<()> {
        point.validate()?;

        let mut index = self.index.write();
        let store = index.resolve_or_create(point.measurement(), point.tags())?;
        store.insert(point);
        Ok(())
    }

    /// Write points in order. Not atomic: on the first failure the error
    /// is returned, earlier points stay written and later ones are skipped.
    pub fn write_points(&self, points: impl IntoIterator<Item = Point>) -> Result<()> {
        for (written, point) in points.into_iter().enumerate() {
            if let Err(e) = self.write_point(point) {
                tracing::warn!(written, error = %e, "batch write stopped partway");
                return Err(e);
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Querying
    // -------------------------------------------------------------------------

    /// Points matching measurement, tags and inclusive time bounds, ascending
    /// by timestamp across all matching series.
    pub fn query(
        &self,
        measurement: Option<&str>,
        tags: Option<&Tags>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Vec<Point> {
        let query = Query {
            measurement: measurement.map(str::to_string),
            tags: tags.cloned(),
            start,
            end,
            predicates: Vec::new(),
            limit,
        };
        self.execute_query(&query)
    }

    /// Start a new query builder.
    pub fn create_query(&self) -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Execute built criteria against a snapshot of the index.
    pub fn execute_query(&self, query: &Query) -> Vec<Point> {
        let index = self.index.read();
        QueryExecutor::execute(query, &index, self.config.default_query_limit)
    }

    /// Execute a query and aggregate one field of its result using the
    /// configured aggregation policy.
    pub fn aggregate(&self, query: &Query, function: AggregateFunction, field: &str) -> Result<Point> {
        self.aggregate_window(query, function, field)
            .map(|aggregate| aggregate.point)
    }

    /// Aggregate with the input time span. The configured default query
    /// limit does not apply here; only an explicit `query.limit` truncates
    /// the input.
    pub fn aggregate_window(
        &self,
        query: &Query,
        function: AggregateFunction,
        field: &str,
    ) -> Result<Aggregate> {
        let points = {
            let index = self.index.read();
            QueryExecutor::execute(query, &index, None)
        };
        Aggregator::new(self.config.aggregate).aggregate_window(function, &points, field)
    }

    // -------------------------------------------------------------------------
    // Series Management
    // -------------------------------------------------------------------------

    /// Remove every series of a measurement. Returns whether anything was removed.
    pub fn delete_measurement(&self, measurement: &str) -> bool {
        let removed = self.index.write().delete_measurement(measurement);
        if removed > 0 {
            tracing::info!(measurement, series = removed, "deleted measurement");
        }
        removed > 0
    }

    /// Remove one exact series. A missing series is not an error.
    pub fn delete_series(&self, measurement: &str, tags: &Tags) -> bool {
        let removed = self.index.write().delete_series(measurement, tags);
        if removed {
            tracing::info!(series = %SeriesKey::new(measurement, tags), "deleted series");
        }
        removed
    }

    /// Drop all data.
    pub fn clear(&self) {
        self.index.write().clear();
        tracing::info!("cleared database");
    }

    pub fn series_keys(&self) -> Vec<SeriesKey> {
        self.index.read().series_keys()
    }

    // -------------------------------------------------------------------------
    // Statistics
    // -------------------------------------------------------------------------

    pub fn get_measurements(&self) -> BTreeSet<String> {
        self.index.read().measurements()
    }

    pub fn get_series_count(&self) -> usize {
        self.index.read().len()
    }

    pub fn get_point_count(&self) -> usize {
        self.index.read().point_count()
    }

    /// Statistics derived from the index under one read lock.
    pub fn get_stats(&self) -> DatabaseStats {
        let index = self.index.read();
        let measurements = index.measurements();
        DatabaseStats {
            total_points: index.point_count(),
            series_count: index.len(),
            measurement_count: measurements.len(),
            measurements,
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Database Statistics
// =============================================================================

/// Point, series and measurement counts at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub total_points: usize,
    pub series_count: usize,
    pub measurement_count: usize,
    pub measurements: BTreeSet<String>,
}

// =============================================================================
// Tests
// =============================================================================
