//! Memts Engine - Series Storage and Query Engine
//!
//! In-memory time series store. Accepts timestamped measurements tagged
//! with metadata, groups them into series and answers range, tag and field
//! filter queries plus simple aggregations.
//!
//! Key Features:
//! - Canonical series identity from measurement and sorted tag pairs
//! - Per-series storage kept sorted under out-of-order writes
//! - Measurement index for measurement and partial-tag lookups
//! - Fluent query builder with field predicates and limits
//! - Sum, mean, min, max and count aggregations
//!
//! @version 0.1.0
//! @author Memts Development Team

pub mod types;
pub mod series;
pub mod index;
pub mod query;
pub mod aggregation;
pub mod database;

pub use types::{FieldValue, Fields, Point, SeriesKey, Tags};
pub use series::SeriesStore;
pub use index::SeriesIndex;
pub use query::{FieldPredicate, Operator, Query, QueryBuilder, QueryExecutor};
pub use aggregation::{Aggregate, AggregateFunction, Aggregator};
pub use database::{Database, DatabaseStats};

pub use memts_common::{AggregateConfig, DatabaseConfig, MemtsError, MissingFieldPolicy, Result};
