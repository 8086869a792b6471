//! Memts Query
//!
//! Query criteria, the fluent query builder and query execution against
//! the series index.
//!
//! @version 0.1.0
//! @author Memts Development Team

use crate::database::Database;
use crate::index::SeriesIndex;
use crate::types::{FieldValue, Point, Tags};
use chrono::{DateTime, Utc};
use memts_common::{MemtsError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Operator
// =============================================================================

/// Comparison operator of a field predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl Operator {
    /// Evaluate `lhs <op> rhs`. Incomparable values (NaN) only satisfy `!=`.
    pub fn apply(&self, lhs: &FieldValue, rhs: &FieldValue) -> bool {
        let ordering = lhs.compare(rhs);
        match self {
            Self::Eq => ordering == Some(Ordering::Equal),
            Self::Ne => ordering != Some(Ordering::Equal),
            Self::Gt => ordering == Some(Ordering::Greater),
            Self::Lt => ordering == Some(Ordering::Less),
            Self::Gte => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            Self::Lte => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
        }
    }
}

impl FromStr for Operator {
    type Err = MemtsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "=" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            ">" => Ok(Self::Gt),
            "<" => Ok(Self::Lt),
            ">=" => Ok(Self::Gte),
            "<=" => Ok(Self::Lte),
            other => Err(MemtsError::InvalidOperator(format!(
                "unsupported operator '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Field Predicate
// =============================================================================

/// A comparison against one named field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPredicate {
    pub field: String,
    pub operator: Operator,
    pub value: FieldValue,
}

impl FieldPredicate {
    /// A point lacking the field never matches.
    pub fn matches(&self, point: &Point) -> bool {
        point
            .field(&self.field)
            .map(|v| self.operator.apply(&v, &self.value))
            .unwrap_or(false)
    }
}

// =============================================================================
// Query
// =============================================================================

/// Immutable query criteria.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub measurement: Option<String>,
    pub tags: Option<Tags>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub predicates: Vec<FieldPredicate>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a point against the field predicates (all must hold).
    pub fn matches_fields(&self, point: &Point) -> bool {
        self.predicates.iter().all(|p| p.matches(point))
    }
}

// =============================================================================
// Query Builder
// =============================================================================

/// Fluent builder accumulating query criteria.
///
/// An unsupported operator passed to `where_field` is remembered and
/// reported as `InvalidOperator` by `build` and by every `execute`.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
    invalid_operator: Option<String>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_measurement(mut self, measurement: impl Into<String>) -> Self {
        self.query.measurement = Some(measurement.into());
        self
    }

    /// Require every given tag pair; merges with earlier tag constraints.
    pub fn where_tags(mut self, tags: Tags) -> Self {
        self.query.tags.get_or_insert_with(Tags::new).extend(&tags);
        self
    }

    pub fn where_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query
            .tags
            .get_or_insert_with(Tags::new)
            .insert(key, value);
        self
    }

    /// Inclusive time bounds; replaces any earlier range.
    pub fn time_range(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.query.start = start;
        self.query.end = end;
        self
    }

    pub fn where_field(
        mut self,
        field: impl Into<String>,
        operator: &str,
        value: impl Into<FieldValue>,
    ) -> Self {
        match operator.parse::<Operator>() {
            Ok(operator) => self.query.predicates.push(FieldPredicate {
                field: field.into(),
                operator,
                value: value.into(),
            }),
            Err(_) => {
                if self.invalid_operator.is_none() {
                    self.invalid_operator = Some(operator.to_string());
                }
            }
        }
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.query.limit = Some(n);
        self
    }

    /// Finish building; fails if any predicate used an unsupported operator.
    pub fn build(&self) -> Result<Query> {
        if let Some(ref operator) = self.invalid_operator {
            return Err(MemtsError::InvalidOperator(format!(
                "unsupported operator '{}'",
                operator
            )));
        }
        Ok(self.query.clone())
    }

    /// Run the accumulated criteria. Repeatable and read-only.
    pub fn execute(&self, db: &Database) -> Result<Vec<Point>> {
        let query = self.build()?;
        Ok(db.execute_query(&query))
    }
}

// =============================================================================
// Query Executor
// =============================================================================

/// Executes queries against a series index.
pub struct QueryExecutor;

impl QueryExecutor {
    /// Narrow candidate series, range-scan each, merge by timestamp, filter
    /// by field predicates, then truncate to the limit.
    pub fn execute(query: &Query, index: &SeriesIndex, default_limit: Option<usize>) -> Vec<Point> {
        let candidates = index.candidates(query.measurement.as_deref(), query.tags.as_ref());
        let series_scanned = candidates.len();

        let mut results: Vec<Point> = candidates
            .into_iter()
            .flat_map(|store| store.range(query.start, query.end))
            .filter(|point| query.matches_fields(point))
            .cloned()
            .collect();

        // Stable, so ties keep series key order and insertion order.
        results.sort_by_key(|p| p.timestamp());

        if let Some(limit) = query.limit.or(default_limit) {
            results.truncate(limit);
        }

        tracing::debug!(
            measurement = query.measurement.as_deref().unwrap_or("*"),
            series_scanned,
            points_returned = results.len(),
            "executed query"
        );

        results
    }
}

// =============================================================================
// Tests
// =============================================================================
