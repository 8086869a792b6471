//! Memts Aggregation
//!
//! Aggregation functions over query results. Each aggregation reads one
//! named field from every input point and produces a synthetic summary
//! point stamped with the time of computation.
//!
//! @version 0.1.0
//! @author Memts Development Team

use crate::types::{FieldValue, Point};
use chrono::{DateTime, Utc};
use memts_common::{AggregateConfig, MemtsError, MissingFieldPolicy, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tag key marking a point as derived by an aggregation.
pub const AGGREGATE_TAG: &str = "aggregate";

// =============================================================================
// Aggregate Function
// =============================================================================

/// Aggregation function type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunction {
    Sum,
    Mean,
    Min,
    Max,
    Count,
}

impl AggregateFunction {
    /// Apply the aggregation to a set of values; `None` when undefined.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        match self {
            Self::Count => return Some(values.len() as f64),
            _ if values.is_empty() => return None,
            _ => {}
        }

        Some(match self {
            Self::Sum => values.iter().sum(),
            Self::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Count => values.len() as f64,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
        }
    }
}

impl FromStr for AggregateFunction {
    type Err = MemtsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "mean" | "avg" | "average" => Ok(Self::Mean),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "count" => Ok(Self::Count),
            other => Err(MemtsError::validation(format!(
                "unknown aggregate function '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type TimeWindow = (DateTime<Utc>, DateTime<Utc>);

// =============================================================================
// Aggregate
// =============================================================================

/// An aggregation result together with the input span it covers.
///
/// `start_time` and `end_time` are `None` when no input point carried the
/// field (an empty sum or count).
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub function: AggregateFunction,
    pub point: Point,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

// =============================================================================
// Aggregator
// =============================================================================

/// Aggregates point lists under a fixed missing-field and empty-input policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    config: AggregateConfig,
}

impl Aggregator {
    pub fn new(config: AggregateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregateConfig {
        &self.config
    }

    /// Compute `function` over `field` of every point.
    pub fn aggregate(&self, function: AggregateFunction, points: &[Point], field: &str) -> Result<Point> {
        self.aggregate_window(function, points, field).map(|aggregate| aggregate.point)
    }

    /// Like [`Aggregator::aggregate`], also reporting the span of input
    /// timestamps that contributed a value.
    pub fn aggregate_window(
        &self,
        function: AggregateFunction,
        points: &[Point],
        field: &str,
    ) -> Result<Aggregate> {
        let (values, window) = self.extract(points, field)?;

        let result = match function.apply(&values) {
            Some(value) => value,
            None if function == AggregateFunction::Sum && self.config.empty_sum_is_zero => 0.0,
            None => {
                return Err(MemtsError::EmptyResult(format!(
                    "{} of field '{}' over no values",
                    function, field
                )))
            }
        };

        let value = match function {
            AggregateFunction::Count => FieldValue::Integer(values.len() as i64),
            _ => FieldValue::Float(result),
        };

        let point = Point::new(Self::result_measurement(function, points))
            .with_field(field, value)
            .with_tag(AGGREGATE_TAG, function.name())
            .with_timestamp(Utc::now());

        Ok(Aggregate {
            function,
            point,
            start_time: window.map(|(start, _)| start),
            end_time: window.map(|(_, end)| end),
        })
    }

    pub fn sum(&self, points: &[Point], field: &str) -> Result<Point> {
        self.aggregate(AggregateFunction::Sum, points, field)
    }

    pub fn mean(&self, points: &[Point], field: &str) -> Result<Point> {
        self.aggregate(AggregateFunction::Mean, points, field)
    }

    pub fn min(&self, points: &[Point], field: &str) -> Result<Point> {
        self.aggregate(AggregateFunction::Min, points, field)
    }

    pub fn max(&self, points: &[Point], field: &str) -> Result<Point> {
        self.aggregate(AggregateFunction::Max, points, field)
    }

    pub fn count(&self, points: &[Point], field: &str) -> Result<Point> {
        self.aggregate(AggregateFunction::Count, points, field)
    }

    /// Values of `field` plus the earliest and latest timestamp among the
    /// points that supplied one.
    fn extract(&self, points: &[Point], field: &str) -> Result<(Vec<f64>, Option<TimeWindow>)> {
        let mut values = Vec::with_capacity(points.len());
        let mut window: Option<TimeWindow> = None;

        for point in points {
            match (point.field(field), self.config.missing_field) {
                (Some(value), _) => {
                    values.push(value.as_f64());
                    let ts = point.timestamp();
                    window = Some(match window {
                        Some((start, end)) => (start.min(ts), end.max(ts)),
                        None => (ts, ts),
                    });
                }
                (None, MissingFieldPolicy::Skip) => {}
                (None, MissingFieldPolicy::Fail) => {
                    return Err(MemtsError::MissingField {
                        field: field.to_string(),
                        measurement: point.measurement().to_string(),
                    })
                }
            }
        }

        Ok((values, window))
    }

    /// The shared input measurement, or the function name for mixed input.
    fn result_measurement(function: AggregateFunction, points: &[Point]) -> String {
        match points.split_first() {
            Some((first, rest)) if rest.iter().all(|p| p.measurement() == first.measurement()) => {
                first.measurement().to_string()
            }
            _ => function.name().to_string(),
        }
    }
}

// =============================================================================
// Default-Policy Functions
// =============================================================================

/// Sum of `field`; fails on a point missing the field, 0 for no points.
pub fn sum(points: &[Point], field: &str) -> Result<Point> {
    Aggregator::default().sum(points, field)
}

/// Arithmetic mean of `field`; fails on missing field or no points.
pub fn mean(points: &[Point], field: &str) -> Result<Point> {
    Aggregator::default().mean(points, field)
}

pub fn min(points: &[Point], field: &str) -> Result<Point> {
    Aggregator::default().min(points, field)
}

pub fn max(points: &[Point], field: &str) -> Result<Point> {
    Aggregator::default().max(points, field)
}

pub fn count(points: &[Point], field: &str) -> Result<Point> {
    Aggregator::default().count(points, field)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};

    fn create_test_points() -> Vec<Point> {
        let base_time = DateTime::from_timestamp(1_700_000_000, 0).expect("valid base time");
        [85, 75, 55, 65]
            .iter()
            .enumerate()
            .map(|(i, v)| {
                Point::new("cpu")
                    .with_field("value", *v)
                    .with_tag("region", "us-east")
                    .with_timestamp(base_time + Duration::minutes(i as i64))
            })
            .collect()
    }

    fn result_value(point: &Point, field: &str) -> f64 {
        point.field(field).map(|v| v.as_f64()).unwrap_or(f64::NAN)
    }

    #[test]
    fn test_aggregate_functions() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];

        assert_eq!(AggregateFunction::Sum.apply(&values), Some(15.0));
        assert_eq!(AggregateFunction::Count.apply(&values), Some(5.0));
        assert_eq!(AggregateFunction::Min.apply(&values), Some(1.0));
        assert_eq!(AggregateFunction::Max.apply(&values), Some(5.0));
        assert_eq!(AggregateFunction::Mean.apply(&values), Some(3.0));
        assert_eq!(AggregateFunction::Mean.apply(&[]), None);
        assert_eq!(AggregateFunction::Count.apply(&[]), Some(0.0));
    }

    #[test]
    fn test_aggregate_points() {
        let points = create_test_points();

        assert_eq!(result_value(&sum(&points, "value").expect("sum"), "value"), 280.0);
        assert_eq!(result_value(&mean(&points, "value").expect("mean"), "value"), 70.0);
        assert_eq!(result_value(&min(&points, "value").expect("min"), "value"), 55.0);
        assert_eq!(result_value(&max(&points, "value").expect("max"), "value"), 85.0);
        assert_eq!(
            count(&points, "value").expect("count").field("value"),
            Some(FieldValue::Integer(4))
        );
    }

    #[test]
    fn test_result_point_shape() {
        let points = create_test_points();
        let before = Utc::now();
        let result = max(&points, "value").expect("max");

        assert_eq!(result.measurement(), "cpu");
        assert_eq!(result.fields().len(), 1);
        assert_eq!(result.tags().get(AGGREGATE_TAG), Some(&"max".to_string()));
        assert_eq!(result.tags().len(), 1);
        assert!(result.timestamp() >= before);
        assert!(points.iter().all(|p| p.timestamp() < result.timestamp()));
    }

    #[test]
    fn test_mixed_measurements() {
        let mut points = create_test_points();
        points.push(Point::new("mem").with_field("value", 5));

        let result = sum(&points, "value").expect("sum");
        assert_eq!(result.measurement(), "sum");
        assert_eq!(result_value(&result, "value"), 285.0);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(result_value(&sum(&[], "value").expect("empty sum"), "value"), 0.0);
        assert!(matches!(mean(&[], "value"), Err(MemtsError::EmptyResult(_))));
        assert!(matches!(min(&[], "value"), Err(MemtsError::EmptyResult(_))));
        assert!(matches!(max(&[], "value"), Err(MemtsError::EmptyResult(_))));

        let strict = Aggregator::new(AggregateConfig {
            empty_sum_is_zero: false,
            ..AggregateConfig::default()
        });
        assert!(matches!(strict.sum(&[], "value"), Err(MemtsError::EmptyResult(_))));
    }

    #[test]
    fn test_missing_field_fails_by_default() {
        let mut points = create_test_points();
        points.push(Point::new("cpu").with_field("other", 1));

        assert!(matches!(
            mean(&points, "value"),
            Err(MemtsError::MissingField { .. })
        ));
    }

    #[test]
    fn test_missing_field_skip_policy() {
        let skipping = Aggregator::new(AggregateConfig {
            missing_field: MissingFieldPolicy::Skip,
            ..AggregateConfig::default()
        });

        let mut points = create_test_points();
        points.push(Point::new("cpu").with_field("other", 1));

        assert_eq!(result_value(&skipping.mean(&points, "value").expect("mean"), "value"), 70.0);
        assert!(matches!(
            skipping.min(&points[4..], "value"),
            Err(MemtsError::EmptyResult(_))
        ));
    }

    #[test]
    fn test_aggregate_window() {
        let mut points = create_test_points();
        points.reverse();
        let first = points[3].timestamp();
        let last = points[0].timestamp();

        let aggregate = Aggregator::default()
            .aggregate_window(AggregateFunction::Mean, &points, "value")
            .expect("mean");
        assert_eq!(aggregate.function, AggregateFunction::Mean);
        assert_eq!(result_value(&aggregate.point, "value"), 70.0);
        assert_eq!(aggregate.start_time, Some(first));
        assert_eq!(aggregate.end_time, Some(last));
    }

    #[test]
    fn test_aggregate_window_skips_points_without_field() {
        let skipping = Aggregator::new(AggregateConfig {
            missing_field: MissingFieldPolicy::Skip,
            ..AggregateConfig::default()
        });

        let mut points = create_test_points();
        let last = points[3].timestamp();
        points.push(
            Point::new("cpu")
                .with_field("other", 1)
                .with_timestamp(last + Duration::hours(1)),
        );

        let aggregate = skipping
            .aggregate_window(AggregateFunction::Max, &points, "value")
            .expect("max");
        assert_eq!(aggregate.end_time, Some(last));

        let empty = Aggregator::default()
            .aggregate_window(AggregateFunction::Sum, &[], "value")
            .expect("empty sum");
        assert_eq!(empty.start_time, None);
        assert_eq!(empty.end_time, None);
    }

    #[test]
    fn test_function_names() {
        assert_eq!("avg".parse::<AggregateFunction>().ok(), Some(AggregateFunction::Mean));
        assert_eq!("MAX".parse::<AggregateFunction>().ok(), Some(AggregateFunction::Max));
        assert!("median".parse::<AggregateFunction>().is_err());
        assert_eq!(AggregateFunction::Count.to_string(), "count");
    }
}
