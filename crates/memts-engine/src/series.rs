//! Memts Series Store
//!
//! Time-ordered point storage for a single series. Points are kept sorted
//! ascending by timestamp; equal timestamps keep their insertion order.
//!
//! @version 0.1.0
//! @author Memts Development Team

use crate::types::{Point, SeriesKey, Tags};
use chrono::{DateTime, Utc};

// =============================================================================
// Series Store
// =============================================================================

/// The points of one series, sorted by timestamp.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    key: SeriesKey,
    points: Vec<Point>,
}

impl SeriesStore {
    pub fn new(key: SeriesKey) -> Self {
        Self {
            key,
            points: Vec::new(),
        }
    }

    pub fn key(&self) -> &SeriesKey {
        &self.key
    }

    pub fn measurement(&self) -> &str {
        self.key.measurement()
    }

    pub fn tags(&self) -> Tags {
        self.key.to_tags()
    }

    /// Insert a point at its chronological position.
    ///
    /// The position is found by binary search after every point with an
    /// equal or earlier timestamp, so out-of-order writes keep the
    /// sequence sorted and ties stay in arrival order.
    pub fn insert(&mut self, point: Point) {
        let timestamp = point.timestamp();
        let idx = self.points.partition_point(|p| p.timestamp() <= timestamp);
        self.points.insert(idx, point);
    }

    /// Points with `start <= timestamp <= end`; a missing bound is open.
    pub fn range(&self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> &[Point] {
        let lo = match start {
            Some(start) => self.points.partition_point(|p| p.timestamp() < start),
            None => 0,
        };
        let hi = match end {
            Some(end) => self.points.partition_point(|p| p.timestamp() <= end),
            None => self.points.len(),
        };

        if lo >= hi {
            return &[];
        }
        &self.points[lo..hi]
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// The most recent `n` points, oldest first.
    pub fn latest(&self, n: usize) -> &[Point] {
        let start = self.points.len().saturating_sub(n);
        &self.points[start..]
    }

    /// The earliest `n` points.
    pub fn oldest(&self, n: usize) -> &[Point] {
        let end = n.min(self.points.len());
        &self.points[..end]
    }

    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.points.first()?.timestamp();
        let last = self.points.last()?.timestamp();
        Some((first, last))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Check if points are sorted by timestamp.
    pub fn is_sorted(&self) -> bool {
        self.points
            .windows(2)
            .all(|w| w[0].timestamp() <= w[1].timestamp())
    }

    pub fn remove_all(&mut self) {
        self.points.clear();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn base_time() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).expect("valid base time")
    }

    fn point_at(offset_secs: i64, value: i64) -> Point {
        Point::new("cpu")
            .with_field("value", value)
            .with_timestamp(base_time() + Duration::seconds(offset_secs))
    }

    fn create_test_store() -> SeriesStore {
        let mut store = SeriesStore::new(SeriesKey::new("cpu", &Tags::new()));
        for (offset, value) in [(30, 3), (10, 1), (50, 5), (20, 2), (40, 4)] {
            store.insert(point_at(offset, value));
        }
        store
    }

    fn values(points: &[Point]) -> Vec<f64> {
        points
            .iter()
            .map(|p| p.field("value").map(|v| v.as_f64()).unwrap_or(f64::NAN))
            .collect()
    }

    #[test]
    fn test_out_of_order_insert() {
        let store = create_test_store();
        assert!(store.is_sorted());
        assert_eq!(values(store.points()), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut store = SeriesStore::new(SeriesKey::new("cpu", &Tags::new()));
        store.insert(point_at(10, 1));
        store.insert(point_at(5, 0));
        store.insert(point_at(10, 2));
        store.insert(point_at(10, 3));

        assert_eq!(values(store.points()), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_range_bounds_inclusive() {
        let store = create_test_store();
        let start = base_time() + Duration::seconds(20);
        let end = base_time() + Duration::seconds(40);

        assert_eq!(values(store.range(Some(start), Some(end))), vec![2.0, 3.0, 4.0]);
        assert_eq!(values(store.range(Some(start), None)), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(values(store.range(None, Some(end))), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(store.range(None, None).len(), 5);
    }

    #[test]
    fn test_range_empty_and_inverted() {
        let store = create_test_store();
        let late = base_time() + Duration::seconds(100);
        let early = base_time();

        assert!(store.range(Some(late), None).is_empty());
        assert!(store.range(Some(late), Some(early)).is_empty());

        let empty = SeriesStore::new(SeriesKey::new("cpu", &Tags::new()));
        assert!(empty.range(None, None).is_empty());
    }

    #[test]
    fn test_latest_oldest() {
        let store = create_test_store();

        assert_eq!(values(store.latest(2)), vec![4.0, 5.0]);
        assert_eq!(values(store.oldest(2)), vec![1.0, 2.0]);
        assert!(store.latest(0).is_empty());
        assert_eq!(store.oldest(10).len(), 5);
    }

    #[test]
    fn test_time_range_and_remove_all() {
        let mut store = create_test_store();
        assert_eq!(
            store.time_range(),
            Some((base_time() + Duration::seconds(10), base_time() + Duration::seconds(50)))
        );

        store.remove_all();
        assert!(store.is_empty());
        assert_eq!(store.time_range(), None);
    }

    proptest! {
        #[test]
        fn prop_insert_keeps_sorted(offsets in proptest::collection::vec(-10_000i64..10_000, 0..200)) {
            let mut store = SeriesStore::new(SeriesKey::new("cpu", &Tags::new()));
            for (i, offset) in offsets.iter().enumerate() {
                store.insert(point_at(*offset, i as i64));
            }

            prop_assert_eq!(store.len(), offsets.len());
            prop_assert!(store.is_sorted());
        }
    }
}
