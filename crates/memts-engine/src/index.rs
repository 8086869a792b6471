//! Memts Series Index
//!
//! Maps canonical series keys to their stores, with a secondary index from
//! measurement name to series keys so measurement and partial-tag lookups
//! never scan unrelated series.
//!
//! @version 0.1.0
//! @author Memts Development Team

use crate::series::SeriesStore;
use crate::types::{SeriesKey, Tags};
use memts_common::{MemtsError, Result};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// Series Index
// =============================================================================

/// Owner of every series store.
///
/// Not synchronized; callers provide exclusive access for mutation.
#[derive(Debug, Default)]
pub struct SeriesIndex {
    series_by_key: BTreeMap<SeriesKey, SeriesStore>,
    series_by_measurement: BTreeMap<String, BTreeSet<SeriesKey>>,
    max_series_per_measurement: Option<usize>,
}

impl SeriesIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index that refuses to grow a measurement past `limit` series.
    pub fn with_series_limit(limit: Option<usize>) -> Self {
        Self {
            max_series_per_measurement: limit,
            ..Self::default()
        }
    }

    /// Return the store for a series, registering it on first use.
    pub fn resolve_or_create(&mut self, measurement: &str, tags: &Tags) -> Result<&mut SeriesStore> {
        let key = SeriesKey::new(measurement, tags);

        if !self.series_by_key.contains_key(&key) {
            if let Some(limit) = self.max_series_per_measurement {
                let existing = self
                    .series_by_measurement
                    .get(measurement)
                    .map_or(0, BTreeSet::len);
                if existing >= limit {
                    return Err(MemtsError::SeriesLimitExceeded {
                        measurement: measurement.to_string(),
                        limit,
                    });
                }
            }

            self.series_by_measurement
                .entry(measurement.to_string())
                .or_default()
                .insert(key.clone());
            tracing::debug!(series = %key, "created series");
        }

        Ok(self
            .series_by_key
            .entry(key.clone())
            .or_insert_with(|| SeriesStore::new(key)))
    }

    pub fn get(&self, key: &SeriesKey) -> Option<&SeriesStore> {
        self.series_by_key.get(key)
    }

    /// Series matching a measurement (all series when `None`) and every
    /// pair of the tag filter, in key order.
    pub fn candidates(&self, measurement: Option<&str>, tag_filter: Option<&Tags>) -> Vec<&SeriesStore> {
        let matches_tags = |key: &SeriesKey| tag_filter.map_or(true, |filter| key.matches(filter));

        match measurement {
            Some(measurement) => self
                .series_by_measurement
                .get(measurement)
                .into_iter()
                .flatten()
                .filter(|&key| matches_tags(key))
                .filter_map(|key| self.series_by_key.get(key))
                .collect(),
            None => self
                .series_by_key
                .iter()
                .filter(|&(key, _)| matches_tags(key))
                .map(|(_, store)| store)
                .collect(),
        }
    }

    /// Remove one exact series. Returns false when it did not exist.
    pub fn delete_series(&mut self, measurement: &str, tags: &Tags) -> bool {
        let key = SeriesKey::new(measurement, tags);

        let Some(mut store) = self.series_by_key.remove(&key) else {
            return false;
        };
        store.remove_all();

        if let Some(keys) = self.series_by_measurement.get_mut(measurement) {
            keys.remove(&key);
            if keys.is_empty() {
                self.series_by_measurement.remove(measurement);
            }
        }

        true
    }

    /// Remove every series of a measurement, returning how many were removed.
    pub fn delete_measurement(&mut self, measurement: &str) -> usize {
        let Some(keys) = self.series_by_measurement.remove(measurement) else {
            return 0;
        };

        let mut removed = 0;
        for key in &keys {
            if let Some(mut store) = self.series_by_key.remove(key) {
                store.remove_all();
                removed += 1;
            }
        }
        removed
    }

    pub fn clear(&mut self) {
        self.series_by_key.clear();
        self.series_by_measurement.clear();
    }

    pub fn series_keys(&self) -> Vec<SeriesKey> {
        self.series_by_key.keys().cloned().collect()
    }

    pub fn measurements(&self) -> BTreeSet<String> {
        self.series_by_measurement.keys().cloned().collect()
    }

    /// Total points across all series.
    pub fn point_count(&self) -> usize {
        self.series_by_key.values().map(SeriesStore::len).sum()
    }

    /// Number of indexed series.
    pub fn len(&self) -> usize {
        self.series_by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series_by_key.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
