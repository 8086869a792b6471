//! Memts Engine Types
//!
//! Core data types for series storage and querying: field values, tag
//! sets, canonical series keys and points.
//!
//! @version 0.1.0
//! @author Memts Development Team

use chrono::{DateTime, Utc};
use memts_common::{MemtsError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// =============================================================================
// Field Value
// =============================================================================

/// Numeric value carried by a point field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
}

impl FieldValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Integer(v) => *v as f64,
            Self::Float(v) => *v,
        }
    }

    /// Numeric comparison across both variants.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Integer(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Integer(b)) => a.partial_cmp(&(*b as f64)),
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        Self::Float(v as f64)
    }
}

/// Field name to value mapping; keys are unique and ordered.
pub type Fields = BTreeMap<String, FieldValue>;

// =============================================================================
// Tags
// =============================================================================

/// Key-value tags partitioning a measurement into series. Iteration and
/// serialization are ordered by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// Merge another tag set into this one, overwriting equal keys.
    pub fn extend(&mut self, other: &Tags) {
        for (k, v) in other.iter() {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Check if this tag set satisfies every pair of a filter.
    pub fn matches(&self, filter: &Tags) -> bool {
        filter.0.iter().all(|(k, v)| self.0.get(k) == Some(v))
    }

    /// Tag pairs sorted by key.
    pub fn sorted_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl From<HashMap<String, String>> for Tags {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl From<BTreeMap<String, String>> for Tags {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// =============================================================================
// Series Key
// =============================================================================

/// Canonical series identity: measurement plus tag pairs sorted by key.
///
/// Two tag sets with equal content produce equal keys regardless of the
/// order in which the tags were inserted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    measurement: String,
    tags: Vec<(String, String)>,
}

impl SeriesKey {
    pub fn new(measurement: impl Into<String>, tags: &Tags) -> Self {
        Self {
            measurement: measurement.into(),
            tags: tags.sorted_pairs(),
        }
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tag_pairs(&self) -> &[(String, String)] {
        &self.tags
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|i| self.tags[i].1.as_str())
    }

    pub fn to_tags(&self) -> Tags {
        self.tags.iter().cloned().collect()
    }

    /// Every filter pair must be present with an equal value.
    pub fn matches(&self, filter: &Tags) -> bool {
        filter
            .iter()
            .all(|(k, v)| self.tag(k) == Some(v.as_str()))
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.measurement)?;
        for (k, v) in &self.tags {
            write!(f, ",{}={}", k, v)?;
        }
        Ok(())
    }
}

// =============================================================================
// Point
// =============================================================================

/// One timestamped observation.
///
/// Built with the `with_*` methods and never mutated once written; an
/// update means writing a new point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    measurement: String,
    fields: Fields,
    tags: Tags,
    timestamp: DateTime<Utc>,
}

impl Point {
    /// Create a point stamped with the current time.
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            fields: Fields::new(),
            tags: Tags::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key, value);
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags.extend(&tags);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).copied()
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn series_key(&self) -> SeriesKey {
        SeriesKey::new(self.measurement.clone(), &self.tags)
    }

    /// Reject points that cannot be written.
    pub fn validate(&self) -> Result<()> {
        if self.measurement.is_empty() {
            return Err(MemtsError::validation("measurement must not be empty"));
        }
        if self.fields.is_empty() {
            return Err(MemtsError::validation(format!(
                "point of measurement '{}' has no fields",
                self.measurement
            )));
        }
        Ok(())
    }

    /// JSON rendering with an RFC 3339 timestamp.
    pub fn to_json(&self) -> serde_json::Value {
        let fields: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    FieldValue::Integer(v) => serde_json::Value::from(*v),
                    FieldValue::Float(v) => serde_json::Value::from(*v),
                };
                (name.clone(), value)
            })
            .collect();

        serde_json::json!({
            "measurement": self.measurement,
            "tags": self.tags.0,
            "fields": fields,
            "timestamp": self.timestamp.to_rfc3339(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
