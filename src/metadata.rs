//! Immutable metadata attached to export strategies.

use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// A metadata value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(untagged))]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<i32> for MetadataValue {
    fn from(value: i32) -> Self {
        MetadataValue::Integer(i64::from(value))
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Boolean(value)
    }
}

/// Immutable key/value bag consumed by conditions and filters.
///
/// Cloning shares the underlying map.
///
/// ```rust
/// use ferrous_scope::ExportMetadata;
///
/// let metadata = ExportMetadata::builder()
///     .with("tier", "gold")
///     .with("weight", 3)
///     .build();
///
/// assert!(metadata.matches("tier", "gold"));
/// assert_eq!(metadata.get("weight").and_then(|v| v.as_i64()), Some(3));
/// assert!(!metadata.contains_key("region"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExportMetadata {
    entries: Arc<BTreeMap<String, MetadataValue>>,
}

impl ExportMetadata {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> ExportMetadataBuilder {
        ExportMetadataBuilder::default()
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// True when `key` is present and equal to `value`.
    pub fn matches(&self, key: &str, value: impl Into<MetadataValue>) -> bool {
        self.entries.get(key) == Some(&value.into())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Accumulates entries before freezing them into an `ExportMetadata`.
#[derive(Debug, Default)]
pub struct ExportMetadataBuilder {
    entries: BTreeMap<String, MetadataValue>,
}

impl ExportMetadataBuilder {
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub(crate) fn insert(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn build(self) -> ExportMetadata {
        ExportMetadata {
            entries: Arc::new(self.entries),
        }
    }
}
