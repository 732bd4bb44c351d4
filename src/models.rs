use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Tag values are kept as raw JSON scalars; see [`crate::filter::tag_string`]
/// for how they are compared.
pub type Tags = BTreeMap<String, Value>;

/// One timestamped, tagged counter observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Bucket identity. Two points with the same string share a bucket.
    #[serde(rename = "ts", alias = "timestamp", default)]
    pub timestamp: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Tags,
}

impl MetricPoint {
    pub fn new(timestamp: impl Into<String>, count: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            count,
            tags: Tags::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single chronological series. `values[i]` is the sum for `labels[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl Series {
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSeries {
    pub name: String,
    pub data: Vec<f64>,
}

impl NamedSeries {
    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }
}

/// Several series sharing one label axis. Every `data` vector has
/// exactly `labels.len()` entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaggedSeriesSet {
    pub labels: Vec<String>,
    pub series: Vec<NamedSeries>,
}

impl TaggedSeriesSet {
    /// Keeps the `n` series with the largest totals, largest first. Series
    /// with equal totals keep their relative order.
    pub fn top(mut self, n: usize) -> Self {
        self.series.sort_by(|a, b| b.total().total_cmp(&a.total()));
        self.series.truncate(n);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.series.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopEntry {
    pub label: String,
    pub value: f64,
}
