use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::MetricPoint;
use crate::Result;

/// Metric name to its points, in the order they were exported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricStore {
    metrics: BTreeMap<String, Vec<MetricPoint>>,
}

/// A point together with the metric it was recorded under.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub metric: &'a str,
    pub point: &'a MetricPoint,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, metric: impl Into<String>, points: Vec<MetricPoint>) {
        self.metrics.insert(metric.into(), points);
    }

    pub fn push(&mut self, metric: &str, point: MetricPoint) {
        self.metrics.entry(metric.to_string()).or_default().push(point);
    }

    /// Points recorded for `metric`; empty when the metric is absent.
    pub fn points(&self, metric: &str) -> &[MetricPoint] {
        self.metrics.get(metric).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    pub fn observe<'a>(&'a self, metric: &'a str) -> impl Iterator<Item = Observation<'a>> + 'a {
        self.points(metric)
            .iter()
            .map(move |point| Observation { metric, point })
    }

    /// Every point of every metric, metrics in name order.
    pub fn observations(&self) -> impl Iterator<Item = Observation<'_>> {
        self.metrics.iter().flat_map(|(metric, points)| {
            points.iter().map(move |point| Observation {
                metric: metric.as_str(),
                point,
            })
        })
    }

    pub fn len(&self) -> usize {
        self.metrics.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<(String, Vec<MetricPoint>)> for MetricStore {
    fn from_iter<I: IntoIterator<Item = (String, Vec<MetricPoint>)>>(iter: I) -> Self {
        Self {
            metrics: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportMeta {
    #[serde(default)]
    pub generated_at: Option<String>,
}

/// The exported metrics document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    #[serde(default)]
    pub timeseries: MetricStore,
    #[serde(default)]
    pub meta: ExportMeta,
}

impl ExportDocument {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

pub async fn load_export(path: impl AsRef<Path>) -> Result<ExportDocument> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    ExportDocument::from_slice(&bytes)
}
