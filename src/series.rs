//! Chart series builders.
//!
//! Labels are timestamp strings sorted lexicographically. That order is
//! chronological only when the exporter writes uniform, zero-padded
//! timestamps with a fixed offset; the builders rely on it rather than
//! re-parsing.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use crate::aggregate::group_sum_counts;
use crate::filter::{coerce, is_truthy, matches_tag, same_tag_value, select, Predicate};
use crate::models::{MetricPoint, NamedSeries, Series, TaggedSeriesSet};
use crate::store::MetricStore;
use crate::window::TimeWindow;

/// One series for `metric`. Only timestamps present among the selected
/// points become labels; empty buckets are not synthesized.
pub fn build_series(
    store: &MetricStore,
    metric: &str,
    window: &TimeWindow,
    predicate: Option<Predicate<'_>>,
) -> Series {
    let points = select(store.points(metric), window, predicate);
    let sums = group_sum_counts(points.iter().copied(), |p| p.timestamp.clone());

    let mut labels: Vec<String> = sums.keys().cloned().collect();
    labels.sort();
    let values = labels.iter().map(|label| sums[label]).collect();

    Series { labels, values }
}

/// One series per distinct truthy value of `tag_key`, all aligned to the
/// timestamps of every selected point and zero-filled. Values are distinct
/// under strict equality, so `1` and `"1"` give two series named `1`.
///
/// Points without a usable `tag_key` value still contribute labels but never
/// name a series, and their counts appear in none of the series.
pub fn build_tagged_series(
    store: &MetricStore,
    metric: &str,
    tag_key: &str,
    window: &TimeWindow,
    predicate: Option<Predicate<'_>>,
) -> TaggedSeriesSet {
    let points = select(store.points(metric), window, predicate);

    let labels: Vec<String> = points
        .iter()
        .map(|p| p.timestamp.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let series = tag_universe(&points, tag_key)
        .into_iter()
        .map(|value| {
            let sums = group_sum_counts(
                points
                    .iter()
                    .copied()
                    .filter(|p| p.tags.get(tag_key).is_some_and(|v| same_tag_value(v, value))),
                |p| p.timestamp.clone(),
            );
            let data = labels
                .iter()
                .map(|label| sums.get(label).copied().unwrap_or(0.0))
                .collect();
            NamedSeries {
                name: coerce(value),
                data,
            }
        })
        .collect();

    TaggedSeriesSet { labels, series }
}

/// [`build_tagged_series`] restricted to points whose `status_key` tag reads
/// as `status_value`.
pub fn build_tagged_status_series(
    store: &MetricStore,
    metric: &str,
    tag_key: &str,
    status_key: &str,
    status_value: &str,
    window: &TimeWindow,
) -> TaggedSeriesSet {
    let status = |p: &MetricPoint| matches_tag(p, status_key, status_value);
    build_tagged_series(store, metric, tag_key, window, Some(&status))
}

/// Concatenates several sets onto the union of their labels, suffixing
/// each series name (`"<name> <suffix>"`).
pub fn merge_tagged(parts: &[(&TaggedSeriesSet, &str)]) -> TaggedSeriesSet {
    let labels: Vec<String> = parts
        .iter()
        .flat_map(|(set, _)| set.labels.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut series = Vec::new();
    for (set, suffix) in parts {
        let index: HashMap<&str, usize> = set
            .labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.as_str(), i))
            .collect();
        for named in &set.series {
            let data = labels
                .iter()
                .map(|label| {
                    index
                        .get(label.as_str())
                        .and_then(|&i| named.data.get(i))
                        .copied()
                        .unwrap_or(0.0)
                })
                .collect();
            series.push(NamedSeries {
                name: format!("{} {}", named.name, suffix),
                data,
            });
        }
    }

    TaggedSeriesSet { labels, series }
}

/// Truthy values of `tag_key` in first-seen order.
fn tag_universe<'a>(points: &[&'a MetricPoint], tag_key: &str) -> Vec<&'a Value> {
    let mut universe: Vec<&'a Value> = Vec::new();
    for value in points.iter().copied().filter_map(|p| p.tags.get(tag_key)) {
        if is_truthy(value) && !universe.iter().any(|seen| same_tag_value(seen, value)) {
            universe.push(value);
        }
    }
    universe
}
