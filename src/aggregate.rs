//! Grouped summation.
//!
//! Every total the dashboard reports, whether a KPI, a table row or a chart
//! bucket, comes out of [`group_sum`]. Views built over the same filtered
//! points therefore agree on every number.

use std::collections::HashMap;
use std::hash::Hash;

use crate::models::MetricPoint;

/// Groups `items` by `key_fn` and sums `value_fn` per group. Key order is
/// not preserved; callers sort whatever labels they derive.
pub fn group_sum<I, T, K, F, V>(items: I, mut key_fn: F, mut value_fn: V) -> HashMap<K, f64>
where
    I: IntoIterator<Item = T>,
    K: Eq + Hash,
    F: FnMut(&T) -> K,
    V: FnMut(&T) -> f64,
{
    let mut sums = HashMap::new();
    for item in items {
        *sums.entry(key_fn(&item)).or_insert(0.0) += value_fn(&item);
    }
    sums
}

/// [`group_sum`] over point counts.
pub fn group_sum_counts<'a, I, K, F>(points: I, key_fn: F) -> HashMap<K, f64>
where
    I: IntoIterator<Item = &'a MetricPoint>,
    K: Eq + Hash,
    F: FnMut(&&'a MetricPoint) -> K,
{
    group_sum(points, key_fn, |point| point.count)
}

/// Sum of counts over `points`, as a single group.
pub fn total<'a, I>(points: I) -> f64
where
    I: IntoIterator<Item = &'a MetricPoint>,
{
    group_sum_counts(points, |_| ()).remove(&()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::coerce;

    fn points() -> Vec<MetricPoint> {
        vec![
            MetricPoint::new("2024-01-01T00:00:00Z", 5.0).with_tag("cmd", "ping"),
            MetricPoint::new("2024-01-01T01:00:00Z", 2.0).with_tag("cmd", "ping"),
            MetricPoint::new("2024-01-01T00:00:00Z", 3.0).with_tag("cmd", "help"),
        ]
    }

    #[test]
    fn test_group_by_timestamp() {
        let points = points();
        let sums = group_sum_counts(&points, |p| p.timestamp.clone());
        assert_eq!(sums.len(), 2);
        assert_eq!(sums["2024-01-01T00:00:00Z"], 8.0);
        assert_eq!(sums["2024-01-01T01:00:00Z"], 2.0);
    }

    #[test]
    fn test_group_with_custom_value() {
        let points = points();
        let occurrences = group_sum(&points, |p| coerce(&p.tags["cmd"]), |_| 1.0);
        assert_eq!(occurrences["ping"], 2.0);
        assert_eq!(occurrences["help"], 1.0);
    }

    #[test]
    fn test_total() {
        assert_eq!(total(&points()), 10.0);
        assert_eq!(total(std::iter::empty()), 0.0);
    }
}
