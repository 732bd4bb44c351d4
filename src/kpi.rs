use serde::{Deserialize, Serialize};

use crate::aggregate::{group_sum_counts, total};
use crate::config::MetricFamilies;
use crate::filter::{matches_tag, select, tag_string};
use crate::models::MetricPoint;
use crate::store::MetricStore;
use crate::window::TimeWindow;

/// Scalar summaries for one window. Counts are raw sums over the window,
/// not rates, so values for different ranges are not comparable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub commands: f64,
    pub fetch_ok: f64,
    pub fetch_error: f64,
    pub fetch_total: f64,
    pub failures: f64,
    pub failure_features: usize,
    pub scheduler_ok: f64,
    pub scheduler_error: f64,
    pub scheduler_total: f64,
}

pub fn compute_kpis(store: &MetricStore, families: &MetricFamilies, window: &TimeWindow) -> Kpis {
    let commands = status_total(store, families, &families.commands, &families.ok_status, window);

    let fetch_ok = status_total(store, families, &families.fetches, &families.ok_status, window);
    let fetch_error = status_total(store, families, &families.fetches, &families.error_status, window);

    let failure_points = select(store.points(&families.failures), window, None);
    let failures = total(failure_points.iter().copied());
    // Points without the feature tag count as one feature of their own.
    let failure_features =
        group_sum_counts(failure_points.iter().copied(), |p| tag_string(p, &families.feature_tag)).len();

    let scheduler_ok = status_total(store, families, &families.scheduler, &families.ok_status, window);
    let scheduler_error =
        status_total(store, families, &families.scheduler, &families.error_status, window);

    Kpis {
        commands,
        fetch_ok,
        fetch_error,
        fetch_total: fetch_ok + fetch_error,
        failures,
        failure_features,
        scheduler_ok,
        scheduler_error,
        scheduler_total: scheduler_ok + scheduler_error,
    }
}

fn status_total(
    store: &MetricStore,
    families: &MetricFamilies,
    metric: &str,
    status: &str,
    window: &TimeWindow,
) -> f64 {
    let has_status = |p: &MetricPoint| matches_tag(p, &families.status_tag, status);
    total(select(store.points(metric), window, Some(&has_status)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::TimeRange;
    use chrono::{TimeZone, Utc};

    fn point(ts: &str, count: f64, tags: &[(&str, &str)]) -> MetricPoint {
        tags.iter().fold(MetricPoint::new(ts, count), |p, (k, v)| p.with_tag(*k, *v))
    }

    fn store() -> MetricStore {
        let mut store = MetricStore::new();
        store.insert(
            "command.invoked",
            vec![
                point("2024-01-01T10:00:00Z", 5.0, &[("status", "ok"), ("cmd", "ping")]),
                point("2024-01-01T10:00:00Z", 2.0, &[("status", "error"), ("cmd", "ping")]),
                point("2024-01-01T11:00:00Z", 1.0, &[("cmd", "help")]),
            ],
        );
        store.insert(
            "external.fetch",
            vec![
                point("2024-01-01T10:00:00Z", 10.0, &[("status", "ok"), ("source", "github")]),
                point("2024-01-01T11:00:00Z", 3.0, &[("status", "error"), ("source", "github")]),
                point("2023-11-01T11:00:00Z", 50.0, &[("status", "error"), ("source", "github")]),
            ],
        );
        store.insert(
            "dm.fail",
            vec![
                point("2024-01-01T10:00:00Z", 1.0, &[("feature", "reminders")]),
                point("2024-01-01T10:30:00Z", 2.0, &[("feature", "reminders")]),
                point("2024-01-01T11:00:00Z", 4.0, &[("feature", "digest")]),
                point("2024-01-01T11:30:00Z", 1.0, &[]),
            ],
        );
        store.insert(
            "scheduler.run",
            vec![
                point("2024-01-01T10:00:00Z", 24.0, &[("status", "ok"), ("name", "backup")]),
                point("2024-01-01T10:00:00Z", 1.0, &[("status", "error"), ("name", "backup")]),
            ],
        );
        store
    }

    #[test]
    fn test_compute_kpis() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let window = TimeWindow::resolve(TimeRange::Day, now);
        let kpis = compute_kpis(&store(), &MetricFamilies::default(), &window);

        assert_eq!(kpis.commands, 5.0);
        assert_eq!(kpis.fetch_ok, 10.0);
        assert_eq!(kpis.fetch_error, 3.0);
        assert_eq!(kpis.fetch_total, 13.0);
        assert_eq!(kpis.failures, 8.0);
        assert_eq!(kpis.failure_features, 3);
        assert_eq!(kpis.scheduler_ok, 24.0);
        assert_eq!(kpis.scheduler_error, 1.0);
        assert_eq!(kpis.scheduler_total, 25.0);
    }

    #[test]
    fn test_points_outside_window_ignored() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let window = TimeWindow::resolve(TimeRange::Month, now);
        let kpis = compute_kpis(&store(), &MetricFamilies::default(), &window);
        assert_eq!(kpis.fetch_error, 3.0);

        let window = TimeWindow::resolve(TimeRange::from("90d"), now);
        assert_eq!(compute_kpis(&store(), &MetricFamilies::default(), &window).fetch_error, 3.0);
    }

    #[test]
    fn test_empty_store() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let window = TimeWindow::resolve(TimeRange::Day, now);
        let kpis = compute_kpis(&MetricStore::new(), &MetricFamilies::default(), &window);
        assert_eq!(kpis, Kpis::default());
    }
}
