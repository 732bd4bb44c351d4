//! The full set of views the dashboard renders for one range.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MetricFamilies;
use crate::filter::{matches_tag, tag_label};
use crate::kpi::{compute_kpis, Kpis};
use crate::models::{MetricPoint, Series, TaggedSeriesSet, TopEntry};
use crate::ranking::top_n;
use crate::series::{build_series, build_tagged_series, build_tagged_status_series, merge_tagged};
use crate::store::MetricStore;
use crate::window::{TimeRange, TimeWindow};

const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charts {
    pub commands: Series,
    pub fetch_ok: Series,
    pub fetch_error: Series,
    pub command_mix: TaggedSeriesSet,
    pub fetch_by_source: TaggedSeriesSet,
    pub scheduler: TaggedSeriesSet,
    pub failures_by_feature: TaggedSeriesSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub range: TimeRange,
    pub window: TimeWindow,
    pub kpis: Kpis,
    pub top_commands: Vec<TopEntry>,
    pub top_errors: Vec<TopEntry>,
    pub charts: Charts,
}

pub fn build_dashboard(
    store: &MetricStore,
    families: &MetricFamilies,
    range: TimeRange,
    now: DateTime<Utc>,
    n: usize,
) -> Dashboard {
    let window = TimeWindow::resolve(range, now);
    Dashboard {
        range,
        window,
        kpis: compute_kpis(store, families, &window),
        top_commands: top_commands(store, families, &window, n),
        top_errors: top_errors(store, families, &window, n),
        charts: build_charts(store, families, &window, n),
    }
}

/// Successful invocations of the primary action, ranked by command.
pub fn top_commands(
    store: &MetricStore,
    families: &MetricFamilies,
    window: &TimeWindow,
    n: usize,
) -> Vec<TopEntry> {
    let succeeded = store
        .observe(&families.commands)
        .filter(|obs| matches_tag(obs.point, &families.status_tag, &families.ok_status));
    top_n(succeeded, window, n, |obs| {
        tag_label(obs.point, &families.command_tag).unwrap_or_else(|| UNKNOWN.to_string())
    })
}

/// Failures across every metric: all internal failures, labelled by
/// feature, plus any point whose status reads as an error, labelled by
/// metric and status.
pub fn top_errors(
    store: &MetricStore,
    families: &MetricFamilies,
    window: &TimeWindow,
    n: usize,
) -> Vec<TopEntry> {
    let failed = store
        .observations()
        .filter(|obs| obs.metric == families.failures || is_error(obs.point, families));
    top_n(failed, window, n, |obs| {
        if obs.metric == families.failures {
            let feature = tag_label(obs.point, &families.feature_tag);
            format!("{} ({})", obs.metric, feature.as_deref().unwrap_or(UNKNOWN))
        } else {
            let status = tag_label(obs.point, &families.status_tag);
            format!("{} ({})", obs.metric, status.as_deref().unwrap_or(&families.error_status))
        }
    })
}

fn is_error(point: &MetricPoint, families: &MetricFamilies) -> bool {
    tag_label(point, &families.status_tag)
        .is_some_and(|status| status.to_lowercase() == families.error_status)
}

fn build_charts(
    store: &MetricStore,
    families: &MetricFamilies,
    window: &TimeWindow,
    n: usize,
) -> Charts {
    let ok = |p: &MetricPoint| matches_tag(p, &families.status_tag, &families.ok_status);
    let error = |p: &MetricPoint| matches_tag(p, &families.status_tag, &families.error_status);

    let command_mix =
        build_tagged_series(store, &families.commands, &families.command_tag, window, Some(&ok)).top(n);

    let sources_ok =
        build_tagged_series(store, &families.fetches, &families.source_tag, window, Some(&ok));
    let sources_error =
        build_tagged_series(store, &families.fetches, &families.source_tag, window, Some(&error));

    let jobs_ok = build_tagged_status_series(
        store,
        &families.scheduler,
        &families.job_tag,
        &families.status_tag,
        &families.ok_status,
        window,
    );
    let jobs_error = build_tagged_status_series(
        store,
        &families.scheduler,
        &families.job_tag,
        &families.status_tag,
        &families.error_status,
        window,
    );

    Charts {
        commands: build_series(store, &families.commands, window, Some(&ok)),
        fetch_ok: build_series(store, &families.fetches, window, Some(&ok)),
        fetch_error: build_series(store, &families.fetches, window, Some(&error)),
        command_mix,
        fetch_by_source: merge_tagged(&[(&sources_ok, "OK"), (&sources_error, "Error")]),
        scheduler: merge_tagged(&[(&jobs_ok, "OK"), (&jobs_error, "Error")]),
        failures_by_feature: build_tagged_series(
            store,
            &families.failures,
            &families.feature_tag,
            window,
            None,
        ),
    }
}
