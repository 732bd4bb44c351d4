use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};
use std::time::Instant;

use crate::{DashboardError, Result};

lazy_static! {
    // Request metrics
    pub static ref REQUEST_COUNTER: IntCounterVec = register_int_counter_vec!(
        "dashboard_requests_total",
        "Total number of dashboard requests received",
        &["endpoint"]
    ).unwrap();

    pub static ref REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "dashboard_request_duration_seconds",
        "Request duration in seconds",
        &["endpoint"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]
    ).unwrap();

    // Store metrics
    pub static ref STORE_LOADED: IntGauge = register_int_gauge!(
        "dashboard_store_loaded",
        "Whether a metrics export has been loaded (1) or not (0)"
    ).unwrap();

    pub static ref STORE_RELOADS: IntCounter = register_int_counter!(
        "dashboard_store_reloads_total",
        "Total number of successful export reloads"
    ).unwrap();

    pub static ref STORE_RELOAD_FAILURES: IntCounter = register_int_counter!(
        "dashboard_store_reload_failures_total",
        "Total number of failed export reloads"
    ).unwrap();

    pub static ref STORE_POINTS: IntGauge = register_int_gauge!(
        "dashboard_store_points",
        "Number of metric points in the current export"
    ).unwrap();

    pub static ref STORE_MALFORMED_POINTS: IntGauge = register_int_gauge!(
        "dashboard_store_malformed_points",
        "Number of points in the current export whose timestamp cannot be parsed"
    ).unwrap();
}

pub fn init_metrics() {
    STORE_LOADED.set(0);
    lazy_static::initialize(&REQUEST_COUNTER);
    lazy_static::initialize(&REQUEST_DURATION);
    lazy_static::initialize(&STORE_RELOADS);
    lazy_static::initialize(&STORE_RELOAD_FAILURES);
    lazy_static::initialize(&STORE_POINTS);
    lazy_static::initialize(&STORE_MALFORMED_POINTS);
}

pub struct RequestTimer {
    endpoint: &'static str,
    start: Instant,
}

impl RequestTimer {
    pub fn new(endpoint: &'static str) -> Self {
        REQUEST_COUNTER.with_label_values(&[endpoint]).inc();
        Self {
            endpoint,
            start: Instant::now(),
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        REQUEST_DURATION
            .with_label_values(&[self.endpoint])
            .observe(duration);
    }
}

pub fn record_reload(points: usize, malformed: usize) {
    STORE_RELOADS.inc();
    STORE_LOADED.set(1);
    STORE_POINTS.set(points as i64);
    STORE_MALFORMED_POINTS.set(malformed as i64);
}

pub fn record_reload_failure() {
    STORE_RELOAD_FAILURES.inc();
}

/// Renders the default registry in the Prometheus text format.
pub fn render() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| DashboardError::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| DashboardError::Internal(format!("Metrics are not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_dashboard_metrics() {
        init_metrics();
        {
            let _timer = RequestTimer::new("test");
        }
        record_reload(10, 2);

        let text = render().unwrap();
        assert!(text.contains("dashboard_requests_total"));
        assert!(text.contains("dashboard_store_malformed_points"));
    }
}
