use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

use crate::{
    api::state::{spawn_refresh, DashboardState},
    config::DashboardConfig,
    dashboard::{build_dashboard, top_commands, top_errors, Dashboard},
    filter::matches_tag,
    kpi::{compute_kpis, Kpis},
    metrics::{self, RequestTimer},
    models::{MetricPoint, Series, TaggedSeriesSet, TopEntry},
    series::{build_series, build_tagged_series, build_tagged_status_series},
    window::{TimeRange, TimeWindow},
    DashboardError, Result,
};

#[derive(Debug, Default, Deserialize)]
pub struct ViewParams {
    #[serde(default)]
    pub range: TimeRange,
    pub n: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SeriesParams {
    #[serde(default)]
    pub range: TimeRange,
    pub tag: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaggedParams {
    #[serde(default)]
    pub range: TimeRange,
    pub status: Option<String>,
}

pub fn dashboard_router(state: DashboardState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/kpis", get(get_kpis))
        .route("/api/top/commands", get(get_top_commands))
        .route("/api/top/errors", get(get_top_errors))
        .route("/api/series/:metric", get(get_series))
        .route("/api/series/:metric/by/:tag", get(get_tagged_series))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn prometheus_metrics() -> Result<impl IntoResponse> {
    let body = metrics::render()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

async fn get_dashboard(
    State(state): State<DashboardState>,
    Query(params): Query<ViewParams>,
) -> Result<Json<Dashboard>> {
    let _timer = RequestTimer::new("dashboard");
    debug!("Building dashboard for range {}", params.range);

    let snapshot = state.current()?;
    let n = params.n.unwrap_or(state.config.top_n);
    Ok(Json(build_dashboard(
        &snapshot.store,
        &state.config.families,
        params.range,
        Utc::now(),
        n,
    )))
}

async fn get_kpis(
    State(state): State<DashboardState>,
    Query(params): Query<ViewParams>,
) -> Result<Json<Kpis>> {
    let _timer = RequestTimer::new("kpis");
    let snapshot = state.current()?;
    let window = TimeWindow::resolve(params.range, Utc::now());
    Ok(Json(compute_kpis(&snapshot.store, &state.config.families, &window)))
}

async fn get_top_commands(
    State(state): State<DashboardState>,
    Query(params): Query<ViewParams>,
) -> Result<Json<Vec<TopEntry>>> {
    let _timer = RequestTimer::new("top_commands");
    let snapshot = state.current()?;
    let window = TimeWindow::resolve(params.range, Utc::now());
    let n = params.n.unwrap_or(state.config.top_n);
    Ok(Json(top_commands(&snapshot.store, &state.config.families, &window, n)))
}

async fn get_top_errors(
    State(state): State<DashboardState>,
    Query(params): Query<ViewParams>,
) -> Result<Json<Vec<TopEntry>>> {
    let _timer = RequestTimer::new("top_errors");
    let snapshot = state.current()?;
    let window = TimeWindow::resolve(params.range, Utc::now());
    let n = params.n.unwrap_or(state.config.top_n);
    Ok(Json(top_errors(&snapshot.store, &state.config.families, &window, n)))
}

async fn get_series(
    State(state): State<DashboardState>,
    Path(metric): Path<String>,
    Query(params): Query<SeriesParams>,
) -> Result<Json<Series>> {
    let _timer = RequestTimer::new("series");
    debug!("Building series for {} over {}", metric, params.range);

    let snapshot = state.current()?;
    let window = TimeWindow::resolve(params.range, Utc::now());
    let series = match (params.tag.as_deref(), params.value.as_deref()) {
        (Some(tag), Some(value)) => {
            let predicate = |p: &MetricPoint| matches_tag(p, tag, value);
            build_series(&snapshot.store, &metric, &window, Some(&predicate))
        }
        _ => build_series(&snapshot.store, &metric, &window, None),
    };
    Ok(Json(series))
}

async fn get_tagged_series(
    State(state): State<DashboardState>,
    Path((metric, tag)): Path<(String, String)>,
    Query(params): Query<TaggedParams>,
) -> Result<Json<TaggedSeriesSet>> {
    let _timer = RequestTimer::new("tagged_series");
    debug!("Building {} series for {} over {}", tag, metric, params.range);

    let snapshot = state.current()?;
    let window = TimeWindow::resolve(params.range, Utc::now());
    let set = match params.status.as_deref() {
        Some(status) => build_tagged_status_series(
            &snapshot.store,
            &metric,
            &tag,
            &state.config.families.status_tag,
            status,
            &window,
        ),
        None => build_tagged_series(&snapshot.store, &metric, &tag, &window, None),
    };
    Ok(Json(set))
}

pub async fn start_dashboard_server(config: DashboardConfig) -> Result<()> {
    let addr = config.listen_addr();
    let state = DashboardState::new(config);

    // A missing export is not fatal; data endpoints answer 503 until a reload succeeds.
    let _ = state.reload().await;
    spawn_refresh(state.clone());

    let app = dashboard_router(state);
    info!("Starting dashboard server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| DashboardError::Internal(format!("Failed to bind to address: {}", e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| DashboardError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
