use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::{
    config::DashboardConfig,
    filter::count_unparseable,
    metrics,
    store::{load_export, ExportDocument, MetricStore},
    DashboardError, Result,
};

/// One loaded export. Never mutated after construction; reloads replace it.
#[derive(Debug)]
pub struct Snapshot {
    pub store: MetricStore,
    pub generated_at: Option<String>,
    pub loaded_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(document: ExportDocument) -> Self {
        Self {
            store: document.timeseries,
            generated_at: document.meta.generated_at,
            loaded_at: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct DashboardState {
    pub config: Arc<DashboardConfig>,
    snapshot: Arc<RwLock<Option<Arc<Snapshot>>>>,
}

impl DashboardState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config: Arc::new(config),
            snapshot: Arc::new(RwLock::new(None)),
        }
    }

    /// The snapshot every view of a request is computed from.
    pub fn current(&self) -> Result<Arc<Snapshot>> {
        self.snapshot
            .read()
            .clone()
            .ok_or_else(|| DashboardError::Unavailable("no export has been loaded yet".to_string()))
    }

    pub fn replace(&self, snapshot: Snapshot) {
        let points = snapshot.store.len();
        let malformed = count_unparseable(&snapshot.store);
        if malformed > 0 {
            warn!(
                "{} of {} points have unparseable timestamps and are excluded from every range",
                malformed, points
            );
        }
        metrics::record_reload(points, malformed);

        *self.snapshot.write() = Some(Arc::new(snapshot));
    }

    /// Reads the export from disk and swaps it in. On failure the previous
    /// snapshot stays current.
    pub async fn reload(&self) -> Result<()> {
        let path = &self.config.data_path;
        match load_export(path).await {
            Ok(document) => {
                let snapshot = Snapshot::new(document);
                info!(
                    "Loaded {} points from {} (generated at {})",
                    snapshot.store.len(),
                    path.display(),
                    snapshot.generated_at.as_deref().unwrap_or("unknown")
                );
                self.replace(snapshot);
                Ok(())
            }
            Err(e) => {
                metrics::record_reload_failure();
                warn!("Failed to load metrics from {}: {}", path.display(), e);
                Err(e)
            }
        }
    }
}

/// Reloads the export every refresh interval until the runtime shuts down.
pub fn spawn_refresh(state: DashboardState) -> tokio::task::JoinHandle<()> {
    let period = state.config.refresh_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately; the initial load happens at startup.
        interval.tick().await;
        loop {
            interval.tick().await;
            let _ = state.reload().await;
        }
    })
}
