use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{DashboardError, Result};

pub const DEFAULT_DIRECTIVE: &str = "metrics_dashboard=info,tower_http=info";

/// Sets up the logging subscriber for the application.
///
/// `RUST_LOG` wins over `default_directive` when set.
pub fn init_logger(default_directive: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true)
        .with_level(true)
        .with_ansi(true)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| DashboardError::Internal(format!("Failed to initialize logger: {}", e)))
}
