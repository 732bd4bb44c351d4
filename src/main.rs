use metrics_dashboard::{api, config::DashboardConfig, logging, metrics};

#[tokio::main]
async fn main() {
    // Initialize logging
    if let Err(e) = logging::init_logger(logging::DEFAULT_DIRECTIVE) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    // Initialize metrics
    metrics::init_metrics();

    let config = match DashboardConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = api::start_dashboard_server(config).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
