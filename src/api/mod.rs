pub mod dashboard;
pub mod state;

pub use dashboard::{dashboard_router, start_dashboard_server};
pub use state::{DashboardState, Snapshot};
