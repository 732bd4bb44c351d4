pub mod aggregate;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod kpi;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod ranking;
pub mod series;
pub mod store;
pub mod window;

pub use error::{DashboardError, Result};
pub use models::{MetricPoint, NamedSeries, Series, TaggedSeriesSet, TopEntry};
pub use store::{ExportDocument, MetricStore};
pub use window::{TimeRange, TimeWindow};
