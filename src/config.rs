use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{DashboardError, Result};

pub const DEFAULT_DATA_PATH: &str = "data/generated/metrics_export.json";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_REFRESH_SECS: u64 = 15 * 60;
pub const DEFAULT_TOP_N: usize = 6;

/// Names of the metrics and tags the dashboard summarizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricFamilies {
    /// Primary action metric, ranked by `command_tag`.
    pub commands: String,
    /// External call metric, split by `source_tag`.
    pub fetches: String,
    /// Internal failure metric, split by `feature_tag`.
    pub failures: String,
    /// Scheduled job metric, split by `job_tag`.
    pub scheduler: String,
    pub status_tag: String,
    pub ok_status: String,
    pub error_status: String,
    pub command_tag: String,
    pub source_tag: String,
    pub job_tag: String,
    pub feature_tag: String,
}

impl Default for MetricFamilies {
    fn default() -> Self {
        Self {
            commands: "command.invoked".to_string(),
            fetches: "external.fetch".to_string(),
            failures: "dm.fail".to_string(),
            scheduler: "scheduler.run".to_string(),
            status_tag: "status".to_string(),
            ok_status: "ok".to_string(),
            error_status: "error".to_string(),
            command_tag: "cmd".to_string(),
            source_tag: "source".to_string(),
            job_tag: "name".to_string(),
            feature_tag: "feature".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    pub port: u16,
    pub refresh_secs: u64,
    pub top_n: usize,
    #[serde(default)]
    pub families: MetricFamilies,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            port: DEFAULT_PORT,
            refresh_secs: DEFAULT_REFRESH_SECS,
            top_n: DEFAULT_TOP_N,
            families: MetricFamilies::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            data_path: lookup("DASHBOARD_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.port),
            refresh_secs: parse_var(&lookup, "DASHBOARD_REFRESH_SECS")?.unwrap_or(defaults.refresh_secs),
            top_n: parse_var(&lookup, "DASHBOARD_TOP_N")?.unwrap_or(defaults.top_n),
            families: defaults.families,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs.max(1))
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| DashboardError::Config(format!("{}={:?}: {}", key, raw, e))),
    }
}
