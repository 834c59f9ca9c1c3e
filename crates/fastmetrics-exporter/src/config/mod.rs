//! Exporter config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use fastmetrics_core::error::{MetricsError, Result};

pub use schema::{ExporterConfig, ListenSection, ScrapeSummarySection, WorkerSection};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "FASTMETRICS_CONFIG";
pub const DEFAULT_PATH: &str = "fastmetrics.yaml";

/// Load `path` if given. Otherwise load `fastmetrics.yaml` when present,
/// falling back to built-in defaults.
pub fn load(path: Option<&str>) -> Result<ExporterConfig> {
    match path {
        Some(p) => load_from_file(p),
        None if Path::new(DEFAULT_PATH).exists() => load_from_file(DEFAULT_PATH),
        None => {
            tracing::info!(path = DEFAULT_PATH, "no config file found, using defaults");
            Ok(ExporterConfig::default())
        }
    }
}

pub fn load_from_file(path: &str) -> Result<ExporterConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MetricsError::Config(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ExporterConfig> {
    let cfg: ExporterConfig = serde_yaml::from_str(s)
        .map_err(|e| MetricsError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
