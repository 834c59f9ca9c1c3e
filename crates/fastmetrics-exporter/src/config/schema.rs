use std::net::SocketAddr;

use serde::Deserialize;

use fastmetrics_client::WorkerConfig;
use fastmetrics_core::error::{MetricsError, Result};
use fastmetrics_core::quantile::{window, QuantileTarget};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub version: u32,

    #[serde(default)]
    pub exporter: ListenSection,

    #[serde(default)]
    pub worker: WorkerSection,

    #[serde(default)]
    pub scrape_summary: ScrapeSummarySection,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            version: 1,
            exporter: ListenSection::default(),
            worker: WorkerSection::default(),
            scrape_summary: ScrapeSummarySection::default(),
        }
    }
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetricsError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        self.exporter.validate()?;
        self.worker.validate()?;
        self.scrape_summary.validate()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListenSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ListenSection {
    fn default() -> Self {
        Self { listen: default_listen() }
    }
}

impl ListenSection {
    pub fn validate(&self) -> Result<()> {
        self.socket_addr().map(|_| ())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|_| {
            MetricsError::Config(format!(
                "exporter.listen must be a valid socket address, got {:?}",
                self.listen
            ))
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerSection {
    #[serde(default = "default_thread_name")]
    pub thread_name: String,

    #[serde(default = "default_stack_size_mib")]
    pub stack_size_mib: usize,
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            thread_name: default_thread_name(),
            stack_size_mib: default_stack_size_mib(),
        }
    }
}

impl WorkerSection {
    pub fn validate(&self) -> Result<()> {
        if self.thread_name.trim().is_empty() {
            return Err(MetricsError::Config("worker.thread_name must not be empty".into()));
        }
        if !(1..=1024).contains(&self.stack_size_mib) {
            return Err(MetricsError::Config(
                "worker.stack_size_mib must be between 1 and 1024".into(),
            ));
        }
        Ok(())
    }

    pub fn to_worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            thread_name: self.thread_name.clone(),
            stack_size_bytes: self.stack_size_mib << 20,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScrapeSummarySection {
    #[serde(default = "default_quantiles")]
    pub quantiles: Vec<QuantileTarget>,

    #[serde(default = "default_max_age_seconds")]
    pub max_age_seconds: u64,

    #[serde(default = "default_age_buckets")]
    pub age_buckets: usize,
}

impl Default for ScrapeSummarySection {
    fn default() -> Self {
        Self {
            quantiles: default_quantiles(),
            max_age_seconds: default_max_age_seconds(),
            age_buckets: default_age_buckets(),
        }
    }
}

impl ScrapeSummarySection {
    pub fn validate(&self) -> Result<()> {
        for q in &self.quantiles {
            q.validate()
                .map_err(|e| MetricsError::Config(format!("scrape_summary.quantiles: {e}")))?;
        }
        if !(1..=86_400).contains(&self.max_age_seconds) {
            return Err(MetricsError::Config(
                "scrape_summary.max_age_seconds must be between 1 and 86400".into(),
            ));
        }
        if !(1..=60).contains(&self.age_buckets) {
            return Err(MetricsError::Config(
                "scrape_summary.age_buckets must be between 1 and 60".into(),
            ));
        }
        window::rotation_interval_millis(self.max_age_seconds, self.age_buckets)
            .map_err(|e| MetricsError::Config(format!("scrape_summary: {e}")))?;
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:9464".into()
}
fn default_thread_name() -> String {
    "fastmetrics".into()
}
fn default_stack_size_mib() -> usize {
    128
}
fn default_quantiles() -> Vec<QuantileTarget> {
    vec![
        QuantileTarget::new(0.5, 0.05),
        QuantileTarget::new(0.9, 0.01),
        QuantileTarget::new(0.99, 0.001),
    ]
}
fn default_max_age_seconds() -> u64 {
    600
}
fn default_age_buckets() -> usize {
    5
}
