//! Shared application state for the exporter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fastmetrics_client::{Registry, Summary, SummaryChild, Worker, WorkerCollector};
use fastmetrics_core::error::Result;

use crate::config::ExporterConfig;

pub const SCRAPE_DURATION_NAME: &str = "fastmetrics_scrape_duration_seconds";

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    worker: Worker,
    registry: Registry,
    scrape_duration: SummaryChild,
    draining: AtomicBool,
}

impl AppState {
    /// Start the worker and register the built-in collectors.
    pub fn new(cfg: ExporterConfig) -> Result<Self> {
        let worker = Worker::spawn(cfg.worker.to_worker_config())?;
        let registry = Registry::new(worker.clone());

        registry.register(Arc::new(WorkerCollector::new(worker.clone())))?;

        let scrape = &cfg.scrape_summary;
        let scrape_duration = Summary::builder()
            .name(SCRAPE_DURATION_NAME)
            .help("Time spent rendering the /metrics response.")
            .quantiles(&scrape.quantiles)
            .max_age_seconds(scrape.max_age_seconds)
            .age_buckets(scrape.age_buckets)
            .register(&registry)?
            .labels(&[])?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                worker,
                registry,
                scrape_duration,
                draining: AtomicBool::new(false),
            }),
        })
    }

    pub fn registry(&self) -> Registry {
        self.inner.registry.clone()
    }

    pub fn scrape_duration(&self) -> &SummaryChild {
        &self.inner.scrape_duration
    }

    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }

    /// Mark draining and stop the worker. Blocks until the worker thread
    /// exits; call from a blocking context.
    pub fn shutdown(&self) -> Result<()> {
        self.set_draining();
        self.inner.worker.shutdown()
    }
}
