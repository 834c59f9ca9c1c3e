//! Collector seam between metric sources and the registry.

use fastmetrics_core::error::Result;
use fastmetrics_core::exposition::{MetricFamily, MetricType, Sample};

use crate::worker::Worker;

/// Source of metric families.
///
/// `collect` may block on the metrics worker, so call it from a plain
/// thread (or `spawn_blocking`), not from an async task.
pub trait Collector: Send + Sync {
    /// Families this collector emits, without samples. Used for name
    /// collision checks at registration.
    fn describe(&self) -> Vec<MetricFamily>;

    fn collect(&self) -> Result<Vec<MetricFamily>>;
}

const ENQUEUED: &str = "fastmetrics_worker_commands_enqueued_total";
const PROCESSED: &str = "fastmetrics_worker_commands_processed_total";
const SERIES: &str = "fastmetrics_worker_series";

/// Self-metrics of a `Worker`: queue throughput and live series.
pub struct WorkerCollector {
    worker: Worker,
}

impl WorkerCollector {
    pub fn new(worker: Worker) -> Self {
        Self { worker }
    }
}

impl Collector for WorkerCollector {
    fn describe(&self) -> Vec<MetricFamily> {
        vec![
            MetricFamily::described(
                ENQUEUED,
                "Commands pushed onto the metrics worker queue.",
                MetricType::Counter,
            ),
            MetricFamily::described(
                PROCESSED,
                "Commands applied by the metrics worker.",
                MetricType::Counter,
            ),
            MetricFamily::described(
                SERIES,
                "Summary series currently held by the metrics worker.",
                MetricType::Gauge,
            ),
        ]
    }

    fn collect(&self) -> Result<Vec<MetricFamily>> {
        let stats = self.worker.stats();
        let values = [stats.enqueued, stats.processed, stats.live_series];
        Ok(self
            .describe()
            .into_iter()
            .zip(values)
            .map(|(mut f, v)| {
                f.samples.push(Sample::new(f.name.clone(), Vec::new(), v as f64));
                f
            })
            .collect())
    }
}
