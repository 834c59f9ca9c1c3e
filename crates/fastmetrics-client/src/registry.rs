//! Collector registry and exposition entry point.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use fastmetrics_core::error::{MetricsError, Result};
use fastmetrics_core::exposition::{render_text, MetricFamily};

use crate::collector::Collector;
use crate::worker::Worker;

struct Registered {
    families: Vec<String>,
    sample_names: Vec<String>,
    collector: Arc<dyn Collector>,
}

#[derive(Clone)]
pub struct Registry {
    worker: Worker,
    collectors: Arc<Mutex<Vec<Registered>>>,
}

impl Registry {
    pub fn new(worker: Worker) -> Self {
        Self { worker, collectors: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Worker that summaries built through this registry report to.
    pub fn worker(&self) -> &Worker {
        &self.worker
    }

    /// Add a collector. Fails if any sample name it can emit is taken, or
    /// if two of its own families emit the same sample name.
    pub fn register(&self, collector: Arc<dyn Collector>) -> Result<()> {
        let described = collector.describe();
        let families: Vec<String> = described.iter().map(|f| f.name.clone()).collect();
        let sample_names: Vec<String> = described
            .iter()
            .flat_map(|f| f.kind.sample_names(&f.name))
            .collect();

        // a collector must not collide with itself either
        let mut own: HashSet<&str> = HashSet::new();
        if let Some(dup) = sample_names.iter().find(|n| !own.insert(n.as_str())) {
            return Err(MetricsError::AlreadyRegistered(dup.clone()));
        }

        let mut collectors = self.lock()?;
        let taken: HashSet<&str> = collectors
            .iter()
            .flat_map(|r| r.sample_names.iter().map(String::as_str))
            .collect();
        if let Some(dup) = sample_names.iter().find(|n| taken.contains(n.as_str())) {
            return Err(MetricsError::AlreadyRegistered(dup.clone()));
        }

        tracing::debug!(families = ?families, "collector registered");
        collectors.push(Registered { families, sample_names, collector });
        Ok(())
    }

    /// Remove the collector that owns family `name`. Returns whether one was found.
    pub fn unregister(&self, name: &str) -> Result<bool> {
        let mut collectors = self.lock()?;
        let before = collectors.len();
        collectors.retain(|r| !r.families.iter().any(|f| f == name));
        Ok(collectors.len() != before)
    }

    /// Collect every family, sorted by name. Blocks on the worker.
    pub fn gather(&self) -> Result<Vec<MetricFamily>> {
        let collectors: Vec<Arc<dyn Collector>> = self
            .lock()?
            .iter()
            .map(|r| Arc::clone(&r.collector))
            .collect();

        let mut families = Vec::new();
        for c in collectors {
            families.extend(c.collect()?);
        }
        families.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(families)
    }

    /// Text exposition of `gather`.
    pub fn render(&self) -> Result<String> {
        Ok(render_text(&self.gather()?))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Registered>>> {
        self.collectors
            .lock()
            .map_err(|_| MetricsError::Internal("registry lock poisoned".into()))
    }
}
