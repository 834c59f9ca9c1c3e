//! Summary collector: count, sum and sliding-window quantiles per label set.

use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use fastmetrics_core::clock::{Clock, SystemClock};
use fastmetrics_core::error::{MetricsError, Result};
use fastmetrics_core::exposition::{format_value, MetricFamily, MetricType, Sample};
use fastmetrics_core::naming;
use fastmetrics_core::quantile::QuantileTarget;

use crate::collector::Collector;
use crate::registry::Registry;
use crate::worker::{SeriesId, SummaryValue, WindowSpec, Worker};

const QUANTILE_LABEL: &str = "quantile";
const DEFAULT_MAX_AGE_SECONDS: u64 = 10 * 60;
const DEFAULT_AGE_BUCKETS: usize = 5;

pub struct SummaryBuilder {
    namespace: String,
    subsystem: String,
    name: String,
    help: String,
    label_names: Vec<String>,
    targets: Vec<QuantileTarget>,
    max_age_seconds: u64,
    age_buckets: usize,
    clock: Arc<dyn Clock>,
}

impl Default for SummaryBuilder {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            subsystem: String::new(),
            name: String::new(),
            help: String::new(),
            label_names: Vec::new(),
            targets: Vec::new(),
            max_age_seconds: DEFAULT_MAX_AGE_SECONDS,
            age_buckets: DEFAULT_AGE_BUCKETS,
            clock: Arc::new(SystemClock),
        }
    }
}

impl SummaryBuilder {
    pub fn namespace(mut self, v: impl Into<String>) -> Self {
        self.namespace = v.into();
        self
    }

    pub fn subsystem(mut self, v: impl Into<String>) -> Self {
        self.subsystem = v.into();
        self
    }

    pub fn name(mut self, v: impl Into<String>) -> Self {
        self.name = v.into();
        self
    }

    pub fn help(mut self, v: impl Into<String>) -> Self {
        self.help = v.into();
        self
    }

    pub fn label_names(mut self, names: &[&str]) -> Self {
        self.label_names = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Track quantile `quantile` with allowed rank error `error`.
    pub fn quantile(mut self, quantile: f64, error: f64) -> Self {
        self.targets.push(QuantileTarget::new(quantile, error));
        self
    }

    pub fn quantiles(mut self, targets: &[QuantileTarget]) -> Self {
        self.targets.extend_from_slice(targets);
        self
    }

    pub fn max_age_seconds(mut self, v: u64) -> Self {
        self.max_age_seconds = v;
        self
    }

    pub fn age_buckets(mut self, v: usize) -> Self {
        self.age_buckets = v;
        self
    }

    /// Time source for window rotation (defaults to the wall clock).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self, worker: &Worker) -> Result<Summary> {
        if self.name.is_empty() {
            return Err(MetricsError::InvalidArgument("name hasn't been set".into()));
        }
        if self.help.is_empty() {
            return Err(MetricsError::InvalidArgument("help hasn't been set".into()));
        }
        let full_name = naming::full_name(&self.namespace, &self.subsystem, &self.name);
        naming::validate_metric_name(&full_name)?;
        for l in &self.label_names {
            naming::validate_label_name(l)?;
            if l == QUANTILE_LABEL {
                return Err(MetricsError::InvalidName(
                    "Summary cannot have a label named 'quantile'.".into(),
                ));
            }
        }

        let spec = WindowSpec::new(
            dedup_targets(self.targets),
            self.max_age_seconds,
            self.age_buckets,
        )?;

        let core = Arc::new(SummaryCore {
            full_name,
            help: self.help,
            label_names: self.label_names,
            spec: Arc::new(spec),
            clock: self.clock,
            worker: worker.clone(),
            children: DashMap::new(),
        });
        let summary = Summary { core };
        summary.init_unlabelled()?;
        Ok(summary)
    }

    /// Build against the registry's worker and register the result.
    pub fn register(self, registry: &Registry) -> Result<Summary> {
        let summary = self.build(registry.worker())?;
        registry.register(Arc::new(summary.clone()))?;
        Ok(summary)
    }
}

/// Sort by quantile; a repeated quantile keeps the last declared error.
fn dedup_targets(targets: Vec<QuantileTarget>) -> Vec<QuantileTarget> {
    let mut out: Vec<QuantileTarget> = Vec::with_capacity(targets.len());
    for t in targets {
        match out.iter_mut().find(|o| o.quantile == t.quantile) {
            Some(existing) => existing.error = t.error,
            None => out.push(t),
        }
    }
    out.sort_by(|a, b| a.quantile.total_cmp(&b.quantile));
    out
}

struct SummaryCore {
    full_name: String,
    help: String,
    label_names: Vec<String>,
    spec: Arc<WindowSpec>,
    clock: Arc<dyn Clock>,
    worker: Worker,
    children: DashMap<Vec<String>, SummaryChild>,
}

impl SummaryCore {
    fn new_child(&self) -> Result<SummaryChild> {
        let id = self.worker.allocate_id();
        self.worker
            .register(id, Arc::clone(&self.spec), self.clock.now_millis())?;
        Ok(SummaryChild {
            series: Arc::new(Series {
                id,
                worker: self.worker.clone(),
                clock: Arc::clone(&self.clock),
            }),
        })
    }
}

/// A summary metric. Cloning shares the same series.
#[derive(Clone)]
pub struct Summary {
    core: Arc<SummaryCore>,
}

impl Summary {
    pub fn builder() -> SummaryBuilder {
        SummaryBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.core.full_name
    }

    /// Series for these label values, created on first use.
    pub fn labels(&self, values: &[&str]) -> Result<SummaryChild> {
        let expected = self.core.label_names.len();
        if values.len() != expected {
            return Err(MetricsError::LabelCardinality { expected, got: values.len() });
        }
        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        if let Some(c) = self.core.children.get(&key) {
            return Ok(c.value().clone());
        }
        match self.core.children.entry(key) {
            Entry::Occupied(e) => Ok(e.get().clone()),
            Entry::Vacant(e) => {
                let child = self.core.new_child()?;
                e.insert(child.clone());
                Ok(child)
            }
        }
    }

    /// Forget a series. Its state is freed once outstanding handles drop.
    pub fn remove(&self, values: &[&str]) {
        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        self.core.children.remove(&key);
    }

    /// Forget every series (an unlabelled summary starts a fresh one).
    pub fn clear(&self) -> Result<()> {
        self.core.children.clear();
        self.init_unlabelled()
    }

    /// Observe on the unlabelled series.
    pub fn observe(&self, amount: f64) -> Result<()> {
        self.labels(&[])?.observe(amount);
        Ok(())
    }

    /// Snapshot of the unlabelled series.
    pub fn snapshot(&self) -> Result<SummaryValue> {
        self.labels(&[])?.snapshot()
    }

    fn init_unlabelled(&self) -> Result<()> {
        if self.core.label_names.is_empty() {
            self.labels(&[])?;
        }
        Ok(())
    }
}

impl Collector for Summary {
    fn describe(&self) -> Vec<MetricFamily> {
        vec![MetricFamily::described(
            self.core.full_name.clone(),
            self.core.help.clone(),
            MetricType::Summary,
        )]
    }

    fn collect(&self) -> Result<Vec<MetricFamily>> {
        let core = &self.core;
        let mut children: Vec<(Vec<String>, SummaryChild)> = core
            .children
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        children.sort_by(|a, b| a.0.cmp(&b.0));

        // queue every request before waiting on any
        let mut pending = Vec::with_capacity(children.len());
        for (values, child) in children {
            let rx = child.series.request_snapshot()?;
            pending.push((values, rx));
        }

        let name = &core.full_name;
        let mut samples = Vec::new();
        for (values, rx) in pending {
            let v = rx.blocking_recv().map_err(|_| MetricsError::WorkerUnavailable)?;
            let labels: Vec<(String, String)> = core
                .label_names
                .iter()
                .cloned()
                .zip(values)
                .collect();

            for (q, estimate) in &v.quantiles {
                let mut with_q = labels.clone();
                with_q.push((QUANTILE_LABEL.to_string(), format_value(*q)));
                samples.push(Sample::new(name.clone(), with_q, *estimate));
            }
            samples.push(Sample::new(format!("{name}_sum"), labels.clone(), v.sum));
            samples.push(Sample::new(format!("{name}_count"), labels, v.count as f64));
        }

        Ok(vec![MetricFamily {
            name: name.clone(),
            help: core.help.clone(),
            kind: MetricType::Summary,
            samples,
        }])
    }
}

struct Series {
    id: SeriesId,
    worker: Worker,
    clock: Arc<dyn Clock>,
}

impl Series {
    fn request_snapshot(&self) -> Result<tokio::sync::oneshot::Receiver<SummaryValue>> {
        self.worker.request_snapshot(self.id, self.clock.now_millis())
    }
}

impl Drop for Series {
    fn drop(&mut self) {
        self.worker.remove(self.id);
    }
}

/// One labelled series of a summary.
#[derive(Clone)]
pub struct SummaryChild {
    series: Arc<Series>,
}

impl SummaryChild {
    /// Record a value. Never blocks; dropped silently if the worker stopped.
    pub fn observe(&self, amount: f64) {
        let s = &self.series;
        s.worker.observe(s.id, s.clock.now_millis(), amount);
    }

    /// Blocking snapshot; from async code use `snapshot_async`.
    pub fn snapshot(&self) -> Result<SummaryValue> {
        let s = &self.series;
        s.worker.snapshot(s.id, s.clock.now_millis())
    }

    pub async fn snapshot_async(&self) -> Result<SummaryValue> {
        let s = &self.series;
        s.worker.snapshot_async(s.id, s.clock.now_millis()).await
    }

    /// Start timing; the elapsed seconds are observed when the timer stops
    /// or is dropped.
    pub fn start_timer(&self) -> Timer {
        Timer { child: self.clone(), start: Instant::now(), observed: false }
    }

    /// Run `f` and observe how long it took, in seconds.
    pub fn time<R>(&self, f: impl FnOnce() -> R) -> R {
        let _timer = self.start_timer();
        f()
    }
}

pub struct Timer {
    child: SummaryChild,
    start: Instant,
    observed: bool,
}

impl Timer {
    /// Observe the elapsed time and return it in seconds.
    pub fn observe_duration(mut self) -> f64 {
        self.record()
    }

    fn record(&mut self) -> f64 {
        let secs = self.start.elapsed().as_secs_f64();
        self.child.observe(secs);
        self.observed = true;
        secs
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if !self.observed {
            self.record();
        }
    }
}
