//! Background worker owning every summary series.
//!
//! Callers never touch estimator state. They push commands onto one
//! unbounded FIFO queue; a dedicated OS thread applies them in order.
//! Ordering gives read-your-writes per thread: a snapshot requested after
//! an observe on the same thread always includes that observation.
//!
//! The worker thread blocks on the queue, so it must be a plain OS thread,
//! never a task on an async runtime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};

use fastmetrics_core::error::{MetricsError, Result};
use fastmetrics_core::quantile::{window, QuantileTarget, TimeWindowQuantiles};

/// Identifies one series (one label-value combination) inside the worker.
pub type SeriesId = u64;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub thread_name: String,
    pub stack_size_bytes: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name: "fastmetrics".to_string(),
            stack_size_bytes: 128 << 20,
        }
    }
}

/// Window shape shared by every series of one summary. Only constructible
/// through `new`, so the rotation interval is always valid.
#[derive(Debug, Clone)]
pub struct WindowSpec {
    targets: Arc<[QuantileTarget]>,
    rotate_every_millis: u64,
    age_buckets: usize,
}

impl WindowSpec {
    pub fn new(
        targets: Vec<QuantileTarget>,
        max_age_seconds: u64,
        age_buckets: usize,
    ) -> Result<Self> {
        for t in &targets {
            t.validate()?;
        }
        let rotate_every_millis = window::rotation_interval_millis(max_age_seconds, age_buckets)?;
        Ok(Self {
            targets: Arc::from(targets),
            rotate_every_millis,
            age_buckets,
        })
    }

    fn new_window(&self, now: u64) -> Option<TimeWindowQuantiles> {
        if self.targets.is_empty() {
            return None;
        }
        Some(TimeWindowQuantiles::with_interval(
            Arc::clone(&self.targets),
            self.rotate_every_millis,
            self.age_buckets,
            now,
        ))
    }
}

/// Point-in-time view of one series.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryValue {
    pub now_millis: u64,
    pub count: u64,
    pub sum: f64,
    /// `(quantile, estimate)` sorted by quantile.
    pub quantiles: Vec<(f64, f64)>,
}

impl SummaryValue {
    /// Estimate for quantile `q`, if it is one of the targets.
    pub fn quantile(&self, q: f64) -> Option<f64> {
        self.quantiles.iter().find(|(k, _)| *k == q).map(|(_, v)| *v)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub enqueued: u64,
    pub processed: u64,
    pub live_series: u64,
}

enum Command {
    Register { id: SeriesId, spec: Arc<WindowSpec>, now: u64 },
    Observe { id: SeriesId, now: u64, amount: f64 },
    Snapshot { id: SeriesId, now: u64, reply: oneshot::Sender<SummaryValue> },
    Remove { id: SeriesId },
    Shutdown,
}

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    processed: AtomicU64,
    live_series: AtomicU64,
}

struct SeriesState {
    count: u64,
    sum: f64,
    targets: Arc<[QuantileTarget]>,
    window: Option<TimeWindowQuantiles>,
}

impl SeriesState {
    fn new(spec: &WindowSpec, now: u64) -> Self {
        Self {
            count: 0,
            sum: 0.0,
            targets: Arc::clone(&spec.targets),
            window: spec.new_window(now),
        }
    }

    fn observe(&mut self, now: u64, amount: f64) {
        self.sum += amount;
        self.count += 1;
        if let Some(w) = &mut self.window {
            w.insert(now, amount);
        }
    }

    fn snapshot(&mut self, now: u64) -> SummaryValue {
        let Self { count, sum, targets, window } = self;
        let quantiles = match window {
            Some(w) => targets.iter().map(|t| (t.quantile, w.query(now, t.quantile))).collect(),
            None => Vec::new(),
        };
        SummaryValue { now_millis: now, count: *count, sum: *sum, quantiles }
    }
}

struct WorkerShared {
    tx: mpsc::UnboundedSender<Command>,
    counters: Arc<Counters>,
    next_id: AtomicU64,
    thread: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a background worker. Cheap to clone; the thread exits once
/// `shutdown` is called or every handle has been dropped.
#[derive(Clone)]
pub struct Worker {
    inner: Arc<WorkerShared>,
}

impl Worker {
    pub fn spawn(cfg: WorkerConfig) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());

        let thread_counters = Arc::clone(&counters);
        let thread = std::thread::Builder::new()
            .name(cfg.thread_name.clone())
            .stack_size(cfg.stack_size_bytes)
            .spawn(move || run(rx, thread_counters))
            .map_err(|e| MetricsError::Internal(format!("spawn metrics worker failed: {e}")))?;

        tracing::info!(thread = %cfg.thread_name, "metrics worker started");

        Ok(Self {
            inner: Arc::new(WorkerShared {
                tx,
                counters,
                next_id: AtomicU64::new(1),
                thread: Mutex::new(Some(thread)),
            }),
        })
    }

    pub fn stats(&self) -> WorkerStats {
        let c = &self.inner.counters;
        WorkerStats {
            enqueued: c.enqueued.load(Ordering::Relaxed),
            processed: c.processed.load(Ordering::Relaxed),
            live_series: c.live_series.load(Ordering::Relaxed),
        }
    }

    /// Stop the thread after it drains everything queued so far, and wait
    /// for it. Calling it again is a no-op.
    pub fn shutdown(&self) -> Result<()> {
        let _ = self.send(Command::Shutdown);
        let handle = self
            .inner
            .thread
            .lock()
            .map_err(|_| MetricsError::Internal("worker handle lock poisoned".into()))?
            .take();
        if let Some(h) = handle {
            h.join()
                .map_err(|_| MetricsError::Internal("metrics worker panicked".into()))?;
            tracing::info!("metrics worker stopped");
        }
        Ok(())
    }

    pub(crate) fn allocate_id(&self) -> SeriesId {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn register(&self, id: SeriesId, spec: Arc<WindowSpec>, now: u64) -> Result<()> {
        self.send(Command::Register { id, spec, now })
    }

    pub(crate) fn observe(&self, id: SeriesId, now: u64, amount: f64) {
        if self.send(Command::Observe { id, now, amount }).is_err() {
            tracing::debug!(series = id, "observation dropped, worker stopped");
        }
    }

    pub(crate) fn remove(&self, id: SeriesId) {
        let _ = self.send(Command::Remove { id });
    }

    /// Queue a snapshot request without waiting for it.
    pub(crate) fn request_snapshot(
        &self,
        id: SeriesId,
        now: u64,
    ) -> Result<oneshot::Receiver<SummaryValue>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { id, now, reply })?;
        Ok(rx)
    }

    /// Blocking snapshot. Panics if called from inside an async runtime
    /// (tokio's `blocking_recv` rule); use `snapshot_async` there.
    pub(crate) fn snapshot(&self, id: SeriesId, now: u64) -> Result<SummaryValue> {
        self.request_snapshot(id, now)?
            .blocking_recv()
            .map_err(|_| MetricsError::WorkerUnavailable)
    }

    pub(crate) async fn snapshot_async(&self, id: SeriesId, now: u64) -> Result<SummaryValue> {
        self.request_snapshot(id, now)?
            .await
            .map_err(|_| MetricsError::WorkerUnavailable)
    }

    fn send(&self, cmd: Command) -> Result<()> {
        let c = &self.inner.counters;
        c.enqueued.fetch_add(1, Ordering::Relaxed);
        self.inner.tx.send(cmd).map_err(|_| {
            c.enqueued.fetch_sub(1, Ordering::Relaxed);
            MetricsError::WorkerUnavailable
        })
    }
}

fn run(mut rx: mpsc::UnboundedReceiver<Command>, counters: Arc<Counters>) {
    let mut series: HashMap<SeriesId, SeriesState> = HashMap::new();

    while let Some(cmd) = rx.blocking_recv() {
        counters.processed.fetch_add(1, Ordering::Relaxed);
        match cmd {
            Command::Register { id, spec, now } => {
                series.insert(id, SeriesState::new(&spec, now));
            }
            Command::Observe { id, now, amount } => match series.get_mut(&id) {
                Some(s) => s.observe(now, amount),
                None => tracing::debug!(series = id, "observe for unknown series ignored"),
            },
            Command::Snapshot { id, now, reply } => match series.get_mut(&id) {
                Some(s) => {
                    // requester may have given up
                    let _ = reply.send(s.snapshot(now));
                }
                None => tracing::debug!(series = id, "snapshot for unknown series ignored"),
            },
            Command::Remove { id } => {
                series.remove(&id);
            }
            Command::Shutdown => break,
        }
        counters.live_series.store(series.len() as u64, Ordering::Relaxed);
    }

    counters.live_series.store(0, Ordering::Relaxed);
}
