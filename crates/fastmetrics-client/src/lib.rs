//! fastmetrics client: summaries whose hot path is a queue push.
//!
//! Every `observe` is stamped on the calling thread and handed to a single
//! background worker that owns all estimator state. Readers ask the same
//! worker for snapshots, so no lock ever guards a CKMS estimator.

pub mod collector;
pub mod registry;
pub mod summary;
pub mod worker;

pub use collector::{Collector, WorkerCollector};
pub use registry::Registry;
pub use summary::{Summary, SummaryBuilder, SummaryChild, Timer};
pub use worker::{SummaryValue, Worker, WorkerConfig, WorkerStats};
