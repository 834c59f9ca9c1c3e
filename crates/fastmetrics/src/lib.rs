//! Top-level facade crate for fastmetrics.
//!
//! Re-exports the core, client and exporter crates so users can depend on a single crate.

pub mod core {
    pub use fastmetrics_core::*;
}

pub mod client {
    pub use fastmetrics_client::*;
}

pub mod exporter {
    pub use fastmetrics_exporter::*;
}

pub use fastmetrics_client::{Registry, Summary, SummaryChild, Worker, WorkerConfig};
