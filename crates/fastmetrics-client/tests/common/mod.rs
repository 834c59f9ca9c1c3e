//! Shared helpers for client integration tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(dead_code)]

use std::sync::Once;

use fastmetrics_client::{Worker, WorkerConfig};

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness so it shows on failure.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
            .with_test_writer()
            .try_init();
    });
}

pub fn worker() -> Worker {
    init_tracing();
    Worker::spawn(WorkerConfig {
        thread_name: "fastmetrics-test".into(),
        stack_size_bytes: 4 << 20,
    })
    .expect("spawn worker")
}
