//! fastmetrics exporter library entry.
//!
//! Wires a metrics worker, a registry with the worker's self-metrics, and a
//! scrape-duration summary behind the ops HTTP endpoints. Consumed by the
//! binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod ops;
pub mod router;
