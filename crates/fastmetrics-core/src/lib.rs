//! fastmetrics core: quantile estimators, exposition model, error types.
//!
//! This crate holds the pieces that do not care which thread they run on:
//! the CKMS estimator and its time-windowed ring, the metric-family model
//! with its Prometheus text renderer, and name validation. The background
//! worker and collectors that drive them live in `fastmetrics-client`.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `MetricsError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod clock;
pub mod error;
pub mod exposition;
pub mod naming;
pub mod quantile;

/// Shared result type.
pub use error::{MetricsError, Result};
