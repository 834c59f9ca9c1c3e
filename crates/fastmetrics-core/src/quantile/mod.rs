//! Streaming quantile estimation.
//!
//! - `ckms`: targeted-quantile estimator with bounded rank error.
//! - `window`: ring of estimators giving a sliding time window.

pub mod ckms;
pub mod window;

pub use ckms::{CkmsQuantiles, QuantileTarget};
pub use window::TimeWindowQuantiles;
