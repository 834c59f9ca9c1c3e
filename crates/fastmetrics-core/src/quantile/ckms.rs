//! CKMS targeted-quantile estimator.
//!
//! Cormode, Korn, Muthukrishnan, Srivastava: "Effective Computation of
//! Biased Quantiles over Data Streams" (ICDE 2005).
//!
//! Values are buffered and merged in sorted batches. Each retained item
//! carries `g` (rank gap to its predecessor) and `delta` (rank
//! uncertainty). Compression merges neighbours while the invariant
//! `g + g' + delta' <= f(r, n)` holds, so memory stays logarithmic in the
//! stream length while every target keeps its error bound.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::{MetricsError, Result};

/// Insert buffer size. Values are merged into the sample list in batches
/// of this many.
const BUFFER_CAPACITY: usize = 500;

/// A quantile to track and its allowed rank error (both in `[0, 1]`).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuantileTarget {
    pub quantile: f64,
    pub error: f64,
}

impl QuantileTarget {
    pub fn new(quantile: f64, error: f64) -> Self {
        Self { quantile, error }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.quantile) {
            return Err(MetricsError::InvalidArgument(format!(
                "Quantile {} invalid: Expected number between 0.0 and 1.0.",
                self.quantile
            )));
        }
        if !(0.0..=1.0).contains(&self.error) {
            return Err(MetricsError::InvalidArgument(format!(
                "Error {} invalid: Expected number between 0.0 and 1.0.",
                self.error
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Item {
    value: f64,
    g: u64,
    delta: u64,
}

/// Allowed rank uncertainty at rank `r` of `n` observations: the tightest
/// bound over all targets.
///
/// Ranks at or below the target use the `(n - r) / (1 - q)` side, so a
/// `q = 0` target stays finite at rank 0. The only `0 / 0` left is `q = 1`
/// at `r = n`, which is the exact maximum and allows no error.
fn invariant(targets: &[QuantileTarget], r: f64, n: f64) -> f64 {
    let mut min = f64::MAX;
    for t in targets {
        let f = if r <= (t.quantile * n).floor() {
            2.0 * t.error * (n - r) / (1.0 - t.quantile)
        } else {
            2.0 * t.error * r / t.quantile
        };
        let f = if f.is_nan() { 0.0 } else { f };
        if f < min {
            min = f;
        }
    }
    min
}

#[derive(Debug, Clone)]
pub struct CkmsQuantiles {
    targets: Arc<[QuantileTarget]>,
    samples: Vec<Item>,
    buffer: Vec<f64>,
    count: u64,
}

impl CkmsQuantiles {
    pub fn new(targets: Arc<[QuantileTarget]>) -> Self {
        Self {
            targets,
            samples: Vec::new(),
            buffer: Vec::with_capacity(BUFFER_CAPACITY),
            count: 0,
        }
    }

    /// Number of values inserted so far (including buffered ones).
    pub fn count(&self) -> u64 {
        self.count + self.buffer.len() as u64
    }

    /// Retained item count; grows with the log of the stream, not the stream.
    pub fn retained(&self) -> usize {
        self.samples.len()
    }

    pub fn insert(&mut self, value: f64) {
        self.buffer.push(value);
        if self.buffer.len() >= BUFFER_CAPACITY {
            self.flush();
            self.compress();
        }
    }

    /// Estimate quantile `q`. `NaN` when nothing has been inserted.
    pub fn query(&mut self, q: f64) -> f64 {
        self.flush();
        self.compress();

        let Some(first) = self.samples.first() else {
            return f64::NAN;
        };

        let n = self.count as f64;
        let mut t = (q * n).ceil();
        t += (invariant(&self.targets, t, n) / 2.0).ceil();

        let mut prev = first;
        let mut r = 0.0;
        for cur in &self.samples[1..] {
            r += prev.g as f64;
            if r + cur.g as f64 + cur.delta as f64 > t {
                return prev.value;
            }
            prev = cur;
        }
        prev.value
    }

    /// Merge the sorted buffer into the sample list.
    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let mut incoming = std::mem::take(&mut self.buffer);
        incoming.sort_by(|a, b| a.total_cmp(b));

        let mut merged = Vec::with_capacity(self.samples.len() + incoming.len());
        let mut existing = std::mem::take(&mut self.samples).into_iter().peekable();
        let mut rank = 0.0;

        for &v in &incoming {
            while let Some(item) = existing.next_if(|it| it.value <= v) {
                rank += item.g as f64;
                merged.push(item);
            }

            // head and tail are known exactly
            let delta = if merged.is_empty() || existing.peek().is_none() {
                0
            } else {
                let f = invariant(&self.targets, rank, self.count as f64).floor() - 1.0;
                if f > 0.0 { f as u64 } else { 0 }
            };

            merged.push(Item { value: v, g: 1, delta });
            self.count += 1;
            rank += 1.0;
        }
        merged.extend(existing);

        self.samples = merged;
        incoming.clear();
        self.buffer = incoming;
    }

    /// Merge adjacent items, walking from the tail. The head item is never
    /// folded so the minimum stays exact.
    fn compress(&mut self) {
        if self.samples.len() < 3 {
            return;
        }
        let n = self.count as f64;
        let mut samples = std::mem::take(&mut self.samples);
        let rest = samples.split_off(1);

        let mut rev = rest.into_iter().rev();
        let Some(mut x) = rev.next() else {
            self.samples = samples;
            return;
        };

        let mut kept = Vec::new();
        // rank mass at and after the current candidate
        let mut suffix = x.g as f64;
        for c in rev {
            let r = n - suffix - c.g as f64;
            if c.g as f64 + x.g as f64 + x.delta as f64 <= invariant(&self.targets, r, n) {
                x.g += c.g;
            } else {
                kept.push(x);
                x = c;
            }
            suffix += c.g as f64;
        }
        kept.push(x);

        samples.extend(kept.into_iter().rev());
        self.samples = samples;
    }
}
