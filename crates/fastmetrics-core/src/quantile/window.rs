//! Sliding time window over CKMS estimators.
//!
//! `age_buckets` estimators form a ring. Every value goes into every bucket;
//! queries read the current bucket. Every `max_age / age_buckets` the
//! current bucket is reset and the ring advances, so the bucket being read
//! covers between `max_age - interval` and `max_age` of history.

use std::sync::Arc;

use crate::error::{MetricsError, Result};

use super::ckms::{CkmsQuantiles, QuantileTarget};

#[derive(Debug, Clone)]
pub struct TimeWindowQuantiles {
    targets: Arc<[QuantileTarget]>,
    ring: Vec<CkmsQuantiles>,
    current: usize,
    last_rotate_millis: u64,
    rotate_every_millis: u64,
}

impl TimeWindowQuantiles {
    pub fn new(
        targets: Arc<[QuantileTarget]>,
        max_age_seconds: u64,
        age_buckets: usize,
        now_millis: u64,
    ) -> Result<Self> {
        let rotate_every_millis = rotation_interval_millis(max_age_seconds, age_buckets)?;
        Ok(Self::with_interval(targets, rotate_every_millis, age_buckets, now_millis))
    }

    /// Build from an interval already checked by `rotation_interval_millis`.
    /// Zero buckets or a zero interval are raised to one.
    pub fn with_interval(
        targets: Arc<[QuantileTarget]>,
        rotate_every_millis: u64,
        age_buckets: usize,
        now_millis: u64,
    ) -> Self {
        let ring = (0..age_buckets.max(1))
            .map(|_| CkmsQuantiles::new(Arc::clone(&targets)))
            .collect();
        Self {
            targets,
            ring,
            current: 0,
            last_rotate_millis: now_millis,
            rotate_every_millis: rotate_every_millis.max(1),
        }
    }

    pub fn insert(&mut self, now_millis: u64, value: f64) {
        self.rotate(now_millis);
        for bucket in &mut self.ring {
            bucket.insert(value);
        }
    }

    pub fn query(&mut self, now_millis: u64, q: f64) -> f64 {
        self.rotate(now_millis);
        self.ring[self.current].query(q)
    }

    /// Observations currently visible to `query`.
    pub fn window_count(&mut self, now_millis: u64) -> u64 {
        self.rotate(now_millis);
        self.ring[self.current].count()
    }

    fn rotate(&mut self, now_millis: u64) {
        let elapsed = now_millis.saturating_sub(self.last_rotate_millis);
        if elapsed <= self.rotate_every_millis {
            return;
        }
        // number of whole intervals strictly exceeded
        let steps = (elapsed - 1) / self.rotate_every_millis;
        let len = self.ring.len() as u64;

        for _ in 0..steps.min(len) {
            self.ring[self.current] = CkmsQuantiles::new(Arc::clone(&self.targets));
            self.current = (self.current + 1) % self.ring.len();
        }
        // remaining full laps land on the same bucket
        let extra = (steps.saturating_sub(len) % len) as usize;
        self.current = (self.current + extra) % self.ring.len();

        self.last_rotate_millis += steps * self.rotate_every_millis;
    }
}

/// `max_age_seconds * 1000 / age_buckets`, rejecting a zero interval.
pub fn rotation_interval_millis(max_age_seconds: u64, age_buckets: usize) -> Result<u64> {
    if max_age_seconds == 0 {
        return Err(MetricsError::InvalidArgument(format!(
            "maxAgeSeconds cannot be {max_age_seconds}"
        )));
    }
    if age_buckets == 0 {
        return Err(MetricsError::InvalidArgument(format!(
            "ageBuckets cannot be {age_buckets}"
        )));
    }
    let interval = max_age_seconds.saturating_mul(1000) / age_buckets as u64;
    if interval == 0 {
        return Err(MetricsError::InvalidArgument(format!(
            "rotation interval is zero: {max_age_seconds}s across {age_buckets} buckets"
        )));
    }
    Ok(interval)
}
