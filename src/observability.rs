//! Job outcome counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::queue::JobOutcome;

/// Counters for every job the queue consumer handles
#[derive(Debug, Default)]
pub struct Metrics {
    succeeded: AtomicU64,
    failed: AtomicU64,
    invalid: AtomicU64,
    not_found: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: JobOutcome) {
        let counter = match outcome {
            JobOutcome::Succeeded => &self.succeeded,
            JobOutcome::Failed => &self.failed,
            JobOutcome::Invalid => &self.invalid,
            JobOutcome::NotFound => &self.not_found,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(outcome = ?outcome, "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub succeeded: u64,
    pub failed: u64,
    pub invalid: u64,
    pub not_found: u64,
}

impl MetricsSnapshot {
    pub fn total(&self) -> u64 {
        self.succeeded + self.failed + self.invalid + self.not_found
    }
}
