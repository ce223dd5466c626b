//! Per-call diagnostics of the cleaning pipeline

use std::sync::atomic::{AtomicU64, Ordering};

/// A candidate dropped because it equals another field's cached value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlap {
    /// Field the candidate was proposed for
    pub field: String,
    /// The dropped candidate
    pub value: String,
    /// Field whose cached value it collided with
    pub colliding_field: String,
}

/// Receives overlap events as they happen
pub trait OverlapObserver: Send + Sync {
    fn on_overlap(&self, overlap: &Overlap);
}

/// Counts overlaps across calls, for callers feeding their own telemetry
#[derive(Debug, Default)]
pub struct OverlapCounter {
    count: AtomicU64,
}

impl OverlapCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl OverlapObserver for OverlapCounter {
    fn on_overlap(&self, _overlap: &Overlap) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Diagnostics collected during one `clean` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanDiagnostics {
    pub overlaps: Vec<Overlap>,
}

impl CleanDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_overlap(&mut self, overlap: Overlap) {
        self.overlaps.push(overlap);
    }

    pub fn overlap_count(&self) -> usize {
        self.overlaps.len()
    }
}
