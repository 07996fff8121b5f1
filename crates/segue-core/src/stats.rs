//! Opt-in cycle instrumentation.
//!
//! Owned by the engine rather than living in process-wide state; disabled
//! collectors cost one atomic load per cycle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Snapshot of cycle timings.
#[derive(Debug, Clone, Default)]
pub struct CycleMetrics {
    pub cycles: u64,
    pub total: Duration,
    pub max: Duration,
    pub average: Duration,
}

/// Accumulates per-cycle durations of the dispatch path.
pub struct CycleStats {
    enabled: AtomicBool,
    cycles: AtomicU64,
    total_ns: AtomicU64,
    max_ns: AtomicU64,
}

impl CycleStats {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            cycles: AtomicU64::new(0),
            total_ns: AtomicU64::new(0),
            max_ns: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    pub fn record(&self, elapsed: Duration) {
        if !self.is_enabled() {
            return;
        }
        let ns = elapsed.as_nanos() as u64;
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.total_ns.fetch_add(ns, Ordering::Relaxed);
        self.max_ns.fetch_max(ns, Ordering::Relaxed);
    }

    pub fn metrics(&self) -> CycleMetrics {
        let cycles = self.cycles.load(Ordering::Relaxed);
        let total = Duration::from_nanos(self.total_ns.load(Ordering::Relaxed));
        let max = Duration::from_nanos(self.max_ns.load(Ordering::Relaxed));
        let average = if cycles > 0 {
            total / cycles as u32
        } else {
            Duration::ZERO
        };
        CycleMetrics {
            cycles,
            total,
            max,
            average,
        }
    }

    pub fn reset(&self) {
        self.cycles.store(0, Ordering::Relaxed);
        self.total_ns.store(0, Ordering::Relaxed);
        self.max_ns.store(0, Ordering::Relaxed);
    }
}
