//! Dispatch metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one dispatcher
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Records evaluated
    record_count: AtomicU64,
    /// Records matched by at least one processor
    matched_count: AtomicU64,
    /// Handler invocations
    invocation_count: AtomicU64,
    /// Rejected handler invocations
    failure_count: AtomicU64,
    /// Predicate errors (processor skipped for that record)
    predicate_error_count: AtomicU64,
    /// Failure reports emitted
    report_count: AtomicU64,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_count(&self) -> u64 {
        self.record_count.load(Ordering::Relaxed)
    }

    pub fn inc_record_count(&self) {
        self.record_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_matched_count(&self) {
        self.matched_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn invocation_count(&self) -> u64 {
        self.invocation_count.load(Ordering::Relaxed)
    }

    pub fn add_invocations(&self, n: u64) {
        self.invocation_count.fetch_add(n, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn add_failures(&self, n: u64) {
        self.failure_count.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_predicate_error_count(&self) {
        self.predicate_error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_report_count(&self) {
        self.report_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            records: self.record_count(),
            matched: self.matched_count.load(Ordering::Relaxed),
            invocations: self.invocation_count(),
            failures: self.failure_count(),
            predicate_errors: self.predicate_error_count.load(Ordering::Relaxed),
            failure_reports: self.report_count.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    pub records: u64,
    pub matched: u64,
    pub invocations: u64,
    pub failures: u64,
    pub predicate_errors: u64,
    pub failure_reports: u64,
}
