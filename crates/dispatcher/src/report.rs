//! Failure reports and error sinks

use std::sync::{Mutex, PoisonError};

use contracts::SourceRecord;
use serde::Serialize;
use tracing::error;

/// One rejected handler invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerFailure {
    pub processor: String,
    pub message: String,
}

/// Emitted once per record when at least one matched handler rejected
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailureReport {
    pub record: SourceRecord,
    /// Matched handlers that were invoked
    pub total_invoked: usize,
    pub failed_count: usize,
    pub errors: Vec<HandlerFailure>,
}

/// Destination for failure reports
///
/// Reports are informational: the dispatcher never propagates them.
pub trait ErrorSink: Send + Sync {
    fn report(&self, report: BatchFailureReport);
}

/// Logs reports at error level
#[derive(Debug, Default)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(&self, report: BatchFailureReport) {
        let processors: Vec<&str> = report.errors.iter().map(|e| e.processor.as_str()).collect();
        error!(
            shape = report.record.shape(),
            scope = report.record.scope(),
            total_invoked = report.total_invoked,
            failed = report.failed_count,
            processors = ?processors,
            "record handlers failed"
        );
    }
}

/// Keeps every report in memory (CLI summaries, tests)
#[derive(Debug, Default)]
pub struct CollectingErrorSink {
    reports: Mutex<Vec<BatchFailureReport>>,
}

impl CollectingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<BatchFailureReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorSink for CollectingErrorSink {
    fn report(&self, report: BatchFailureReport) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report);
    }
}

/// Forwards each report to several sinks
pub struct TeeErrorSink {
    sinks: Vec<std::sync::Arc<dyn ErrorSink>>,
}

impl TeeErrorSink {
    pub fn new(sinks: Vec<std::sync::Arc<dyn ErrorSink>>) -> Self {
        Self { sinks }
    }
}

impl ErrorSink for TeeErrorSink {
    fn report(&self, report: BatchFailureReport) {
        for sink in &self.sinks {
            sink.report(report.clone());
        }
    }
}
