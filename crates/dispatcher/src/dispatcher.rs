//! Dispatcher - predicate evaluation and concurrent handler invocation

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use ingestion::{RawEvent, RecordNormalizer};
use tracing::{debug, info, instrument, warn};

use contracts::{Processor, SourceRecord};

use crate::error::DispatcherError;
use crate::metrics::{DispatchMetrics, DispatchSnapshot};
use crate::report::{BatchFailureReport, ErrorSink, HandlerFailure, LogErrorSink};

/// Summary of one dispatched batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub records: usize,
    /// Handler invocations across all records
    pub invocations: usize,
    pub failed_invocations: usize,
    /// Records that produced a failure report
    pub failure_reports: usize,
}

impl BatchSummary {
    pub fn merge(&mut self, other: BatchSummary) {
        self.records += other.records;
        self.invocations += other.invocations;
        self.failed_invocations += other.failed_invocations;
        self.failure_reports += other.failure_reports;
    }
}

/// Routes each record to every processor whose predicate matches
///
/// For one record, matched handlers run concurrently and are all awaited;
/// a rejection never cancels the others and never escapes the dispatcher.
pub struct Dispatcher {
    name: String,
    processors: Vec<Arc<dyn Processor>>,
    normalizer: RecordNormalizer,
    error_sink: Arc<dyn ErrorSink>,
    metrics: Arc<DispatchMetrics>,
}

impl Dispatcher {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            processors: Vec::new(),
            normalizer: RecordNormalizer::new(),
            error_sink: Arc::new(LogErrorSink),
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    /// Replace the error sink (default: `LogErrorSink`)
    pub fn with_error_sink(mut self, error_sink: Arc<dyn ErrorSink>) -> Self {
        self.error_sink = error_sink;
        self
    }

    /// Share a normalizer (and its metrics) with other dispatchers
    pub fn with_normalizer(mut self, normalizer: RecordNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Register a processor. Registration order carries no meaning.
    ///
    /// # Errors
    /// `DuplicateProcessor` if a processor with the same name is registered
    pub fn register(&mut self, processor: Arc<dyn Processor>) -> Result<(), DispatcherError> {
        if self.processors.iter().any(|p| p.name() == processor.name()) {
            return Err(DispatcherError::DuplicateProcessor(
                processor.name().to_string(),
            ));
        }
        debug!(dispatcher = %self.name, processor = processor.name(), "processor registered");
        self.processors.push(processor);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn processor_names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    pub fn metrics(&self) -> DispatchSnapshot {
        self.metrics.snapshot()
    }

    /// Normalize raw events, then dispatch them in order
    #[instrument(name = "dispatch_batch", skip_all, fields(dispatcher = %self.name, records = raw.len()))]
    pub async fn dispatch_batch(&self, raw: &[RawEvent]) -> BatchSummary {
        let records = self.normalizer.normalize_batch(raw);
        self.dispatch_records(&records).await
    }

    /// Dispatch already-normalized records in order
    pub async fn dispatch_records(&self, records: &[SourceRecord]) -> BatchSummary {
        let start = Instant::now();
        let mut summary = BatchSummary::default();

        for record in records {
            summary.merge(self.dispatch_record(record).await);
        }

        metrics::histogram!("chat_fanout_dispatch_duration_seconds", "dispatcher" => self.name.clone())
            .record(start.elapsed().as_secs_f64());
        info!(
            dispatcher = %self.name,
            records = summary.records,
            invocations = summary.invocations,
            failed = summary.failed_invocations,
            "batch dispatched"
        );
        summary
    }

    /// Dispatch one record
    pub async fn dispatch_record(&self, record: &SourceRecord) -> BatchSummary {
        self.metrics.inc_record_count();
        let matched = self.matching_processors(record);

        let mut summary = BatchSummary {
            records: 1,
            ..Default::default()
        };
        if matched.is_empty() {
            return summary;
        }
        self.metrics.inc_matched_count();

        let results = join_all(matched.iter().map(|processor| async move {
            let outcome = processor.handle(record).await;
            (processor.name(), outcome)
        }))
        .await;

        let errors: Vec<HandlerFailure> = results
            .into_iter()
            .filter_map(|(processor, outcome)| {
                let status = if outcome.is_ok() { "ok" } else { "error" };
                metrics::counter!(
                    "chat_fanout_handler_invocations_total",
                    "processor" => processor.to_string(),
                    "status" => status
                )
                .increment(1);

                outcome.err().map(|e| HandlerFailure {
                    processor: processor.to_string(),
                    message: e.to_string(),
                })
            })
            .collect();

        summary.invocations = matched.len();
        summary.failed_invocations = errors.len();
        self.metrics.add_invocations(matched.len() as u64);
        self.metrics.add_failures(errors.len() as u64);

        if !errors.is_empty() {
            summary.failure_reports = 1;
            self.metrics.inc_report_count();
            metrics::counter!("chat_fanout_failure_reports_total", "dispatcher" => self.name.clone())
                .increment(1);
            self.error_sink.report(BatchFailureReport {
                record: record.clone(),
                total_invoked: matched.len(),
                failed_count: errors.len(),
                errors,
            });
        }

        summary
    }

    /// Evaluate every predicate; an erroring predicate only drops its own processor
    fn matching_processors(&self, record: &SourceRecord) -> Vec<&Arc<dyn Processor>> {
        self.processors
            .iter()
            .filter(|processor| match processor.matches(record) {
                Ok(matched) => matched,
                Err(e) => {
                    self.metrics.inc_predicate_error_count();
                    warn!(
                        dispatcher = %self.name,
                        processor = processor.name(),
                        error = %e,
                        "predicate failed, processor skipped for this record"
                    );
                    false
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CollectingErrorSink;
    use async_trait::async_trait;
    use contracts::{ChangeKind, ChangeRecord, ContractError};
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Matches records whose source name is in `sources`
    struct MockProcessor {
        name: String,
        sources: Vec<String>,
        calls: Arc<AtomicU64>,
        should_fail: bool,
        predicate_fails: bool,
    }

    impl MockProcessor {
        fn new(name: &str, sources: &[&str]) -> Self {
            Self {
                name: name.to_string(),
                sources: sources.iter().map(|s| s.to_string()).collect(),
                calls: Arc::new(AtomicU64::new(0)),
                should_fail: false,
                predicate_fails: false,
            }
        }

        fn failing(mut self) -> Self {
            self.should_fail = true;
            self
        }
    }

    #[async_trait]
    impl Processor for MockProcessor {
        fn name(&self) -> &str {
            &self.name
        }

        fn matches(&self, record: &SourceRecord) -> Result<bool, ContractError> {
            if self.predicate_fails {
                return Err(ContractError::predicate(&self.name, "boom"));
            }
            Ok(self.sources.iter().any(|s| s == record.scope()))
        }

        async fn handle(&self, _record: &SourceRecord) -> Result<(), ContractError> {
            tokio::task::yield_now().await;
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.should_fail {
                return Err(ContractError::handler(&self.name, "mock failure"));
            }
            Ok(())
        }
    }

    fn record(source: &str) -> SourceRecord {
        ChangeRecord {
            source_name: source.to_string(),
            kind: ChangeKind::Created,
            prior_state: None,
            current_state: Some(Default::default()),
        }
        .into()
    }

    #[tokio::test]
    async fn test_dispatch_invokes_exactly_matching_subset() {
        let a = MockProcessor::new("a", &["teams"]);
        let b = MockProcessor::new("b", &["teams", "billing"]);
        let c = MockProcessor::new("c", &["billing"]);
        let counters = [a.calls.clone(), b.calls.clone(), c.calls.clone()];

        let mut dispatcher = Dispatcher::new("test");
        for p in [a, b, c] {
            dispatcher.register(Arc::new(p)).unwrap();
        }

        let summary = dispatcher
            .dispatch_records(&[record("teams"), record("uploads")])
            .await;

        assert_eq!(summary.records, 2);
        assert_eq!(summary.invocations, 2);
        let calls: Vec<u64> = counters.iter().map(|c| c.load(Ordering::SeqCst)).collect();
        assert_eq!(calls, vec![1, 1, 0]);
    }

    #[tokio::test]
    async fn test_partial_failure_isolation() {
        let first = MockProcessor::new("first", &["teams"]);
        let second = MockProcessor::new("second", &["teams"]).failing();
        let third = MockProcessor::new("third", &["teams"]);
        let (c1, c3) = (first.calls.clone(), third.calls.clone());

        let sink = Arc::new(CollectingErrorSink::new());
        let mut dispatcher = Dispatcher::new("test").with_error_sink(sink.clone());
        for p in [first, second, third] {
            dispatcher.register(Arc::new(p)).unwrap();
        }

        let summary = dispatcher.dispatch_records(&[record("teams")]).await;

        assert_eq!(c1.load(Ordering::SeqCst), 1);
        assert_eq!(c3.load(Ordering::SeqCst), 1);
        assert_eq!(summary.failed_invocations, 1);

        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].total_invoked, 3);
        assert_eq!(reports[0].failed_count, 1);
        assert_eq!(reports[0].errors[0].processor, "second");
        assert_eq!(reports[0].record, record("teams"));
    }

    #[tokio::test]
    async fn test_predicate_error_skips_only_that_processor() {
        let mut broken = MockProcessor::new("broken", &["teams"]);
        broken.predicate_fails = true;
        let healthy = MockProcessor::new("healthy", &["teams"]);
        let (broken_calls, healthy_calls) = (broken.calls.clone(), healthy.calls.clone());

        let sink = Arc::new(CollectingErrorSink::new());
        let mut dispatcher = Dispatcher::new("test").with_error_sink(sink.clone());
        dispatcher.register(Arc::new(broken)).unwrap();
        dispatcher.register(Arc::new(healthy)).unwrap();

        dispatcher.dispatch_records(&[record("teams")]).await;

        assert_eq!(broken_calls.load(Ordering::SeqCst), 0);
        assert_eq!(healthy_calls.load(Ordering::SeqCst), 1);
        assert!(sink.is_empty());
        assert_eq!(dispatcher.metrics().predicate_errors, 1);
    }

    #[tokio::test]
    async fn test_no_match_is_not_an_error() {
        let sink = Arc::new(CollectingErrorSink::new());
        let mut dispatcher = Dispatcher::new("test").with_error_sink(sink.clone());
        dispatcher
            .register(Arc::new(MockProcessor::new("a", &["teams"])))
            .unwrap();

        let summary = dispatcher.dispatch_records(&[record("billing")]).await;
        assert_eq!(summary.invocations, 0);
        assert!(sink.is_empty());
        assert_eq!(dispatcher.metrics().records, 1);
        assert_eq!(dispatcher.metrics().matched, 0);
    }

    #[tokio::test]
    async fn test_dispatch_batch_normalizes_malformed_events() {
        let mut dispatcher = Dispatcher::new("test");
        // Scope-only predicate: sees the zero-value record's empty source name
        let p = MockProcessor::new("any", &[""]);
        let calls = p.calls.clone();
        dispatcher.register(Arc::new(p)).unwrap();

        let raw = vec![RawEvent::Stream(Default::default())];
        let summary = dispatcher.dispatch_batch(&raw).await;
        assert_eq!(summary.records, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut dispatcher = Dispatcher::new("test");
        dispatcher
            .register(Arc::new(MockProcessor::new("a", &[])))
            .unwrap();
        let err = dispatcher
            .register(Arc::new(MockProcessor::new("a", &[])))
            .unwrap_err();
        assert!(matches!(err, DispatcherError::DuplicateProcessor(name) if name == "a"));
        assert_eq!(dispatcher.processor_names(), vec!["a"]);
    }
}
