//! Pipeline statistics and metrics.

use std::time::Duration;

use dispatcher::{BatchFailureReport, BatchSummary, DispatchSnapshot};
use ingestion::NormalizerSnapshot;
use observability::PipelineMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Raw events read from the events file
    pub records_in: u64,

    /// Domain events republished by first-stage processors
    pub events_published: u64,

    /// Directory size after fixture registration
    pub listeners: usize,

    /// Source stage totals
    pub source: BatchSummary,

    /// Relay stage totals
    pub relay: BatchSummary,

    pub source_metrics: DispatchSnapshot,
    pub relay_metrics: DispatchSnapshot,

    /// Normalization outcome per record shape
    pub normalizer: NormalizerSnapshot,

    /// Every failure report emitted by either stage
    pub failure_reports: Vec<BatchFailureReport>,

    /// Batch/event aggregator
    pub metrics: PipelineMetricsAggregator,

    /// Total duration of the pipeline run
    pub duration: Duration,
}

impl PipelineStats {
    /// Raw events processed per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.records_in as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Failed handler invocations across both stages, as a percentage
    pub fn failure_rate(&self) -> f64 {
        let invocations = self.source.invocations + self.relay.invocations;
        let failed = self.source.failed_invocations + self.relay.failed_invocations;
        if invocations > 0 {
            (failed as f64 / invocations as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Render the summary as text
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        out.push_str("\n╔══════════════════════════════════════════════════════════════╗\n");
        out.push_str("║                    Pipeline Statistics                       ║\n");
        out.push_str("╚══════════════════════════════════════════════════════════════╝\n\n");

        out.push_str("📊 Overview\n");
        out.push_str(&format!("   ├─ Duration: {:.2}s\n", self.duration.as_secs_f64()));
        out.push_str(&format!("   ├─ Raw events: {}\n", self.records_in));
        out.push_str(&format!("   ├─ Throughput: {:.2} events/s\n", self.throughput()));
        out.push_str(&format!("   ├─ Domain events published: {}\n", self.events_published));
        out.push_str(&format!("   └─ Registered listeners: {}\n", self.listeners));

        out.push_str("\n📥 Normalization\n");
        out.push_str(&format!("   ├─ Change records: {}\n", self.normalizer.changes));
        out.push_str(&format!("   ├─ Envelopes: {}\n", self.normalizer.envelopes));
        out.push_str(&format!("   ├─ Object notifications: {}\n", self.normalizer.objects));
        out.push_str(&format!("   └─ Malformed: {}\n", self.normalizer.malformed));

        for (title, summary, snapshot) in [
            ("⚙️  Source Stage", &self.source, &self.source_metrics),
            ("📤 Relay Stage", &self.relay, &self.relay_metrics),
        ] {
            out.push_str(&format!("\n{}\n", title));
            out.push_str(&format!("   ├─ Records: {}\n", summary.records));
            out.push_str(&format!("   ├─ Records matched: {}\n", snapshot.matched));
            out.push_str(&format!("   ├─ Handler invocations: {}\n", summary.invocations));
            out.push_str(&format!("   ├─ Failed invocations: {}\n", summary.failed_invocations));
            out.push_str(&format!("   └─ Predicate errors: {}\n", snapshot.predicate_errors));
        }

        out.push_str(&format!(
            "\n   Handler failure rate: {:.2}%\n",
            self.failure_rate()
        ));

        if !self.failure_reports.is_empty() {
            out.push_str(&format!(
                "\n⚠️  Failure Reports ({})\n",
                self.failure_reports.len()
            ));
            for report in &self.failure_reports {
                for failure in &report.errors {
                    out.push_str(&format!(
                        "   ├─ [{}] {}: {}\n",
                        report.record.shape(),
                        failure.processor,
                        failure.message
                    ));
                }
            }
        }

        let events_by_type = self.metrics.summary().events_by_type;
        if !events_by_type.is_empty() {
            out.push_str("\n📨 Derived Events\n");
            for (event_type, count) in &events_by_type {
                out.push_str(&format!("   ├─ {}: {}\n", event_type, count));
            }
        }

        out
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("{}", self.render_summary());
    }
}
