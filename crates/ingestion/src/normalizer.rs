//! RecordNormalizer: raw source events → `SourceRecord`

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{ChangeRecord, Envelope, ObjectNotification, SourceRecord};
use tracing::{debug, warn};

use crate::adapters::{normalize_pubsub, normalize_storage, normalize_stream};
use crate::raw::RawEvent;

/// Normalizer counters
#[derive(Debug, Default)]
pub struct NormalizerMetrics {
    changes: AtomicU64,
    envelopes: AtomicU64,
    objects: AtomicU64,
    /// Events replaced by a zero-value record
    malformed: AtomicU64,
}

impl NormalizerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, record: &SourceRecord) {
        let counter = match record {
            SourceRecord::Change(_) => &self.changes,
            SourceRecord::Envelope(_) => &self.envelopes,
            SourceRecord::Object(_) => &self.objects,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("chat_fanout_records_normalized_total", "shape" => record.shape())
            .increment(1);
    }

    fn record_malformed(&self, source_kind: &'static str) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("chat_fanout_records_malformed_total", "source" => source_kind)
            .increment(1);
    }

    pub fn snapshot(&self) -> NormalizerSnapshot {
        NormalizerSnapshot {
            changes: self.changes.load(Ordering::Relaxed),
            envelopes: self.envelopes.load(Ordering::Relaxed),
            objects: self.objects.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of `NormalizerMetrics`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizerSnapshot {
    pub changes: u64,
    pub envelopes: u64,
    pub objects: u64,
    pub malformed: u64,
}

impl NormalizerSnapshot {
    pub fn total(&self) -> u64 {
        self.changes + self.envelopes + self.objects
    }
}

/// Converts raw events into canonical records
///
/// Normalization never fails: an event that cannot be decoded becomes the
/// zero value of its shape (empty source name, `Unknown` kind, no states),
/// which no processor predicate matches.
#[derive(Debug, Clone, Default)]
pub struct RecordNormalizer {
    metrics: Arc<NormalizerMetrics>,
}

impl RecordNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> Arc<NormalizerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Normalize one raw event
    pub fn normalize(&self, raw: &RawEvent) -> SourceRecord {
        let source_kind = raw.source_kind();
        let normalized = match raw {
            RawEvent::Stream(r) => normalize_stream(r).map(SourceRecord::from),
            RawEvent::PubSub(m) => normalize_pubsub(m).map(SourceRecord::from),
            RawEvent::Storage(e) => normalize_storage(e).map(SourceRecord::from),
        };

        let record = normalized.unwrap_or_else(|e| {
            warn!(source = source_kind, error = %e, "malformed source event, using zero record");
            self.metrics.record_malformed(source_kind);
            zero_record(raw)
        });

        debug!(shape = record.shape(), scope = record.scope(), "normalized record");
        self.metrics.record(&record);
        record
    }

    /// Normalize a batch, preserving order
    pub fn normalize_batch(&self, raw: &[RawEvent]) -> Vec<SourceRecord> {
        raw.iter().map(|event| self.normalize(event)).collect()
    }

    /// Normalize an untyped JSON event
    ///
    /// JSON that is not a recognizable raw event yields an empty `ChangeRecord`.
    pub fn normalize_value(&self, value: &serde_json::Value) -> SourceRecord {
        match serde_json::from_value::<RawEvent>(value.clone()) {
            Ok(raw) => self.normalize(&raw),
            Err(e) => {
                warn!(error = %e, "unrecognized source event, using zero record");
                self.metrics.record_malformed("unknown");
                let record = SourceRecord::Change(ChangeRecord::default());
                self.metrics.record(&record);
                record
            }
        }
    }
}

fn zero_record(raw: &RawEvent) -> SourceRecord {
    match raw {
        RawEvent::Stream(_) => ChangeRecord::default().into(),
        RawEvent::PubSub(_) => Envelope::default().into(),
        RawEvent::Storage(_) => ObjectNotification::default().into(),
    }
}
