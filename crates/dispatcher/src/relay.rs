//! In-process republish bridge between the two dispatch stages
//!
//! First-stage processors publish derived events through `ChannelPublisher`;
//! `EnvelopeRelay` consumes them and feeds the second-stage dispatcher as
//! `SourceRecord::Envelope`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{ContractError, DomainEvent, Envelope, EventPublisher, SourceRecord};

use crate::dispatcher::{BatchSummary, Dispatcher};

/// Create a publisher and the receiving end for an `EnvelopeRelay`
pub fn relay_channel(capacity: usize) -> (ChannelPublisher, mpsc::Receiver<Envelope>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        ChannelPublisher {
            tx,
            published: AtomicU64::new(0),
        },
        rx,
    )
}

/// `EventPublisher` backed by a bounded mpsc channel
///
/// `publish` waits for queue space, so a slow second stage backpressures
/// first-stage handlers.
pub struct ChannelPublisher {
    tx: mpsc::Sender<Envelope>,
    published: AtomicU64,
}

impl ChannelPublisher {
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventPublisher for ChannelPublisher {
    async fn publish(
        &self,
        channel_identifier: &str,
        event: DomainEvent,
    ) -> Result<(), ContractError> {
        self.tx
            .send(Envelope::for_event(channel_identifier, event))
            .await
            .map_err(|_| ContractError::publish(channel_identifier, "relay closed"))?;

        self.published.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("chat_fanout_events_published_total", "channel_identifier" => channel_identifier.to_string())
            .increment(1);
        debug!(channel_identifier, "event republished");
        Ok(())
    }
}

/// Second-stage consumer loop
pub struct EnvelopeRelay {
    dispatcher: Arc<Dispatcher>,
    rx: mpsc::Receiver<Envelope>,
}

impl EnvelopeRelay {
    pub fn new(dispatcher: Arc<Dispatcher>, rx: mpsc::Receiver<Envelope>) -> Self {
        Self { dispatcher, rx }
    }

    /// Run until every publisher is dropped
    #[instrument(name = "envelope_relay_run", skip(self), fields(dispatcher = %self.dispatcher.name()))]
    pub async fn run(mut self) -> BatchSummary {
        info!("EnvelopeRelay started");
        let mut summary = BatchSummary::default();

        while let Some(envelope) = self.rx.recv().await {
            let record = SourceRecord::Envelope(envelope);
            summary.merge(self.dispatcher.dispatch_record(&record).await);
        }

        info!(envelopes = summary.records, "EnvelopeRelay input closed");
        summary
    }

    /// Spawn the relay as a background task
    pub fn spawn(self) -> JoinHandle<BatchSummary> {
        tokio::spawn(self.run())
    }
}
