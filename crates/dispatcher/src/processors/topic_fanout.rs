//! Topic-scoped fan-out (second stage): envelope → channel delivery
//!
//! Pure pass-through: matches by exact channel identifier and hands the
//! embedded event to `NotificationFanoutService`. Delivery failures are
//! reported by the fan-out service, not returned as handler errors.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{instrument, warn};

use contracts::{
    ChannelKind, ContractError, DomainEvent, OwnerId, Processor, RecipientScope, SourceRecord,
};
use fanout::NotificationFanoutService;

#[derive(Debug, Clone)]
pub struct TopicFanoutSettings {
    pub name: String,
    pub channel_identifier: String,
    pub channels: Vec<ChannelKind>,
    pub recipients: RecipientScope,
}

pub struct TopicFanoutProcessor {
    settings: TopicFanoutSettings,
    fanout: Arc<NotificationFanoutService>,
}

impl TopicFanoutProcessor {
    pub fn new(settings: TopicFanoutSettings, fanout: Arc<NotificationFanoutService>) -> Self {
        Self { settings, fanout }
    }

    fn recipients(&self, event: &DomainEvent) -> Result<BTreeSet<OwnerId>, ContractError> {
        match &self.settings.recipients {
            RecipientScope::All => Ok(event.recipient_ids.clone()),
            RecipientScope::PayloadField { field } => match event.payload.get(field) {
                Some(serde_json::Value::String(id)) => Ok(BTreeSet::from([OwnerId::from(id.as_str())])),
                Some(serde_json::Value::Array(ids)) => ids
                    .iter()
                    .map(|id| {
                        id.as_str().map(OwnerId::from).ok_or_else(|| {
                            ContractError::handler(
                                self.name(),
                                format!("payload field '{field}' holds a non-string id"),
                            )
                        })
                    })
                    .collect(),
                _ => Err(ContractError::handler(
                    self.name(),
                    format!("payload field '{field}' is missing"),
                )),
            },
        }
    }
}

#[async_trait]
impl Processor for TopicFanoutProcessor {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn matches(&self, record: &SourceRecord) -> Result<bool, ContractError> {
        Ok(record
            .as_envelope()
            .is_some_and(|envelope| envelope.channel_identifier == self.settings.channel_identifier))
    }

    #[instrument(name = "topic_fanout_handle", skip_all, fields(processor = %self.settings.name))]
    async fn handle(&self, record: &SourceRecord) -> Result<(), ContractError> {
        let event = record
            .as_envelope()
            .and_then(|envelope| envelope.event())
            .ok_or_else(|| ContractError::handler(self.name(), "envelope carries no domain event"))?;

        let recipients = self.recipients(event)?;
        let report = self
            .fanout
            .deliver_to(event, &recipients, &self.settings.channels)
            .await;

        if report.failed() > 0 {
            warn!(
                failed = report.failed(),
                attempted = report.attempted(),
                "some deliveries failed"
            );
        }
        Ok(())
    }
}
