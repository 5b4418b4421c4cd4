//! NotificationFanoutService - endpoint registration and multi-channel delivery

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use contracts::{
    ChannelGateway, ChannelKind, DeliveryOutcome, DeliveryStatus, DomainEvent, FanoutConfig,
    ListenerEntry, NotificationMessage, OwnerId,
};
use futures::stream::{self, StreamExt};
use listener_directory::ListenerDirectory;
use tracing::{debug, info, instrument, warn};

use crate::error::{FanoutError, Result};
use crate::gateways::create_gateway;
use crate::report::DeliveryReport;

/// One pending send
struct Target {
    recipient_id: OwnerId,
    channel: ChannelKind,
    endpoint: String,
    gateway: Arc<dyn ChannelGateway>,
}

/// Multi-channel notification fan-out
///
/// Owns the channel gateways and shares the listener directory. Delivery never
/// fails as a whole: every `(recipient, channel, endpoint)` gets an outcome.
pub struct NotificationFanoutService {
    directory: Arc<ListenerDirectory>,
    gateways: HashMap<ChannelKind, Arc<dyn ChannelGateway>>,
    max_concurrency: usize,
}

impl NotificationFanoutService {
    pub fn new(directory: Arc<ListenerDirectory>, max_concurrency: usize) -> Self {
        Self {
            directory,
            gateways: HashMap::new(),
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Build from config, creating one gateway per entry
    pub fn from_config(config: &FanoutConfig, directory: Arc<ListenerDirectory>) -> Result<Self> {
        let mut service = Self::new(directory, config.max_concurrency);
        for gateway_config in &config.gateways {
            service = service.with_gateway(create_gateway(gateway_config)?);
        }
        Ok(service)
    }

    /// Add (or replace) the gateway for its channel
    pub fn with_gateway(mut self, gateway: Arc<dyn ChannelGateway>) -> Self {
        self.gateways.insert(gateway.channel(), gateway);
        self
    }

    pub fn directory(&self) -> &Arc<ListenerDirectory> {
        &self.directory
    }

    /// Channels with a gateway, in a stable order
    pub fn served_channels(&self) -> Vec<ChannelKind> {
        let mut channels: Vec<_> = self.gateways.keys().copied().collect();
        channels.sort();
        channels
    }

    fn gateway(&self, channel: ChannelKind) -> Result<&Arc<dyn ChannelGateway>> {
        self.gateways
            .get(&channel)
            .ok_or(FanoutError::UnknownChannel(channel))
    }

    /// 注册 endpoint
    ///
    /// The raw token moves to `owner_id`: a fresh endpoint handle is minted,
    /// then every existing owner of the token on this channel (including
    /// `owner_id` itself) is replaced in one directory call.
    #[instrument(name = "fanout_register", skip_all, fields(owner = %owner_id, channel = %channel))]
    pub async fn register_channel_endpoint(
        &self,
        owner_id: &OwnerId,
        channel: ChannelKind,
        raw_token: &str,
    ) -> Result<ListenerEntry> {
        let gateway = self.gateway(channel)?;
        let handle = gateway.mint(raw_token).await?;

        let (entry, replaced) = self
            .directory
            .transfer(owner_id, channel, raw_token, Some(handle));
        for previous in replaced.iter().filter(|p| p.owner_id != *owner_id) {
            info!(previous_owner = %previous.owner_id, "endpoint changes owner");
        }

        debug!(endpoint = entry.endpoint(), "endpoint registered");
        Ok(entry)
    }

    /// 注销 endpoint，不存在时为 no-op
    pub fn unregister(
        &self,
        owner_id: &OwnerId,
        channel: ChannelKind,
        primary_key: &str,
    ) -> Option<ListenerEntry> {
        self.directory.unregister(owner_id, channel, primary_key)
    }

    /// Drop every registration of an endpoint when only its key is known
    /// (e.g. a socket session closed)
    pub fn release_endpoint(&self, channel: ChannelKind, primary_key: &str) -> Vec<ListenerEntry> {
        self.directory
            .list_by_channel_and_primary_key(channel, primary_key)
            .into_iter()
            .filter_map(|entry| {
                self.directory
                    .unregister(&entry.owner_id, channel, primary_key)
            })
            .collect()
    }

    /// Deliver an event to its recipients on every served channel
    pub async fn deliver(&self, event: &DomainEvent) -> DeliveryReport {
        let channels = self.served_channels();
        self.deliver_to(event, &event.recipient_ids, &channels).await
    }

    /// Deliver an event to an explicit recipient set on the given channels
    ///
    /// Channels without a gateway are skipped with a warning. Sends run with
    /// at most `max_concurrency` in flight; one failure never blocks others.
    #[instrument(
        name = "fanout_deliver",
        skip(self, event, recipients),
        fields(event_type = %event.event_type, recipients = recipients.len())
    )]
    pub async fn deliver_to(
        &self,
        event: &DomainEvent,
        recipients: &BTreeSet<OwnerId>,
        channels: &[ChannelKind],
    ) -> DeliveryReport {
        let start = Instant::now();
        let targets = self.resolve_targets(recipients, channels);
        if targets.is_empty() {
            debug!("no registered endpoints for recipients");
            return DeliveryReport::default();
        }

        let message = event.message();
        let outcomes: Vec<DeliveryOutcome> = stream::iter(targets)
            .map(|target| send_one(target, &message))
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let report = DeliveryReport { outcomes };
        metrics::histogram!("chat_fanout_deliver_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        info!(
            attempted = report.attempted(),
            failed = report.failed(),
            "fan-out complete"
        );
        report
    }

    fn resolve_targets(
        &self,
        recipients: &BTreeSet<OwnerId>,
        channels: &[ChannelKind],
    ) -> Vec<Target> {
        let mut targets = Vec::new();
        for &channel in channels {
            let Some(gateway) = self.gateways.get(&channel) else {
                warn!(channel = %channel, "no gateway for channel, skipping");
                continue;
            };
            for recipient_id in recipients {
                for entry in self.directory.list_by_owner_and_channel(recipient_id, channel) {
                    targets.push(Target {
                        recipient_id: recipient_id.clone(),
                        channel,
                        endpoint: entry.endpoint().to_string(),
                        gateway: Arc::clone(gateway),
                    });
                }
            }
        }
        targets
    }
}

async fn send_one(target: Target, message: &NotificationMessage) -> DeliveryOutcome {
    let status = match target.gateway.send(&target.endpoint, message).await {
        Ok(()) => DeliveryStatus::Success,
        Err(e) => {
            warn!(
                recipient = %target.recipient_id,
                channel = %target.channel,
                endpoint = %target.endpoint,
                error = %e,
                "delivery failed"
            );
            DeliveryStatus::Failure(e.to_string())
        }
    };

    let label = if matches!(status, DeliveryStatus::Success) {
        "success"
    } else {
        "failure"
    };
    metrics::counter!(
        "chat_fanout_deliveries_total",
        "channel" => target.channel.as_str(),
        "status" => label
    )
    .increment(1);

    DeliveryOutcome {
        recipient_id: target.recipient_id,
        channel: target.channel,
        endpoint: target.endpoint,
        status,
    }
}
