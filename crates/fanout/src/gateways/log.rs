//! LogGateway - logs every send via tracing

use async_trait::async_trait;
use contracts::{ChannelGateway, ChannelKind, ContractError, NotificationMessage};
use tracing::{info, instrument};

/// Gateway that only logs, for local runs and dry runs
pub struct LogGateway {
    channel: ChannelKind,
}

impl LogGateway {
    pub fn new(channel: ChannelKind) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl ChannelGateway for LogGateway {
    fn channel(&self) -> ChannelKind {
        self.channel
    }

    async fn mint(&self, raw_token: &str) -> Result<String, ContractError> {
        if raw_token.is_empty() {
            return Err(ContractError::mint(self.channel, "empty token"));
        }
        Ok(format!("log://{}/{}", self.channel, raw_token))
    }

    #[instrument(name = "log_gateway_send", skip(self, message), fields(channel = %self.channel))]
    async fn send(
        &self,
        endpoint: &str,
        message: &NotificationMessage,
    ) -> Result<(), ContractError> {
        info!(
            endpoint,
            event_type = %message.event_type,
            payload = %message.payload,
            "notification sent"
        );
        Ok(())
    }
}
