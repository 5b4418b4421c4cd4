//! Channel gateway implementations and factory

mod log;
mod webhook;

pub use log::LogGateway;
pub use webhook::{WebhookGateway, WebhookGatewayConfig};

use std::sync::Arc;

use contracts::{ChannelGateway, GatewayConfig, GatewayType};
use tracing::info;

use crate::error::{FanoutError, Result};

/// Build a gateway from its config entry
pub fn create_gateway(config: &GatewayConfig) -> Result<Arc<dyn ChannelGateway>> {
    let gateway: Arc<dyn ChannelGateway> = match config.gateway_type {
        GatewayType::Log => Arc::new(LogGateway::new(config.channel)),
        GatewayType::Webhook => {
            let gateway = WebhookGateway::from_params(config.channel, &config.params).map_err(
                |message| FanoutError::GatewayConfig {
                    channel: config.channel,
                    gateway_type: "webhook",
                    message,
                },
            )?;
            Arc::new(gateway)
        }
    };

    info!(channel = %config.channel, gateway_type = ?config.gateway_type, "gateway created");
    Ok(gateway)
}
