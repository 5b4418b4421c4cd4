//! DeliveryOutcome - one result per `(recipient, channel, endpoint)`

use serde::{Deserialize, Serialize};

use crate::{ChannelKind, OwnerId};

/// Result of one send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Success,
    Failure(String),
}

/// Per-endpoint delivery outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub recipient_id: OwnerId,
    pub channel: ChannelKind,
    pub endpoint: String,
    pub status: DeliveryStatus,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, DeliveryStatus::Success)
    }
}
