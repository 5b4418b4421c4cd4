//! DomainEvent - Processor unit output, fan-out input

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{AttributeMap, OwnerId};

/// Event type emitted when a member joins a grouping
pub const MEMBER_ADDED: &str = "MemberAdded";

/// Event type emitted when a member leaves a grouping
pub const MEMBER_REMOVED: &str = "MemberRemoved";

/// Typed domain event derived from one record
///
/// `recipient_ids` is computed explicitly by the deriving processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default)]
    pub payload: serde_json::Value,

    pub recipient_ids: BTreeSet<OwnerId>,
}

impl DomainEvent {
    /// Create an event
    pub fn new(
        event_type: impl Into<String>,
        payload: serde_json::Value,
        recipient_ids: impl IntoIterator<Item = OwnerId>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            recipient_ids: recipient_ids.into_iter().collect(),
        }
    }

    /// Message handed to channel gateways
    pub fn message(&self) -> NotificationMessage {
        NotificationMessage {
            event_type: self.event_type.clone(),
            payload: self.payload.clone(),
        }
    }
}

/// What a channel gateway sends to one endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: serde_json::Value,
}

/// Grouping aggregate returned by the entity mediator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub id: String,
    /// Aggregate kind, e.g. "team"
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub attributes: AttributeMap,
}

impl Aggregate {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            attributes: AttributeMap::new(),
        }
    }
}
