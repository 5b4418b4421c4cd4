//! Canonical record shapes - RecordNormalizer output, Dispatcher input
//!
//! Every raw source event becomes exactly one `SourceRecord`. Malformed input
//! becomes the shape's `Default` value, which no processor matches.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{ContractError, DomainEvent};

/// Entity attributes as plain JSON (already unmarshalled from the source format)
pub type AttributeMap = serde_json::Map<String, serde_json::Value>;

/// Attribute that carries the entity-type tag in single-table designs
pub const ENTITY_TYPE_ATTRIBUTE: &str = "entityType";

/// Entity mutation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
    #[default]
    Unknown,
}

/// Which side of a change to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateSide {
    Prior,
    Current,
}

/// Entity mutation record
///
/// Invariant (upheld by the normalizer):
/// - `Created` carries only `current_state`
/// - `Updated` carries both states
/// - `Deleted` carries only `prior_state`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Table / stream the record came from
    pub source_name: String,

    pub kind: ChangeKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_state: Option<AttributeMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_state: Option<AttributeMap>,
}

impl ChangeRecord {
    /// Create a `Created` record
    pub fn created(source_name: impl Into<String>, current: AttributeMap) -> Self {
        Self {
            source_name: source_name.into(),
            kind: ChangeKind::Created,
            prior_state: None,
            current_state: Some(current),
        }
    }

    /// Create an `Updated` record
    pub fn updated(
        source_name: impl Into<String>,
        prior: AttributeMap,
        current: AttributeMap,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            kind: ChangeKind::Updated,
            prior_state: Some(prior),
            current_state: Some(current),
        }
    }

    /// Create a `Deleted` record
    pub fn deleted(source_name: impl Into<String>, prior: AttributeMap) -> Self {
        Self {
            source_name: source_name.into(),
            kind: ChangeKind::Deleted,
            prior_state: Some(prior),
            current_state: None,
        }
    }

    /// Check the kind/state invariant
    pub fn is_well_formed(&self) -> bool {
        match self.kind {
            ChangeKind::Created => self.prior_state.is_none() && self.current_state.is_some(),
            ChangeKind::Updated => self.prior_state.is_some() && self.current_state.is_some(),
            ChangeKind::Deleted => self.prior_state.is_some() && self.current_state.is_none(),
            ChangeKind::Unknown => false,
        }
    }

    /// Get one side of the change
    pub fn state(&self, side: StateSide) -> Option<&AttributeMap> {
        match side {
            StateSide::Prior => self.prior_state.as_ref(),
            StateSide::Current => self.current_state.as_ref(),
        }
    }

    /// The state that describes the entity: current if present, else prior
    pub fn latest_state(&self) -> Option<&AttributeMap> {
        self.current_state.as_ref().or(self.prior_state.as_ref())
    }

    /// Read one attribute from one side
    pub fn attribute(&self, side: StateSide, name: &str) -> Option<&serde_json::Value> {
        self.state(side).and_then(|state| state.get(name))
    }

    /// Entity-type tag of the latest state
    pub fn entity_type(&self) -> Option<&str> {
        self.latest_state()
            .and_then(|state| state.get(ENTITY_TYPE_ATTRIBUTE))
            .and_then(serde_json::Value::as_str)
    }

    /// Decode one side into a typed entity view
    ///
    /// Returns `Ok(None)` when that side is absent.
    pub fn decode<T: DeserializeOwned>(&self, side: StateSide) -> Result<Option<T>, ContractError> {
        self.state(side)
            .map(|state| {
                serde_json::from_value(serde_json::Value::Object(state.clone())).map_err(|e| {
                    ContractError::decode(format!(
                        "{:?} state of '{}' record: {e}",
                        side, self.source_name
                    ))
                })
            })
            .transpose()
    }
}

/// Pub/sub envelope payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopePayload {
    /// A domain event republished by a first-stage processor
    Event(DomainEvent),
    /// Any other JSON body
    Raw(serde_json::Value),
}

impl Default for EnvelopePayload {
    fn default() -> Self {
        Self::Raw(serde_json::Value::Null)
    }
}

/// Pub/sub message already scoped to one logical topic
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub channel_identifier: String,
    #[serde(default)]
    pub payload: EnvelopePayload,
}

impl Envelope {
    /// Wrap a domain event for a channel identifier
    pub fn for_event(channel_identifier: impl Into<String>, event: DomainEvent) -> Self {
        Self {
            channel_identifier: channel_identifier.into(),
            payload: EnvelopePayload::Event(event),
        }
    }

    /// Embedded domain event, if the payload is one
    pub fn event(&self) -> Option<&DomainEvent> {
        match &self.payload {
            EnvelopePayload::Event(event) => Some(event),
            EnvelopePayload::Raw(_) => None,
        }
    }
}

/// Object-storage event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectNotification {
    pub container_name: String,
    /// Decoded object key
    pub object_key: String,
}

/// One normalized record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum SourceRecord {
    Change(ChangeRecord),
    Envelope(Envelope),
    Object(ObjectNotification),
}

impl SourceRecord {
    /// Source-scope value: source name, channel identifier or container name
    pub fn scope(&self) -> &str {
        match self {
            Self::Change(record) => &record.source_name,
            Self::Envelope(envelope) => &envelope.channel_identifier,
            Self::Object(notification) => &notification.container_name,
        }
    }

    /// Shape label for logs and metrics
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Change(_) => "change",
            Self::Envelope(_) => "envelope",
            Self::Object(_) => "object",
        }
    }

    pub fn as_change(&self) -> Option<&ChangeRecord> {
        match self {
            Self::Change(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_envelope(&self) -> Option<&Envelope> {
        match self {
            Self::Envelope(envelope) => Some(envelope),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNotification> {
        match self {
            Self::Object(notification) => Some(notification),
            _ => None,
        }
    }
}

impl From<ChangeRecord> for SourceRecord {
    fn from(record: ChangeRecord) -> Self {
        Self::Change(record)
    }
}

impl From<Envelope> for SourceRecord {
    fn from(envelope: Envelope) -> Self {
        Self::Envelope(envelope)
    }
}

impl From<ObjectNotification> for SourceRecord {
    fn from(notification: ObjectNotification) -> Self {
        Self::Object(notification)
    }
}
