//! Raw source events as delivered by the trigger layer
//!
//! Every field is optional: presence is checked by the source adapters so a
//! missing field degrades into a zero-value record instead of a parse failure
//! of the whole batch.

use serde::{Deserialize, Serialize};

/// One raw event from any supported source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RawEvent {
    /// Entity change stream (table stream)
    Stream(RawStreamRecord),
    /// Publish-subscribe message
    #[serde(rename = "pubsub")]
    PubSub(RawPubSubMessage),
    /// Object-storage notification
    Storage(RawStorageEvent),
}

impl RawEvent {
    pub fn source_kind(&self) -> &'static str {
        match self {
            Self::Stream(_) => "stream",
            Self::PubSub(_) => "pubsub",
            Self::Storage(_) => "storage",
        }
    }
}

/// Image encoding used by a change stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    /// Typed attribute values: `{"S": "x"}`, `{"N": "1"}`, ...
    #[default]
    Typed,
    /// Plain JSON objects
    Plain,
}

/// Change-stream record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStreamRecord {
    /// Table name; takes precedence over the ARN
    #[serde(default)]
    pub table_name: Option<String>,

    /// Stream ARN, `.../table/<name>/stream/<label>`
    #[serde(default)]
    pub event_source_arn: Option<String>,

    /// `INSERT` | `MODIFY` | `REMOVE`
    #[serde(default)]
    pub event_name: Option<String>,

    #[serde(default)]
    pub old_image: Option<serde_json::Value>,

    #[serde(default)]
    pub new_image: Option<serde_json::Value>,

    #[serde(default)]
    pub image_format: ImageFormat,
}

/// Pub/sub message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPubSubMessage {
    /// Topic ARN or path; the last `:` or `/` segment is the channel identifier
    #[serde(default)]
    pub topic: Option<String>,

    /// JSON message body
    #[serde(default)]
    pub message: Option<String>,
}

/// Object-storage event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStorageEvent {
    #[serde(default)]
    pub bucket: Option<String>,

    /// URL-encoded object key (`+` encodes a space)
    #[serde(default)]
    pub key: Option<String>,
}
