//! Pub/sub adapter: `RawPubSubMessage` → `Envelope`

use contracts::{Envelope, EnvelopePayload};

use crate::error::{IngestionError, Result};
use crate::raw::RawPubSubMessage;

const SOURCE: &str = "pubsub";

/// Normalize one pub/sub message
///
/// The body is parsed as JSON; a body shaped like a `DomainEvent` becomes
/// `EnvelopePayload::Event`, anything else `EnvelopePayload::Raw`.
pub fn normalize_pubsub(raw: &RawPubSubMessage) -> Result<Envelope> {
    let topic = raw
        .topic
        .as_deref()
        .ok_or_else(|| IngestionError::missing(SOURCE, "topic"))?;
    let channel_identifier = channel_identifier(topic)
        .ok_or_else(|| IngestionError::malformed(SOURCE, format!("bad topic '{topic}'")))?;

    let body = raw
        .message
        .as_deref()
        .ok_or_else(|| IngestionError::missing(SOURCE, "message"))?;
    let payload: EnvelopePayload = serde_json::from_str(body)
        .map_err(|e| IngestionError::malformed(SOURCE, format!("message is not JSON: {e}")))?;

    Ok(Envelope {
        channel_identifier: channel_identifier.to_string(),
        payload,
    })
}

/// Last `:` or `/` separated segment of a topic ARN or path
fn channel_identifier(topic: &str) -> Option<&str> {
    topic
        .rsplit([':', '/'])
        .next()
        .filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(topic: &str, body: &str) -> RawPubSubMessage {
        RawPubSubMessage {
            topic: Some(topic.into()),
            message: Some(body.into()),
        }
    }

    #[test]
    fn test_topic_segments() {
        assert_eq!(channel_identifier("arn:aws:sns:eu:1:team-events"), Some("team-events"));
        assert_eq!(channel_identifier("projects/p/topics/team-events"), Some("team-events"));
        assert_eq!(channel_identifier("team-events"), Some("team-events"));
        assert_eq!(channel_identifier("projects/p/topics/"), None);
    }

    #[test]
    fn test_domain_event_body() {
        let body = json!({
            "type": "MemberAdded",
            "payload": {"addedUser": "U3"},
            "recipientIds": ["U1", "U3"]
        })
        .to_string();
        let envelope = normalize_pubsub(&message("arn:aws:sns:eu:1:team-events", &body)).unwrap();
        assert_eq!(envelope.channel_identifier, "team-events");
        let event = envelope.event().unwrap();
        assert_eq!(event.event_type, "MemberAdded");
        assert_eq!(event.recipient_ids.len(), 2);
    }

    #[test]
    fn test_raw_body() {
        let envelope = normalize_pubsub(&message("t", r#"{"hello": "world"}"#)).unwrap();
        assert_eq!(envelope.payload, EnvelopePayload::Raw(json!({"hello": "world"})));
    }

    #[test]
    fn test_rejects_non_json_body() {
        assert!(normalize_pubsub(&message("t", "not json")).is_err());
        assert!(normalize_pubsub(&RawPubSubMessage::default()).is_err());
    }
}
