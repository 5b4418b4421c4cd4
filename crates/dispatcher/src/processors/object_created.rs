//! Object-created deriver: storage notification → event to the key's owner
//!
//! Keys are laid out as `[prefix]<owner id>/<rest>`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument};

use contracts::{ContractError, DomainEvent, EventPublisher, OwnerId, Processor, SourceRecord};

#[derive(Debug, Clone)]
pub struct ObjectCreatedSettings {
    pub name: String,
    pub container_name: String,
    pub key_prefix: Option<String>,
    pub event_type: String,
    pub publish_to: String,
}

pub struct ObjectCreatedProcessor {
    settings: ObjectCreatedSettings,
    publisher: Arc<dyn EventPublisher>,
}

impl ObjectCreatedProcessor {
    pub fn new(settings: ObjectCreatedSettings, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            settings,
            publisher,
        }
    }

    fn relative_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        match self.settings.key_prefix.as_deref() {
            Some(prefix) => key.strip_prefix(prefix),
            None => Some(key),
        }
    }
}

#[async_trait]
impl Processor for ObjectCreatedProcessor {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn matches(&self, record: &SourceRecord) -> Result<bool, ContractError> {
        Ok(record.as_object().is_some_and(|object| {
            object.container_name == self.settings.container_name
                && self.relative_key(&object.object_key).is_some()
        }))
    }

    #[instrument(name = "object_created_handle", skip_all, fields(processor = %self.settings.name))]
    async fn handle(&self, record: &SourceRecord) -> Result<(), ContractError> {
        let object = record
            .as_object()
            .ok_or_else(|| ContractError::handler(self.name(), "expected an object notification"))?;

        let owner = self
            .relative_key(&object.object_key)
            .and_then(|rest| rest.split('/').next())
            .filter(|segment| !segment.is_empty())
            .map(OwnerId::from)
            .ok_or_else(|| {
                ContractError::handler(
                    self.name(),
                    format!("no owner segment in key '{}'", object.object_key),
                )
            })?;

        let event = DomainEvent::new(
            self.settings.event_type.clone(),
            json!({
                "container": object.container_name,
                "key": object.object_key,
            }),
            [owner.clone()],
        );
        debug!(owner = %owner, key = %object.object_key, "object created");

        self.publisher
            .publish(&self.settings.publish_to, event)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ObjectNotification;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingPublisher {
        events: Mutex<Vec<DomainEvent>>,
    }

    #[async_trait]
    impl EventPublisher for CapturingPublisher {
        async fn publish(&self, _: &str, event: DomainEvent) -> Result<(), ContractError> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn processor(prefix: Option<&str>, publisher: Arc<CapturingPublisher>) -> ObjectCreatedProcessor {
        ObjectCreatedProcessor::new(
            ObjectCreatedSettings {
                name: "avatar-uploaded".into(),
                container_name: "uploads".into(),
                key_prefix: prefix.map(str::to_string),
                event_type: "AvatarUploaded".into(),
                publish_to: "account-events".into(),
            },
            publisher,
        )
    }

    fn object(container: &str, key: &str) -> SourceRecord {
        ObjectNotification {
            container_name: container.into(),
            object_key: key.into(),
        }
        .into()
    }

    #[tokio::test]
    async fn test_notifies_key_owner() {
        let publisher = Arc::new(CapturingPublisher::default());
        let p = processor(Some("avatars/"), publisher.clone());
        let record = object("uploads", "avatars/U7/me.png");

        assert!(p.matches(&record).unwrap());
        p.handle(&record).await.unwrap();

        let events = publisher.events.lock().unwrap();
        assert!(events[0].recipient_ids.contains(&OwnerId::from("U7")));
        assert_eq!(events[0].payload["key"], json!("avatars/U7/me.png"));
    }

    #[test]
    fn test_container_and_prefix_must_match() {
        let p = processor(Some("avatars/"), Arc::new(CapturingPublisher::default()));
        assert!(!p.matches(&object("other", "avatars/U7/me.png")).unwrap());
        assert!(!p.matches(&object("uploads", "docs/U7/cv.pdf")).unwrap());
    }

    #[tokio::test]
    async fn test_empty_owner_segment() {
        let p = processor(None, Arc::new(CapturingPublisher::default()));
        assert!(p.handle(&object("uploads", "/orphan.png")).await.is_err());
    }
}
