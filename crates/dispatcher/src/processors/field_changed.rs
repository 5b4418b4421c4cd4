//! Field-changed deriver: `Updated` with one watched field differing → single-recipient event

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use contracts::{
    AttributeMap, ChangeKind, ContractError, DomainEvent, EventPublisher, OwnerId, Processor,
    SourceRecord,
};

use crate::predicate::RecordFilter;

#[derive(Debug, Clone)]
pub struct FieldChangedSettings {
    pub name: String,
    pub source_name: String,
    pub entity_type: String,
    pub field: String,
    pub event_type: String,
    /// Attribute holding the owning user's id
    pub owner_attribute: String,
    pub publish_to: String,
}

/// Typed view of one side of the watched entity
///
/// Attribute names come from settings, so the side is projected onto
/// `{owner, value}` before decoding.
#[derive(Debug, Clone, PartialEq, Deserialize)]
struct WatchedEntity {
    owner: Option<OwnerId>,
    value: Option<serde_json::Value>,
}

impl WatchedEntity {
    fn decode(
        state: Option<&AttributeMap>,
        owner_attribute: &str,
        field: &str,
    ) -> Result<Self, serde_json::Error> {
        let state = state.cloned().unwrap_or_default();
        serde_json::from_value(json!({
            "owner": state.get(owner_attribute),
            "value": state.get(field),
        }))
    }
}

/// Emits `event_type` to the owner of the changed entity; no mediator lookup
pub struct FieldChangedProcessor {
    settings: FieldChangedSettings,
    filter: RecordFilter,
    publisher: Arc<dyn EventPublisher>,
}

impl FieldChangedProcessor {
    pub fn new(settings: FieldChangedSettings, publisher: Arc<dyn EventPublisher>) -> Self {
        let filter = RecordFilter::new()
            .source(&settings.source_name)
            .kind(ChangeKind::Updated)
            .entity_type(&settings.entity_type)
            .changed_field(&settings.field);
        Self {
            settings,
            filter,
            publisher,
        }
    }
}

#[async_trait]
impl Processor for FieldChangedProcessor {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn matches(&self, record: &SourceRecord) -> Result<bool, ContractError> {
        Ok(self.filter.matches(record))
    }

    #[instrument(name = "field_changed_handle", skip_all, fields(processor = %self.settings.name))]
    async fn handle(&self, record: &SourceRecord) -> Result<(), ContractError> {
        let change = record
            .as_change()
            .ok_or_else(|| ContractError::handler(self.name(), "expected a change record"))?;

        let field = &self.settings.field;
        let owner_attribute = &self.settings.owner_attribute;
        let decode = |state: Option<&AttributeMap>| {
            WatchedEntity::decode(state, owner_attribute, field).map_err(|e| {
                ContractError::handler(self.name(), format!("malformed '{owner_attribute}': {e}"))
            })
        };
        let current = decode(change.current_state.as_ref())?;
        let previous = decode(change.prior_state.as_ref())?;

        let owner = current
            .owner
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ContractError::handler(
                    self.name(),
                    format!("missing owner attribute '{owner_attribute}'"),
                )
            })?;

        let event = DomainEvent::new(
            self.settings.event_type.clone(),
            json!({
                "entityType": self.settings.entity_type,
                "field": field,
                "previous": previous.value,
                "current": current.value,
                "entity": change.current_state,
            }),
            [owner.clone()],
        );
        debug!(owner = %owner, field = %field, "field changed");

        self.publisher
            .publish(&self.settings.publish_to, event)
            .await
    }
}
