//! Processor units and the config-driven factory

mod field_changed;
mod membership;
mod object_created;
mod topic_fanout;

pub use field_changed::{FieldChangedProcessor, FieldChangedSettings};
pub use membership::{
    Membership, MembershipAddedProcessor, MembershipDeps, MembershipRemovedProcessor,
    MembershipSettings,
};
pub use object_created::{ObjectCreatedProcessor, ObjectCreatedSettings};
pub use topic_fanout::{TopicFanoutProcessor, TopicFanoutSettings};

use std::sync::Arc;

use contracts::{EntityMediator, EventPublisher, Processor, ProcessorConfig, ProcessorSpec};
use fanout::NotificationFanoutService;
use tracing::instrument;

use crate::error::DispatcherError;

/// Collaborators handed to processors at construction
///
/// First-stage derivers need a publisher (membership derivers also a
/// mediator); fan-out units need the fan-out service.
#[derive(Clone, Default)]
pub struct ProcessorContext {
    mediator: Option<Arc<dyn EntityMediator>>,
    publisher: Option<Arc<dyn EventPublisher>>,
    fanout: Option<Arc<NotificationFanoutService>>,
}

impl ProcessorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mediator(mut self, mediator: Arc<dyn EntityMediator>) -> Self {
        self.mediator = Some(mediator);
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_fanout(mut self, fanout: Arc<NotificationFanoutService>) -> Self {
        self.fanout = Some(fanout);
        self
    }

    fn require<T: Clone>(
        dependency: &Option<T>,
        processor: &str,
        what: &str,
    ) -> Result<T, DispatcherError> {
        dependency.clone().ok_or_else(|| {
            DispatcherError::processor_creation(processor, format!("no {what} available"))
        })
    }
}

/// Create a processor from its config entry
#[instrument(
    name = "dispatcher_create_processor",
    skip_all,
    fields(processor = %config.name, kind = config.spec.kind_name())
)]
pub fn create_processor(
    config: &ProcessorConfig,
    ctx: &ProcessorContext,
) -> Result<Arc<dyn Processor>, DispatcherError> {
    let name = config.name.as_str();
    let publisher = || ProcessorContext::require(&ctx.publisher, name, "event publisher");

    let processor: Arc<dyn Processor> = match &config.spec {
        ProcessorSpec::MembershipAdded {
            source_name,
            grouping,
            entity_type,
            publish_to,
        } => Arc::new(MembershipAddedProcessor::new(
            MembershipSettings {
                name: name.to_string(),
                source_name: source_name.clone(),
                grouping: *grouping,
                entity_type: entity_type.clone(),
                publish_to: publish_to.clone(),
            },
            MembershipDeps {
                mediator: ProcessorContext::require(&ctx.mediator, name, "entity mediator")?,
                publisher: publisher()?,
            },
        )),
        ProcessorSpec::MembershipRemoved {
            source_name,
            grouping,
            entity_type,
            publish_to,
            include_removed_user,
        } => Arc::new(MembershipRemovedProcessor::new(
            MembershipSettings {
                name: name.to_string(),
                source_name: source_name.clone(),
                grouping: *grouping,
                entity_type: entity_type.clone(),
                publish_to: publish_to.clone(),
            },
            MembershipDeps {
                mediator: ProcessorContext::require(&ctx.mediator, name, "entity mediator")?,
                publisher: publisher()?,
            },
            *include_removed_user,
        )),
        ProcessorSpec::FieldChanged {
            source_name,
            entity_type,
            field,
            event_type,
            owner_attribute,
            publish_to,
        } => Arc::new(FieldChangedProcessor::new(
            FieldChangedSettings {
                name: name.to_string(),
                source_name: source_name.clone(),
                entity_type: entity_type.clone(),
                field: field.clone(),
                event_type: event_type.clone(),
                owner_attribute: owner_attribute.clone(),
                publish_to: publish_to.clone(),
            },
            publisher()?,
        )),
        ProcessorSpec::ObjectCreated {
            container_name,
            key_prefix,
            event_type,
            publish_to,
        } => Arc::new(ObjectCreatedProcessor::new(
            ObjectCreatedSettings {
                name: name.to_string(),
                container_name: container_name.clone(),
                key_prefix: key_prefix.clone(),
                event_type: event_type.clone(),
                publish_to: publish_to.clone(),
            },
            publisher()?,
        )),
        ProcessorSpec::TopicFanout {
            channel_identifier,
            channels,
            recipients,
        } => Arc::new(TopicFanoutProcessor::new(
            TopicFanoutSettings {
                name: name.to_string(),
                channel_identifier: channel_identifier.clone(),
                channels: channels.clone(),
                recipients: recipients.clone(),
            },
            ProcessorContext::require(&ctx.fanout, name, "fan-out service")?,
        )),
    };

    Ok(processor)
}
