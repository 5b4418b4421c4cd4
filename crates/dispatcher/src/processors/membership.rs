//! Membership derivers: relationship-entity Created/Deleted → MemberAdded/MemberRemoved

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use contracts::{
    ChangeKind, ChangeRecord, ContractError, DomainEvent, EntityMediator, EventPublisher,
    GroupingKind, OwnerId, Processor, SourceRecord, StateSide, MEMBER_ADDED, MEMBER_REMOVED,
};

use crate::predicate::RecordFilter;

/// Typed view of a relationship entity
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub group_kind: GroupingKind,
    pub group_id: String,
    pub user_id: OwnerId,
}

/// Settings shared by both membership derivers
#[derive(Debug, Clone)]
pub struct MembershipSettings {
    pub name: String,
    pub source_name: String,
    pub grouping: GroupingKind,
    pub entity_type: String,
    pub publish_to: String,
}

/// Dependencies shared by both membership derivers
#[derive(Clone)]
pub struct MembershipDeps {
    pub mediator: Arc<dyn EntityMediator>,
    pub publisher: Arc<dyn EventPublisher>,
}

/// Predicate for one grouping kind: filter + `groupKind` tag
fn matches_grouping(
    filter: &RecordFilter,
    settings: &MembershipSettings,
    record: &SourceRecord,
) -> Result<bool, ContractError> {
    let Some(change) = record.as_change() else {
        return Ok(false);
    };
    if !filter.matches_change(change) {
        return Ok(false);
    }

    match change.latest_state().and_then(|s| s.get("groupKind")) {
        Some(serde_json::Value::String(kind)) => Ok(kind == settings.grouping.as_str()),
        Some(other) => Err(ContractError::predicate(
            &settings.name,
            format!("groupKind is not a string: {other}"),
        )),
        None => Ok(false),
    }
}

fn decode_membership(
    processor: &str,
    change: &ChangeRecord,
    side: StateSide,
) -> Result<Membership, ContractError> {
    change
        .decode::<Membership>(side)
        .map_err(|e| ContractError::handler(processor, e.to_string()))?
        .ok_or_else(|| ContractError::handler(processor, format!("record has no {side:?} state")))
}

fn as_change<'a>(processor: &str, record: &'a SourceRecord) -> Result<&'a ChangeRecord, ContractError> {
    record
        .as_change()
        .ok_or_else(|| ContractError::handler(processor, "expected a change record"))
}

/// Created membership → `MemberAdded` to the full current membership
pub struct MembershipAddedProcessor {
    settings: MembershipSettings,
    filter: RecordFilter,
    deps: MembershipDeps,
}

impl MembershipAddedProcessor {
    pub fn new(settings: MembershipSettings, deps: MembershipDeps) -> Self {
        let filter = RecordFilter::new()
            .source(&settings.source_name)
            .kind(ChangeKind::Created)
            .entity_type(&settings.entity_type);
        Self {
            settings,
            filter,
            deps,
        }
    }
}

#[async_trait]
impl Processor for MembershipAddedProcessor {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn matches(&self, record: &SourceRecord) -> Result<bool, ContractError> {
        matches_grouping(&self.filter, &self.settings, record)
    }

    #[instrument(name = "membership_added_handle", skip_all, fields(processor = %self.settings.name))]
    async fn handle(&self, record: &SourceRecord) -> Result<(), ContractError> {
        let name = self.name();
        let membership = decode_membership(name, as_change(name, record)?, StateSide::Current)?;

        let group = self.deps.mediator.get(&membership.group_id).await?;
        let members = self.deps.mediator.list_member_ids(&membership.group_id).await?;

        let event = DomainEvent::new(
            MEMBER_ADDED,
            json!({
                "group": group,
                "groupKind": self.settings.grouping.as_str(),
                "addedUser": membership.user_id,
            }),
            members,
        );
        debug!(
            group = %membership.group_id,
            user = %membership.user_id,
            recipients = event.recipient_ids.len(),
            "member added"
        );

        self.deps
            .publisher
            .publish(&self.settings.publish_to, event)
            .await
    }
}

/// Deleted membership → `MemberRemoved` to the post-removal membership
pub struct MembershipRemovedProcessor {
    settings: MembershipSettings,
    filter: RecordFilter,
    deps: MembershipDeps,
    include_removed_user: bool,
}

impl MembershipRemovedProcessor {
    pub fn new(settings: MembershipSettings, deps: MembershipDeps, include_removed_user: bool) -> Self {
        let filter = RecordFilter::new()
            .source(&settings.source_name)
            .kind(ChangeKind::Deleted)
            .entity_type(&settings.entity_type);
        Self {
            settings,
            filter,
            deps,
            include_removed_user,
        }
    }
}

#[async_trait]
impl Processor for MembershipRemovedProcessor {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn matches(&self, record: &SourceRecord) -> Result<bool, ContractError> {
        matches_grouping(&self.filter, &self.settings, record)
    }

    #[instrument(name = "membership_removed_handle", skip_all, fields(processor = %self.settings.name))]
    async fn handle(&self, record: &SourceRecord) -> Result<(), ContractError> {
        let name = self.name();
        let membership = decode_membership(name, as_change(name, record)?, StateSide::Prior)?;

        let group = self.deps.mediator.get(&membership.group_id).await?;
        let mut recipients: BTreeSet<OwnerId> = self
            .deps
            .mediator
            .list_member_ids(&membership.group_id)
            .await?
            .into_iter()
            .collect();

        // The mediator may still list the removed user
        if self.include_removed_user {
            recipients.insert(membership.user_id.clone());
        } else {
            recipients.remove(&membership.user_id);
        }

        let event = DomainEvent::new(
            MEMBER_REMOVED,
            json!({
                "group": group,
                "groupKind": self.settings.grouping.as_str(),
                "removedUser": membership.user_id,
            }),
            recipients,
        );

        self.deps
            .publisher
            .publish(&self.settings.publish_to, event)
            .await
    }
}
