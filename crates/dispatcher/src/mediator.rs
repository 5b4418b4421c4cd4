//! StaticEntityMediator - in-memory aggregate store
//!
//! Backs the CLI's fixture-driven runs and the tests. Loaded from a fixture
//! document or mutated directly.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use contracts::{Aggregate, ContractError, EntityMediator, OwnerId};

/// Serializable mediator contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediatorFixture {
    #[serde(default)]
    pub aggregates: Vec<Aggregate>,
    /// group id -> member ids
    #[serde(default)]
    pub members: HashMap<String, Vec<OwnerId>>,
}

#[derive(Debug, Default)]
struct State {
    aggregates: HashMap<String, Aggregate>,
    members: HashMap<String, Vec<OwnerId>>,
}

#[derive(Debug, Default)]
pub struct StaticEntityMediator {
    state: RwLock<State>,
}

impl StaticEntityMediator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: MediatorFixture) -> Self {
        let mediator = Self::new();
        for aggregate in fixture.aggregates {
            mediator.insert_aggregate(aggregate);
        }
        for (group_id, members) in fixture.members {
            mediator.set_members(group_id, members);
        }
        mediator
    }

    pub fn insert_aggregate(&self, aggregate: Aggregate) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.aggregates.insert(aggregate.id.clone(), aggregate);
    }

    /// Replace the member list of a group
    pub fn set_members(&self, group_id: impl Into<String>, members: Vec<OwnerId>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.members.insert(group_id.into(), members);
    }

    pub fn remove_member(&self, group_id: &str, member: &OwnerId) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(members) = state.members.get_mut(group_id) {
            members.retain(|m| m != member);
        }
    }
}

#[async_trait]
impl EntityMediator for StaticEntityMediator {
    async fn get(&self, id: &str) -> Result<Aggregate, ContractError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .aggregates
            .get(id)
            .cloned()
            .ok_or_else(|| ContractError::lookup_miss(id))
    }

    /// Groups known only as aggregates have no members yet
    async fn list_member_ids(&self, group_id: &str) -> Result<Vec<OwnerId>, ContractError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        match state.members.get(group_id) {
            Some(members) => Ok(members.clone()),
            None if state.aggregates.contains_key(group_id) => Ok(Vec::new()),
            None => Err(ContractError::lookup_miss(group_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fixture_lookup() {
        let fixture: MediatorFixture = serde_json::from_value(json!({
            "aggregates": [{"id": "G", "kind": "team"}, {"id": "E", "kind": "team"}],
            "members": {"G": ["U1", "U2"]}
        }))
        .unwrap();
        let mediator = StaticEntityMediator::from_fixture(fixture);

        assert_eq!(mediator.get("G").await.unwrap().kind, "team");
        assert_eq!(mediator.list_member_ids("G").await.unwrap().len(), 2);
        assert!(mediator.list_member_ids("E").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_miss() {
        let mediator = StaticEntityMediator::new();
        assert!(matches!(
            mediator.get("nope").await,
            Err(ContractError::LookupMiss { .. })
        ));
        assert!(mediator.list_member_ids("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_remove_member() {
        let mediator = StaticEntityMediator::new();
        mediator.set_members("G", vec!["U1".into(), "U2".into()]);
        mediator.remove_member("G", &OwnerId::from("U1"));
        assert_eq!(
            mediator.list_member_ids("G").await.unwrap(),
            vec![OwnerId::from("U2")]
        );
    }
}
