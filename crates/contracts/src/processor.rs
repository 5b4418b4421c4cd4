//! Capability traits at the seams of the dispatch core
//!
//! - `Processor`: predicate + handler pair, registered with a Dispatcher
//! - `EntityMediator`: read-only aggregate lookups
//! - `ChannelGateway`: mint endpoints and send for one channel
//! - `EventPublisher`: republish a derived event on a channel identifier
//!
//! All four are held as trait objects, so they use `async_trait`.

use async_trait::async_trait;

use crate::{
    Aggregate, ChannelKind, ContractError, DomainEvent, NotificationMessage, OwnerId, SourceRecord,
};

/// Processor unit (domain-event deriver)
///
/// Implementations are immutable and stateless. Zero or many processors may
/// match the same record.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Processor name (used for logging/metrics and failure reports)
    fn name(&self) -> &str;

    /// Cheap synchronous predicate
    ///
    /// # Errors
    /// A predicate error aborts evaluation for this processor/record pair only.
    fn matches(&self, record: &SourceRecord) -> Result<bool, ContractError>;

    /// Handle a matched record
    ///
    /// Must be idempotent under redelivery of the same record.
    ///
    /// # Errors
    /// Returning an error is the only way to signal failure; the Dispatcher
    /// isolates it from the other matched processors.
    async fn handle(&self, record: &SourceRecord) -> Result<(), ContractError>;
}

/// Read access to current aggregate state
///
/// May be eventually consistent with the mutation that triggered the record.
#[async_trait]
pub trait EntityMediator: Send + Sync {
    /// Fetch an aggregate
    ///
    /// # Errors
    /// `ContractError::LookupMiss` if the aggregate does not exist
    async fn get(&self, id: &str) -> Result<Aggregate, ContractError>;

    /// Current member ids of a grouping aggregate
    async fn list_member_ids(&self, group_id: &str) -> Result<Vec<OwnerId>, ContractError>;
}

/// Per-channel delivery capability
#[async_trait]
pub trait ChannelGateway: Send + Sync {
    /// Channel this gateway serves
    fn channel(&self) -> ChannelKind;

    /// Mint a provider endpoint handle from a raw token
    async fn mint(&self, raw_token: &str) -> Result<String, ContractError>;

    /// Send a message to an endpoint handle
    async fn send(&self, endpoint: &str, message: &NotificationMessage)
        -> Result<(), ContractError>;
}

/// Republishes derived events so a second-stage Dispatcher can pick them up
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        channel_identifier: &str,
        event: DomainEvent,
    ) -> Result<(), ContractError>;
}
