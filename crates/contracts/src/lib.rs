//! # Contracts
//!
//! Frozen interface contracts shared by every stage of the notification core.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Record Model
//! - Raw source events are normalized into one of three shapes:
//!   `ChangeRecord`, `Envelope`, `ObjectNotification` (wrapped in `SourceRecord`)
//! - Processor units derive `DomainEvent`s from records
//! - Fan-out resolves `ListenerEntry`s and yields one `DeliveryOutcome` per endpoint

mod blueprint;
mod delivery;
mod error;
mod event;
mod listener;
mod owner_id;
mod processor;
mod record;

pub use blueprint::*;
pub use delivery::*;
pub use error::*;
pub use event::*;
pub use listener::*;
pub use owner_id::OwnerId;
pub use processor::{ChannelGateway, EntityMediator, EventPublisher, Processor};
pub use record::*;
