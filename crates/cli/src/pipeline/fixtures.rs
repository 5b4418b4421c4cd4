//! Input documents for fixture-driven runs
//!
//! ```json
//! {
//!   "mediator": {
//!     "aggregates": [{"id": "G1", "kind": "team", "attributes": {}}],
//!     "members": {"G1": ["U1", "U2"]}
//!   },
//!   "listeners": [{"owner_id": "U1", "channel": "socket", "token": "conn-1"}]
//! }
//! ```

use std::path::Path;

use contracts::{ChannelKind, OwnerId};
use dispatcher::MediatorFixture;
use ingestion::RawEvent;
use serde::Deserialize;

use crate::error::{CliError, Result};

/// Mediator contents plus the listener registrations to replay
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureFile {
    #[serde(default)]
    pub mediator: MediatorFixture,
    #[serde(default)]
    pub listeners: Vec<ListenerFixture>,
}

/// One `register_channel_endpoint` call
#[derive(Debug, Clone, Deserialize)]
pub struct ListenerFixture {
    pub owner_id: OwnerId,
    pub channel: ChannelKind,
    pub token: String,
}

impl FixtureFile {
    pub fn load(path: &Path) -> Result<Self> {
        read_json("fixtures", path)
    }
}

/// Load a JSON array of raw events
pub fn load_events(path: &Path) -> Result<Vec<RawEvent>> {
    read_json("events", path)
}

fn read_json<T: serde::de::DeserializeOwned>(kind: &'static str, path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(CliError::file_not_found(kind, path));
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| CliError::input_parse(kind, path, e.to_string()))
}
