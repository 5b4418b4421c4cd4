//! ListenerEntry - one registered delivery endpoint

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ContractError, OwnerId};

/// Notification transport category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Mobile push
    Push,
    /// Realtime socket session
    Socket,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 2] = [ChannelKind::Push, ChannelKind::Socket];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Socket => "socket",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "push" => Ok(Self::Push),
            "socket" => Ok(Self::Socket),
            other => Err(ContractError::Other(format!("unknown channel '{other}'"))),
        }
    }
}

/// Registered endpoint for an `(owner, channel)` pair
///
/// `(owner_id, channel, primary_key)` is unique. Entries are never mutated;
/// replacing one is delete + create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerEntry {
    pub owner_id: OwnerId,
    pub channel: ChannelKind,
    /// Raw endpoint identifier: device token or connection id
    pub primary_key: String,
    /// Provider endpoint handle minted from the raw token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ListenerEntry {
    /// Where to send: the minted handle if any, else the raw key
    pub fn endpoint(&self) -> &str {
        self.secondary_value.as_deref().unwrap_or(&self.primary_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(secondary_value: Option<&str>) -> ListenerEntry {
        ListenerEntry {
            owner_id: "u1".into(),
            channel: ChannelKind::Push,
            primary_key: "token-1".into(),
            secondary_value: secondary_value.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_endpoint_prefers_secondary_value() {
        assert_eq!(entry(Some("arn:endpoint/1")).endpoint(), "arn:endpoint/1");
        assert_eq!(entry(None).endpoint(), "token-1");
    }

    #[test]
    fn test_channel_parse_and_display() {
        assert_eq!("Socket".parse::<ChannelKind>().unwrap(), ChannelKind::Socket);
        assert_eq!(ChannelKind::Push.to_string(), "push");
        assert!("fax".parse::<ChannelKind>().is_err());
    }
}
