//! OwnerId - listener owner / recipient identifier

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// User identifier backed by `Arc<str>`
///
/// Recipient sets are copied into every delivery task of a fan-out, so
/// cloning only bumps a reference count.
///
/// ```
/// use contracts::OwnerId;
///
/// let id: OwnerId = "user-42".into();
/// assert_eq!(id.clone().as_str(), "user-42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OwnerId(Arc<str>);

impl OwnerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty ids come from blank attributes and never name a recipient
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for OwnerId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for OwnerId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// serde's Arc<str> impls sit behind the `rc` feature
impl Serialize for OwnerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for OwnerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}
