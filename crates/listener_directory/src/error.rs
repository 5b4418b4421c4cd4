//! Directory 错误类型

use contracts::{ChannelKind, OwnerId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// `(owner, channel, primary_key)` 已经注册
    #[error("listener already registered: owner={owner_id}, channel={channel}, key={primary_key}")]
    AlreadyExists {
        owner_id: OwnerId,
        channel: ChannelKind,
        primary_key: String,
    },
}

pub type Result<T> = std::result::Result<T, DirectoryError>;
