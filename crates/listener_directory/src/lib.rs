//! # Listener Directory
//!
//! 监听者注册表：`(owner, channel) -> endpoint`，并维护反向索引
//! `(channel, primary_key) -> owners`。
//!
//! 三张表 (主表 + 正向索引 + 反向索引) 放在同一把锁下，
//! 任何一次成功的写操作之后两个索引引用的条目集合完全一致。

mod directory;
mod error;

pub use directory::ListenerDirectory;
pub use error::{DirectoryError, Result};
