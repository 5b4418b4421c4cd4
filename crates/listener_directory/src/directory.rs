//! In-memory dual-indexed listener registry

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use contracts::{ChannelKind, ListenerEntry, OwnerId};
use tracing::debug;

use crate::error::{DirectoryError, Result};

type EntryKey = (OwnerId, ChannelKind, String);

#[derive(Debug, Default)]
struct Indices {
    /// Primary table
    entries: HashMap<EntryKey, ListenerEntry>,
    /// (owner, channel) -> primary keys
    by_owner: HashMap<(OwnerId, ChannelKind), BTreeSet<String>>,
    /// (channel, primary key) -> owners
    by_endpoint: HashMap<(ChannelKind, String), BTreeSet<OwnerId>>,
}

impl Indices {
    fn insert(&mut self, entry: ListenerEntry) {
        self.by_owner
            .entry((entry.owner_id.clone(), entry.channel))
            .or_default()
            .insert(entry.primary_key.clone());
        self.by_endpoint
            .entry((entry.channel, entry.primary_key.clone()))
            .or_default()
            .insert(entry.owner_id.clone());
        let key = (entry.owner_id.clone(), entry.channel, entry.primary_key.clone());
        self.entries.insert(key, entry);
    }

    fn remove(&mut self, key: &EntryKey) -> Option<ListenerEntry> {
        let entry = self.entries.remove(key)?;
        let (owner_id, channel, primary_key) = key;

        let forward = (owner_id.clone(), *channel);
        if let Some(keys) = self.by_owner.get_mut(&forward) {
            keys.remove(primary_key);
            if keys.is_empty() {
                self.by_owner.remove(&forward);
            }
        }

        let reverse = (*channel, primary_key.clone());
        if let Some(owners) = self.by_endpoint.get_mut(&reverse) {
            owners.remove(owner_id);
            if owners.is_empty() {
                self.by_endpoint.remove(&reverse);
            }
        }

        Some(entry)
    }
}

/// Listener registry with forward and reverse lookups
///
/// All operations take `&self` and are safe to call concurrently; writers
/// racing on the same key serialize on the lock, so the last write wins.
#[derive(Debug, Default)]
pub struct ListenerDirectory {
    inner: RwLock<Indices>,
}

impl ListenerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Indices> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Indices> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 注册监听者
    ///
    /// # Errors
    /// 三元组 `(owner, channel, primary_key)` 已存在时返回 `AlreadyExists`，
    /// 不会隐式覆盖。
    pub fn register(
        &self,
        owner_id: &OwnerId,
        channel: ChannelKind,
        primary_key: &str,
        secondary_value: Option<String>,
    ) -> Result<ListenerEntry> {
        let mut indices = self.write();
        let key = (owner_id.clone(), channel, primary_key.to_string());
        if indices.entries.contains_key(&key) {
            return Err(DirectoryError::AlreadyExists {
                owner_id: owner_id.clone(),
                channel,
                primary_key: primary_key.to_string(),
            });
        }

        let entry = ListenerEntry {
            owner_id: owner_id.clone(),
            channel,
            primary_key: primary_key.to_string(),
            secondary_value,
            created_at: Utc::now(),
        };
        indices.insert(entry.clone());
        drop(indices);

        debug!(owner = %owner_id, channel = %channel, "listener registered");
        metrics::counter!("chat_fanout_listener_registrations_total", "channel" => channel.as_str())
            .increment(1);
        Ok(entry)
    }

    /// 转移 endpoint：移除 `(channel, primary_key)` 的全部现有条目并写入新条目
    ///
    /// Removal and insert happen under one write lock, so concurrent transfers
    /// of the same key leave exactly one owner (last write wins). Returns the
    /// new entry and the entries it replaced, including a previous entry of
    /// `owner_id` itself.
    pub fn transfer(
        &self,
        owner_id: &OwnerId,
        channel: ChannelKind,
        primary_key: &str,
        secondary_value: Option<String>,
    ) -> (ListenerEntry, Vec<ListenerEntry>) {
        let entry = ListenerEntry {
            owner_id: owner_id.clone(),
            channel,
            primary_key: primary_key.to_string(),
            secondary_value,
            created_at: Utc::now(),
        };

        let mut indices = self.write();
        let previous_owners: Vec<OwnerId> = indices
            .by_endpoint
            .get(&(channel, primary_key.to_string()))
            .map(|owners| owners.iter().cloned().collect())
            .unwrap_or_default();
        let replaced: Vec<ListenerEntry> = previous_owners
            .into_iter()
            .filter_map(|previous| indices.remove(&(previous, channel, primary_key.to_string())))
            .collect();
        indices.insert(entry.clone());
        drop(indices);

        debug!(
            owner = %owner_id,
            channel = %channel,
            replaced = replaced.len(),
            "listener transferred"
        );
        if !replaced.is_empty() {
            metrics::counter!("chat_fanout_listener_unregistrations_total", "channel" => channel.as_str())
                .increment(replaced.len() as u64);
        }
        metrics::counter!("chat_fanout_listener_registrations_total", "channel" => channel.as_str())
            .increment(1);
        (entry, replaced)
    }

    /// 按 owner + channel 查询，可能为空
    pub fn list_by_owner_and_channel(
        &self,
        owner_id: &OwnerId,
        channel: ChannelKind,
    ) -> Vec<ListenerEntry> {
        let indices = self.read();
        let Some(keys) = indices.by_owner.get(&(owner_id.clone(), channel)) else {
            return Vec::new();
        };
        keys.iter()
            .filter_map(|primary_key| {
                indices
                    .entries
                    .get(&(owner_id.clone(), channel, primary_key.clone()))
                    .cloned()
            })
            .collect()
    }

    /// 反向查询：某个 endpoint 被哪些 owner 注册
    pub fn list_by_channel_and_primary_key(
        &self,
        channel: ChannelKind,
        primary_key: &str,
    ) -> Vec<ListenerEntry> {
        let indices = self.read();
        let Some(owners) = indices.by_endpoint.get(&(channel, primary_key.to_string())) else {
            return Vec::new();
        };
        owners
            .iter()
            .filter_map(|owner_id| {
                indices
                    .entries
                    .get(&(owner_id.clone(), channel, primary_key.to_string()))
                    .cloned()
            })
            .collect()
    }

    /// 注销监听者，不存在时为 no-op
    ///
    /// Returns the removed entry, if any.
    pub fn unregister(
        &self,
        owner_id: &OwnerId,
        channel: ChannelKind,
        primary_key: &str,
    ) -> Option<ListenerEntry> {
        let removed = self
            .write()
            .remove(&(owner_id.clone(), channel, primary_key.to_string()));

        if removed.is_some() {
            debug!(owner = %owner_id, channel = %channel, "listener unregistered");
            metrics::counter!("chat_fanout_listener_unregistrations_total", "channel" => channel.as_str())
                .increment(1);
        }
        removed
    }

    /// Total number of entries
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
