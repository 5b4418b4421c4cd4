//! ServiceBlueprint - Config Loader 输出
//!
//! 描述完整的服务配置：服务信息、通道网关、fan-out 并发、处理单元注册表。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::ChannelKind;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的服务配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServiceBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 服务设置
    #[validate(nested)]
    pub service: ServiceConfig,

    /// 通知 fan-out 设置
    #[serde(default)]
    #[validate(nested)]
    pub fanout: FanoutConfig,

    /// 处理单元注册表 (两个阶段共用)
    #[serde(default)]
    #[validate(nested)]
    pub processors: Vec<ProcessorConfig>,
}

impl ServiceBlueprint {
    /// Gateway configured for a channel
    pub fn gateway_for(&self, channel: ChannelKind) -> Option<&GatewayConfig> {
        self.fanout.gateways.iter().find(|g| g.channel == channel)
    }

    /// Processors that consume normalized source records (first stage)
    pub fn source_processors(&self) -> impl Iterator<Item = &ProcessorConfig> {
        self.processors.iter().filter(|p| !p.spec.is_second_stage())
    }

    /// Processors keyed on a channel identifier (second stage)
    pub fn relay_processors(&self) -> impl Iterator<Item = &ProcessorConfig> {
        self.processors.iter().filter(|p| p.spec.is_second_stage())
    }
}

/// 服务设置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServiceConfig {
    /// 服务名称
    #[validate(length(min = 1))]
    pub name: String,

    /// 两个阶段之间的转发队列容量
    #[serde(default = "default_relay_capacity")]
    #[validate(range(min = 1))]
    pub relay_capacity: usize,
}

fn default_relay_capacity() -> usize {
    256
}

/// Fan-out 设置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FanoutConfig {
    /// 单次 deliver 的最大并发发送数
    #[serde(default = "default_max_concurrency")]
    #[validate(range(min = 1))]
    pub max_concurrency: usize,

    /// 每个通道一个网关
    #[serde(default)]
    pub gateways: Vec<GatewayConfig>,
}

fn default_max_concurrency() -> usize {
    16
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            gateways: Vec::new(),
        }
    }
}

/// 通道网关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub channel: ChannelKind,
    pub gateway_type: GatewayType,
    /// 网关参数 (webhook: base_url, timeout_ms)
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// 网关类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayType {
    /// 仅记录日志
    Log,
    /// HTTP POST 到 endpoint handle
    Webhook,
}

/// 处理单元配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProcessorConfig {
    /// 唯一名称
    #[validate(length(min = 1))]
    pub name: String,

    #[serde(flatten)]
    pub spec: ProcessorSpec,
}

/// 处理单元类型与参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessorSpec {
    /// 关系实体 Created -> MemberAdded, 通知全部当前成员
    MembershipAdded {
        source_name: String,
        grouping: GroupingKind,
        #[serde(default = "default_membership_entity")]
        entity_type: String,
        publish_to: String,
    },

    /// 关系实体 Deleted -> MemberRemoved, 通知移除后的成员
    MembershipRemoved {
        source_name: String,
        grouping: GroupingKind,
        #[serde(default = "default_membership_entity")]
        entity_type: String,
        publish_to: String,
        /// 是否同时通知被移除的用户
        #[serde(default)]
        include_removed_user: bool,
    },

    /// 指定字段新旧值不同 -> 单一接收者事件
    FieldChanged {
        source_name: String,
        entity_type: String,
        field: String,
        event_type: String,
        #[serde(default = "default_owner_attribute")]
        owner_attribute: String,
        publish_to: String,
    },

    /// 对象存储新对象 -> 通知 key 第一段所指的用户
    ObjectCreated {
        container_name: String,
        #[serde(default)]
        key_prefix: Option<String>,
        event_type: String,
        publish_to: String,
    },

    /// 第二阶段：按 channel_identifier 精确匹配，直接投递
    TopicFanout {
        channel_identifier: String,
        channels: Vec<ChannelKind>,
        #[serde(default)]
        recipients: RecipientScope,
    },
}

fn default_membership_entity() -> String {
    "Membership".to_string()
}

fn default_owner_attribute() -> String {
    "ownerId".to_string()
}

impl ProcessorSpec {
    /// Kind label for logs
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::MembershipAdded { .. } => "membership_added",
            Self::MembershipRemoved { .. } => "membership_removed",
            Self::FieldChanged { .. } => "field_changed",
            Self::ObjectCreated { .. } => "object_created",
            Self::TopicFanout { .. } => "topic_fanout",
        }
    }

    /// True for processors that consume republished envelopes
    pub fn is_second_stage(&self) -> bool {
        matches!(self, Self::TopicFanout { .. })
    }

    /// Channel identifier this processor republishes to
    pub fn publish_to(&self) -> Option<&str> {
        match self {
            Self::MembershipAdded { publish_to, .. }
            | Self::MembershipRemoved { publish_to, .. }
            | Self::FieldChanged { publish_to, .. }
            | Self::ObjectCreated { publish_to, .. } => Some(publish_to),
            Self::TopicFanout { .. } => None,
        }
    }

    /// Channels a fan-out processor delivers on
    pub fn fanout_channels(&self) -> &[ChannelKind] {
        match self {
            Self::TopicFanout { channels, .. } => channels,
            _ => &[],
        }
    }
}

/// 分组类型 (每种类型一个处理单元实例)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingKind {
    Team,
    Group,
    Meeting,
}

impl GroupingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Team => "team",
            Self::Group => "group",
            Self::Meeting => "meeting",
        }
    }
}

/// Fan-out 接收者范围
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RecipientScope {
    /// 事件内嵌的全部 recipient_ids
    #[default]
    All,
    /// 仅 payload 中某字段指定的用户 (字符串或字符串数组)
    PayloadField { field: String },
}
