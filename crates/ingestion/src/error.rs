//! Ingestion 错误类型
//!
//! 这些错误不会越过 `RecordNormalizer`：畸形输入被替换为零值记录。

use thiserror::Error;

/// Source adapter error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 原始事件缺少必填字段
    #[error("{source_kind} event is missing '{field}'")]
    MissingField {
        /// 来源类型 (stream / pubsub / storage)
        source_kind: &'static str,
        /// 字段名
        field: &'static str,
    },

    /// 原始事件结构不合法
    #[error("malformed {source_kind} event: {message}")]
    Malformed {
        /// 来源类型
        source_kind: &'static str,
        /// 错误消息
        message: String,
    },
}

impl IngestionError {
    pub fn missing(source_kind: &'static str, field: &'static str) -> Self {
        Self::MissingField { source_kind, field }
    }

    pub fn malformed(source_kind: &'static str, message: impl Into<String>) -> Self {
        Self::Malformed {
            source_kind,
            message: message.into(),
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
