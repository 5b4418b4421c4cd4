//! Fan-out 错误类型

use contracts::{ChannelKind, ContractError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FanoutError {
    /// 没有网关服务该通道
    #[error("no gateway serves channel '{0}'")]
    UnknownChannel(ChannelKind),

    /// 网关错误 (mint 失败等)
    #[error(transparent)]
    Gateway(#[from] ContractError),

    /// 网关配置错误
    #[error("invalid {gateway_type} gateway config for channel '{channel}': {message}")]
    GatewayConfig {
        channel: ChannelKind,
        gateway_type: &'static str,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, FanoutError>;
