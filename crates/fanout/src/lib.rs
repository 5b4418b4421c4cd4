//! # Fanout
//!
//! 多通道通知投递：
//! - endpoint 注册 (reverse lookup → 注销旧 owner → mint → register)
//! - `deliver`: recipient × channel × entry 并发发送 (有上限)
//! - 网关实现：`LogGateway`, `WebhookGateway`，由 `create_gateway` 按配置创建
//!
//! 投递失败只记录在 `DeliveryReport` 中，不重试也不向上传播。

mod error;
mod gateways;
mod report;
mod service;

pub use error::{FanoutError, Result};
pub use gateways::{create_gateway, LogGateway, WebhookGateway, WebhookGatewayConfig};
pub use report::DeliveryReport;
pub use service::NotificationFanoutService;
