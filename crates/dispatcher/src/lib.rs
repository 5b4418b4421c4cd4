//! # Dispatcher
//!
//! 变更事件分发模块。
//!
//! 负责：
//! - 规范化原始事件 (`ingestion::RecordNormalizer`)
//! - 对每条记录同步求值全部处理单元的谓词
//! - 并发调用命中的 handler，等待全部完成，失败汇总为一份报告
//! - 两阶段之间的进程内转发 (`ChannelPublisher` / `EnvelopeRelay`)

pub mod builder;
pub mod dispatcher;
pub mod error;
pub mod mediator;
pub mod metrics;
pub mod predicate;
pub mod processors;
pub mod relay;
pub mod report;

pub use builder::DispatcherBuilder;
pub use dispatcher::{BatchSummary, Dispatcher};
pub use error::DispatcherError;
pub use mediator::{MediatorFixture, StaticEntityMediator};
pub use metrics::{DispatchMetrics, DispatchSnapshot};
pub use predicate::RecordFilter;
pub use processors::{create_processor, ProcessorContext};
pub use relay::{relay_channel, ChannelPublisher, EnvelopeRelay};
pub use report::{
    BatchFailureReport, CollectingErrorSink, ErrorSink, HandlerFailure, LogErrorSink,
    TeeErrorSink,
};
