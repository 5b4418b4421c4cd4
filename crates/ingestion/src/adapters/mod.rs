//! 来源适配器模块
//!
//! 每个适配器负责将一种原始事件转换为规范记录，失败时返回 `IngestionError`。
//! `RecordNormalizer` 负责把失败替换为零值记录。

mod attribute_value;
mod pubsub;
mod storage;
mod stream;

pub use attribute_value::{unmarshal_image, unmarshal_value};
pub use pubsub::normalize_pubsub;
pub use storage::normalize_storage;
pub use stream::normalize_stream;
