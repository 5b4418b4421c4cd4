//! # Ingestion
//!
//! Record normalization for the dispatch core.
//!
//! Responsibilities:
//! - Decode raw change-stream, pub/sub and object-storage events
//! - Unmarshal typed attribute-value images into plain JSON maps
//! - Produce exactly one `SourceRecord` per raw event, in order
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{RawEvent, RecordNormalizer};
//!
//! let normalizer = RecordNormalizer::new();
//! let raw: Vec<RawEvent> = serde_json::from_str(&body)?;
//! let records = normalizer.normalize_batch(&raw);
//! dispatcher.dispatch_records(&records).await;
//! ```

mod adapters;
mod error;
mod normalizer;
mod raw;

pub use adapters::{
    normalize_pubsub, normalize_storage, normalize_stream, unmarshal_image, unmarshal_value,
};
pub use error::{IngestionError, Result};
pub use normalizer::{NormalizerMetrics, NormalizerSnapshot, RecordNormalizer};
pub use raw::{ImageFormat, RawEvent, RawPubSubMessage, RawStorageEvent, RawStreamRecord};
