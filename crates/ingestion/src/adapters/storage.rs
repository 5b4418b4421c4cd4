//! Object-storage adapter: `RawStorageEvent` → `ObjectNotification`

use contracts::ObjectNotification;

use crate::error::{IngestionError, Result};
use crate::raw::RawStorageEvent;

const SOURCE: &str = "storage";

/// Normalize one storage event, decoding the URL-encoded key
pub fn normalize_storage(raw: &RawStorageEvent) -> Result<ObjectNotification> {
    let container_name = raw
        .bucket
        .as_deref()
        .filter(|b| !b.is_empty())
        .ok_or_else(|| IngestionError::missing(SOURCE, "bucket"))?;
    let encoded = raw
        .key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| IngestionError::missing(SOURCE, "key"))?;

    let object_key = decode_key(encoded)?;

    Ok(ObjectNotification {
        container_name: container_name.to_string(),
        object_key,
    })
}

fn decode_key(encoded: &str) -> Result<String> {
    let spaced = encoded.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|key| key.into_owned())
        .map_err(|e| IngestionError::malformed(SOURCE, format!("key is not UTF-8: {e}")))
}
