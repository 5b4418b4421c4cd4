//! Change-stream adapter: `RawStreamRecord` → `ChangeRecord`

use contracts::{AttributeMap, ChangeRecord};

use super::attribute_value::unmarshal_image;
use crate::error::{IngestionError, Result};
use crate::raw::{ImageFormat, RawStreamRecord};

const SOURCE: &str = "stream";

/// Normalize one stream record
///
/// Enforces the kind/state invariant: `INSERT` keeps only the new image,
/// `REMOVE` only the old one, `MODIFY` requires both.
pub fn normalize_stream(raw: &RawStreamRecord) -> Result<ChangeRecord> {
    let source_name = source_name(raw)?;
    let image = |value: &Option<serde_json::Value>, field: &'static str| -> Result<AttributeMap> {
        let value = value
            .as_ref()
            .ok_or_else(|| IngestionError::missing(SOURCE, field))?;
        decode_image(value, raw.image_format)
    };

    let record = match raw.event_name.as_deref() {
        Some("INSERT") => ChangeRecord::created(source_name, image(&raw.new_image, "newImage")?),
        Some("MODIFY") => ChangeRecord::updated(
            source_name,
            image(&raw.old_image, "oldImage")?,
            image(&raw.new_image, "newImage")?,
        ),
        Some("REMOVE") => ChangeRecord::deleted(source_name, image(&raw.old_image, "oldImage")?),
        Some(other) => {
            return Err(IngestionError::malformed(
                SOURCE,
                format!("unknown event name '{other}'"),
            ))
        }
        None => return Err(IngestionError::missing(SOURCE, "eventName")),
    };

    Ok(record)
}

/// Table name, or the `table/<name>` segment of the stream ARN
fn source_name(raw: &RawStreamRecord) -> Result<String> {
    if let Some(name) = raw.table_name.as_deref().filter(|n| !n.is_empty()) {
        return Ok(name.to_string());
    }

    raw.event_source_arn
        .as_deref()
        .and_then(|arn| arn.split("table/").nth(1))
        .and_then(|rest| rest.split('/').next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| IngestionError::missing(SOURCE, "tableName"))
}

fn decode_image(value: &serde_json::Value, format: ImageFormat) -> Result<AttributeMap> {
    match format {
        ImageFormat::Typed => {
            unmarshal_image(value).map_err(|e| IngestionError::malformed(SOURCE, e))
        }
        ImageFormat::Plain => value
            .as_object()
            .cloned()
            .ok_or_else(|| IngestionError::malformed(SOURCE, "image is not an object")),
    }
}
