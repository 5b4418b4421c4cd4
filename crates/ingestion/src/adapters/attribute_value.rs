//! Typed attribute-value images → plain JSON
//!
//! `{"S": "x"}` → `"x"`, `{"N": "1.5"}` → `1.5`, `{"M": {...}}` → object, etc.

use contracts::AttributeMap;
use serde_json::{Map, Number, Value};

/// Unmarshal a whole image (top-level object of typed values)
pub fn unmarshal_image(image: &Value) -> Result<AttributeMap, String> {
    let fields = image
        .as_object()
        .ok_or_else(|| "image is not an object".to_string())?;

    fields
        .iter()
        .map(|(name, value)| {
            unmarshal_value(value)
                .map(|plain| (name.clone(), plain))
                .map_err(|e| format!("attribute '{name}': {e}"))
        })
        .collect()
}

/// Unmarshal one typed value
pub fn unmarshal_value(value: &Value) -> Result<Value, String> {
    let typed = value
        .as_object()
        .filter(|obj| obj.len() == 1)
        .ok_or_else(|| "expected a single-key type descriptor".to_string())?;

    // filter above guarantees exactly one entry
    let Some((tag, inner)) = typed.iter().next() else {
        return Err("empty type descriptor".to_string());
    };

    match tag.as_str() {
        "S" | "B" => inner
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| format!("{tag} must hold a string")),
        "N" => parse_number(inner),
        "BOOL" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| "BOOL must hold a boolean".to_string()),
        "NULL" => Ok(Value::Null),
        "M" => inner
            .as_object()
            .ok_or_else(|| "M must hold an object".to_string())
            .and_then(|fields| {
                fields
                    .iter()
                    .map(|(k, v)| unmarshal_value(v).map(|plain| (k.clone(), plain)))
                    .collect::<Result<Map<String, Value>, String>>()
                    .map(Value::Object)
            }),
        "L" => list(inner, "L")?
            .iter()
            .map(unmarshal_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        "SS" | "BS" => list(inner, tag)?
            .iter()
            .map(|v| {
                v.as_str()
                    .map(|s| Value::String(s.to_string()))
                    .ok_or_else(|| format!("{tag} members must be strings"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        "NS" => list(inner, "NS")?
            .iter()
            .map(parse_number)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Err(format!("unknown type descriptor '{other}'")),
    }
}

fn list<'a>(value: &'a Value, tag: &str) -> Result<&'a Vec<Value>, String> {
    value
        .as_array()
        .ok_or_else(|| format!("{tag} must hold an array"))
}

fn parse_number(value: &Value) -> Result<Value, String> {
    let text = value
        .as_str()
        .ok_or_else(|| "N must hold a numeric string".to_string())?;
    text.parse::<Number>()
        .map(Value::Number)
        .map_err(|e| format!("invalid number '{text}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(unmarshal_value(&json!({"S": "hi"})).unwrap(), json!("hi"));
        assert_eq!(unmarshal_value(&json!({"N": "42"})).unwrap(), json!(42));
        assert_eq!(unmarshal_value(&json!({"N": "-1.5"})).unwrap(), json!(-1.5));
        assert_eq!(unmarshal_value(&json!({"BOOL": true})).unwrap(), json!(true));
        assert_eq!(unmarshal_value(&json!({"NULL": true})).unwrap(), Value::Null);
    }

    #[test]
    fn test_nested_image() {
        let image = json!({
            "entityType": {"S": "Membership"},
            "roles": {"SS": ["admin", "member"]},
            "profile": {"M": {"age": {"N": "30"}, "tags": {"L": [{"S": "a"}, {"N": "1"}]}}},
            "scores": {"NS": ["1", "2"]}
        });
        let plain = unmarshal_image(&image).unwrap();
        assert_eq!(plain["entityType"], json!("Membership"));
        assert_eq!(plain["roles"], json!(["admin", "member"]));
        assert_eq!(plain["profile"], json!({"age": 30, "tags": ["a", 1]}));
        assert_eq!(plain["scores"], json!([1, 2]));
    }

    #[test]
    fn test_rejects_malformed_values() {
        assert!(unmarshal_value(&json!("bare")).is_err());
        assert!(unmarshal_value(&json!({"S": "a", "N": "1"})).is_err());
        assert!(unmarshal_value(&json!({"N": "abc"})).is_err());
        assert!(unmarshal_value(&json!({"X": "?"})).is_err());

        let err = unmarshal_image(&json!({"id": {"N": 5}})).unwrap_err();
        assert!(err.contains("attribute 'id'"), "got: {err}");
    }
}
