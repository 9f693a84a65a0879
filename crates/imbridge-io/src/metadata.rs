//! Conversion between JSON objects and [`MetaDataDictionary`].
//!
//! | JSON                                | [`MetadataValue`] |
//! |-------------------------------------|-------------------|
//! | string                              | `String`          |
//! | integer fitting in `i64`            | `Integer`         |
//! | any other number                    | `Float`           |
//! | array of strings                    | `StringList`      |
//! | array of integers fitting in `i64`  | `IntegerList`     |
//! | array of numbers, or empty array    | `FloatList`       |
//!
//! Booleans, null, objects and arrays of mixed or nested elements have no
//! counterpart; what happens to them is decided by [`MetadataPolicy`].

use imbridge_image::{MetaDataDictionary, MetadataValue};
use serde_json::{Map, Number, Value};

use crate::{config::MetadataPolicy, error::CodecError};

/// Converts a JSON object into a dictionary, keeping the document order.
///
/// # Errors
///
/// [`CodecError::UnsupportedMetadataValue`] for a value without counterpart
/// when `policy` is [`MetadataPolicy::Reject`].
pub fn json_to_metadata(
    object: &Map<String, Value>,
    policy: MetadataPolicy,
) -> Result<MetaDataDictionary, CodecError> {
    let mut dict = MetaDataDictionary::new();
    for (key, value) in object {
        match json_to_value(value) {
            Some(v) => {
                dict.insert(key.as_str(), v);
            }
            None => match policy {
                MetadataPolicy::Reject => {
                    return Err(CodecError::UnsupportedMetadataValue {
                        key: key.clone(),
                        kind: describe(value).to_string(),
                    })
                }
                MetadataPolicy::Skip => {
                    log::warn!("skipping metadata {key:?}: unsupported {}", describe(value));
                }
                MetadataPolicy::Stringify => {
                    log::debug!("storing metadata {key:?} as JSON text");
                    dict.insert(key.as_str(), value.to_string());
                }
            },
        }
    }
    Ok(dict)
}

/// Converts a dictionary into a JSON object, keeping the dictionary order.
///
/// # Errors
///
/// [`CodecError::Serialization`] for NaN or infinite floats.
pub fn metadata_to_json(dict: &MetaDataDictionary) -> Result<Map<String, Value>, CodecError> {
    let mut object = Map::new();
    for (key, value) in dict.iter() {
        let json = match value {
            MetadataValue::String(s) => Value::String(s.clone()),
            MetadataValue::Integer(v) => Value::from(*v),
            MetadataValue::Float(v) => float(*v, key)?,
            MetadataValue::StringList(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            MetadataValue::IntegerList(items) => {
                Value::Array(items.iter().copied().map(Value::from).collect())
            }
            MetadataValue::FloatList(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| float(v, &format!("{key}[{i}]")))
                    .collect::<Result<_, _>>()?,
            ),
        };
        object.insert(key.to_string(), json);
    }
    Ok(object)
}

fn float(v: f64, field: &str) -> Result<Value, CodecError> {
    Number::from_f64(v)
        .map(Value::Number)
        .ok_or_else(|| CodecError::Serialization {
            field: field.to_string(),
            reason: format!("{v} has no JSON representation"),
        })
}

fn json_to_value(value: &Value) -> Option<MetadataValue> {
    match value {
        Value::String(s) => Some(MetadataValue::String(s.clone())),
        Value::Number(n) => n
            .as_i64()
            .map(MetadataValue::Integer)
            .or_else(|| n.as_f64().map(MetadataValue::Float)),
        Value::Array(items) => list(items),
        Value::Bool(_) | Value::Null | Value::Object(_) => None,
    }
}

fn list(items: &[Value]) -> Option<MetadataValue> {
    if items.iter().all(Value::is_string) && !items.is_empty() {
        let strings = items.iter().filter_map(|v| v.as_str().map(String::from));
        return Some(MetadataValue::StringList(strings.collect()));
    }
    if !items.iter().all(Value::is_number) {
        return None;
    }
    if !items.is_empty() && items.iter().all(|v| v.as_i64().is_some()) {
        return Some(MetadataValue::IntegerList(
            items.iter().filter_map(Value::as_i64).collect(),
        ));
    }
    Some(MetadataValue::FloatList(
        items.iter().filter_map(Value::as_f64).collect(),
    ))
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Object(_) => "object",
        Value::Array(_) => "array with mixed or nested elements",
        Value::String(_) => "string",
        Value::Number(_) => "number",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_value_kinds() -> Result<(), CodecError> {
        let dict = json_to_metadata(
            &object(json!({
                "s": "text",
                "i": -3,
                "f": 2.5,
                "big": 18446744073709551615u64,
                "sl": ["a", "b"],
                "il": [1, 2, 3],
                "fl": [1, 2.5],
                "empty": []
            })),
            MetadataPolicy::Reject,
        )?;
        assert_eq!(dict.get("s"), Some(&MetadataValue::String("text".into())));
        assert_eq!(dict.get("i"), Some(&MetadataValue::Integer(-3)));
        assert_eq!(dict.get("f"), Some(&MetadataValue::Float(2.5)));
        assert_eq!(dict.get("big"), Some(&MetadataValue::Float(u64::MAX as f64)));
        assert_eq!(
            dict.get("sl"),
            Some(&MetadataValue::StringList(vec!["a".into(), "b".into()]))
        );
        assert_eq!(dict.get("il"), Some(&MetadataValue::IntegerList(vec![1, 2, 3])));
        assert_eq!(dict.get("fl"), Some(&MetadataValue::FloatList(vec![1.0, 2.5])));
        assert_eq!(dict.get("empty"), Some(&MetadataValue::FloatList(vec![])));
        Ok(())
    }

    #[test]
    fn test_order_is_kept() -> Result<(), CodecError> {
        let input = object(serde_json::from_str(r#"{"b": 1, "a": "x", "c": [0.5]}"#).map_err(CodecError::Parse)?);
        let dict = json_to_metadata(&input, MetadataPolicy::Reject)?;
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        let output = metadata_to_json(&dict)?;
        assert_eq!(output.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(output, input);
        Ok(())
    }

    #[test]
    fn test_unsupported_reject() {
        for (value, kind) in [
            (json!(true), "boolean"),
            (json!(null), "null"),
            (json!({"k": 1}), "object"),
            (json!([1, "a"]), "array with mixed or nested elements"),
            (json!([[1], [2]]), "array with mixed or nested elements"),
        ] {
            let input = object(json!({ "ok": 1, "bad": value }));
            match json_to_metadata(&input, MetadataPolicy::Reject) {
                Err(CodecError::UnsupportedMetadataValue { key, kind: k }) => {
                    assert_eq!(key, "bad");
                    assert_eq!(k, kind);
                }
                other => panic!("expected unsupported value, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_unsupported_skip_and_stringify() -> Result<(), CodecError> {
        let input = object(json!({ "a": 1, "flag": true, "nested": {"x": [1, 2]} }));

        let dict = json_to_metadata(&input, MetadataPolicy::Skip)?;
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["a"]);

        let dict = json_to_metadata(&input, MetadataPolicy::Stringify)?;
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["a", "flag", "nested"]);
        assert_eq!(dict.get("flag"), Some(&MetadataValue::String("true".into())));
        assert_eq!(
            dict.get("nested"),
            Some(&MetadataValue::String("{\"x\":[1,2]}".into()))
        );
        Ok(())
    }

    #[test]
    fn test_float_kind_survives() -> Result<(), CodecError> {
        let mut dict = MetaDataDictionary::new();
        dict.insert("whole", 2.0f64);
        dict.insert("list", vec![1.0f64, 2.0]);
        let json = metadata_to_json(&dict)?;
        let back = json_to_metadata(&json, MetadataPolicy::Reject)?;
        assert_eq!(back, dict);
        Ok(())
    }

    #[test]
    fn test_non_finite_float() {
        let mut dict = MetaDataDictionary::new();
        dict.insert("spacing", vec![1.0f64, f64::INFINITY]);
        assert!(matches!(
            metadata_to_json(&dict),
            Err(CodecError::Serialization { field, .. }) if field == "spacing[1]"
        ));

        let mut dict = MetaDataDictionary::new();
        dict.insert("nan", f64::NAN);
        assert!(matches!(
            metadata_to_json(&dict),
            Err(CodecError::Serialization { field, .. }) if field == "nan"
        ));
    }
}
