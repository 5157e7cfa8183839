//! Dynamic protocol value and forward-compatible extra-field passthrough.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// A dynamic protocol value. All wire payloads roundtrip through this type
/// before being interpreted as a typed request/response/notification.
///
/// Serializes to and from `serde_json::Value` directly (it is a transparent
/// newtype), so every protocol struct can simply embed `serde_json::Value`
/// fields and reach for [`Value::from_json`] / [`Value::into_json`] when it
/// needs to distinguish int from double or preserve a raw binary blob.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
    Binary { bytes: Vec<u8>, mime_type: Option<String> },
}

impl Value {
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Double(n.as_f64().unwrap_or_default())
                }
            }
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::Array(items.into_iter().map(Value::from_json).collect()),
            JsonValue::Object(map) => {
                if let Some(kind) = map.get("type").and_then(|v| v.as_str())
                    && kind == "binary"
                    && let Some(data) = map.get("data").and_then(|v| v.as_str())
                {
                    use base64::Engine;
                    if let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(data) {
                        let mime_type = map
                            .get("mimeType")
                            .and_then(|v| v.as_str())
                            .map(String::from);
                        return Value::Binary { bytes, mime_type };
                    }
                }
                Value::Object(
                    map.into_iter()
                        .map(|(k, v)| (k, Value::from_json(v)))
                        .collect(),
                )
            }
        }
    }

    pub fn into_json(self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(b),
            Value::Int(i) => JsonValue::Number(i.into()),
            Value::Double(d) => serde_json::Number::from_f64(d)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s),
            Value::Array(items) => JsonValue::Array(items.into_iter().map(Value::into_json).collect()),
            Value::Object(entries) => {
                let mut map = Map::new();
                for (k, v) in entries {
                    map.insert(k, v.into_json());
                }
                JsonValue::Object(map)
            }
            Value::Binary { bytes, mime_type } => {
                use base64::Engine;
                let mut map = Map::new();
                map.insert("type".into(), JsonValue::String("binary".into()));
                map.insert(
                    "data".into(),
                    JsonValue::String(base64::engine::general_purpose::STANDARD.encode(bytes)),
                );
                if let Some(mime_type) = mime_type {
                    map.insert("mimeType".into(), JsonValue::String(mime_type));
                }
                JsonValue::Object(map)
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.clone().into_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        JsonValue::deserialize(deserializer).map(Value::from_json)
    }
}

/// Bag of unknown fields preserved on decode for forward compatibility.
///
/// Attached to payloads that need passthrough, notably the flattened
/// foreign result carried by `tasks/result` responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtraFields(pub BTreeMap<String, JsonValue>);

impl ExtraFields {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    pub fn from_object(mut object: Map<String, JsonValue>, known_keys: &[&str]) -> Self {
        for key in known_keys {
            object.remove(*key);
        }
        Self(object.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn int_and_double_stay_distinct() {
        assert_eq!(Value::from_json(json!(3)), Value::Int(3));
        assert_eq!(Value::from_json(json!(3.0)), Value::Double(3.0));
    }

    #[test]
    fn binary_roundtrips_through_base64() {
        let original = Value::Binary {
            bytes: vec![1, 2, 3, 4],
            mime_type: Some("application/octet-stream".into()),
        };
        let json = original.clone().into_json();
        assert_eq!(json["type"], "binary");
        assert_eq!(Value::from_json(json), original);
    }

    #[test]
    fn object_preserves_key_order() {
        let value = Value::Object(vec![
            ("b".into(), Value::Int(1)),
            ("a".into(), Value::Int(2)),
        ]);
        let json = value.into_json();
        let keys: Vec<_> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn extra_fields_drops_known_keys() {
        let mut object = Map::new();
        object.insert("taskId".into(), json!("t1"));
        object.insert("content".into(), json!("hi"));
        let extra = ExtraFields::from_object(object, &["taskId"]);
        assert!(extra.get("taskId").is_none());
        assert_eq!(extra.get("content"), Some(&json!("hi")));
    }
}
