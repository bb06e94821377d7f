//! The generic, wire-shaped value all encoded records reduce to.
//!
//! [`TreeValue`] is what [`CompiledCodec::encode`](crate::CompiledCodec::encode)
//! produces and what [`CompiledCodec::decode`](crate::CompiledCodec::decode)
//! consumes. It serializes through serde, so any serde data format can carry it;
//! [`TreeValue::to_json`] and [`TreeValue::from_json`] cover the common case.
//!
//! Two variants only appear when an option asks for them:
//!
//! - [`TreeValue::Bytes`] is produced when `raw_bytes` is set.
//! - [`TreeValue::Native`] carries a runtime [`Value`] kept as-is by `raw_enum`
//!   or `raw_datetime`, or held by an `Any` field that has no tree shape.

use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::format;
use crate::value::Value;

/// Mapping from text keys to tree values.
///
/// Keys keep insertion order for output, equality ignores it.
pub type TreeMap = IndexMap<String, TreeValue>;

/// A generic tree value: null, scalars, sequences and text-keyed mappings.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TreeValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Seq(Vec<TreeValue>),
    Map(TreeMap),
    Native(Box<Value>),
}

impl TreeValue {
    /// Short name of this value's shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Seq(_) => "sequence",
            Self::Map(_) => "mapping",
            Self::Native(value) => value.kind(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_map(&self) -> Option<&TreeMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[TreeValue]> {
        match self {
            Self::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Look up a key when this value is a mapping.
    pub fn get(&self, key: &str) -> Option<&TreeValue> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Build a mapping from key/value pairs.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<TreeValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Convert to a JSON value. Fails when a native value has no textual form.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn from_json(json: serde_json::Value) -> Self {
        Self::from(json)
    }
}

impl fmt::Display for TreeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}

impl From<bool> for TreeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for TreeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for TreeValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for TreeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for TreeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for TreeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<TreeValue>> for TreeValue {
    fn from(value: Vec<TreeValue>) -> Self {
        Self::Seq(value)
    }
}

impl From<TreeMap> for TreeValue {
    fn from(value: TreeMap) -> Self {
        Self::Map(value)
    }
}

impl From<serde_json::Value> for TreeValue {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Self::Null,
            Json::Bool(value) => Self::Bool(value),
            Json::Number(number) => match number.as_i64() {
                Some(int) => Self::Int(int),
                None => Self::Float(number.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(text) => Self::Text(text),
            Json::Array(items) => Self::Seq(items.into_iter().map(Self::from).collect()),
            Json::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for TreeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Int(value) => serializer.serialize_i64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::Text(value) => serializer.serialize_str(value),
            Self::Bytes(bytes) => serializer.serialize_str(&format::encode_bytes(bytes)),
            Self::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Self::Native(value) => match value.canonical_tree() {
                Some(tree) => tree.serialize(serializer),
                None => Err(serde::ser::Error::custom(format!(
                    "native {} value has no textual form",
                    value.kind()
                ))),
            },
        }
    }
}

impl<'de> Deserialize<'de> for TreeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TreeValueVisitor)
    }
}

struct TreeValueVisitor;

impl<'de> Visitor<'de> for TreeValueVisitor {
    type Value = TreeValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any tree value")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<TreeValue, E> {
        Ok(TreeValue::Bool(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<TreeValue, E> {
        Ok(TreeValue::Int(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<TreeValue, E> {
        Ok(match i64::try_from(value) {
            Ok(int) => TreeValue::Int(int),
            Err(_) => TreeValue::Float(value as f64),
        })
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<TreeValue, E> {
        Ok(TreeValue::Float(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<TreeValue, E> {
        Ok(TreeValue::Text(value.to_owned()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<TreeValue, E> {
        Ok(TreeValue::Text(value))
    }

    fn visit_bytes<E: de::Error>(self, value: &[u8]) -> Result<TreeValue, E> {
        Ok(TreeValue::Bytes(value.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, value: Vec<u8>) -> Result<TreeValue, E> {
        Ok(TreeValue::Bytes(value))
    }

    fn visit_none<E: de::Error>(self) -> Result<TreeValue, E> {
        Ok(TreeValue::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<TreeValue, E> {
        Ok(TreeValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<TreeValue, D::Error> {
        TreeValue::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<TreeValue, A::Error> {
        let mut items = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(item) = access.next_element()? {
            items.push(item);
        }
        Ok(TreeValue::Seq(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<TreeValue, A::Error> {
        let mut entries = TreeMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, TreeValue>()? {
            entries.insert(key, value);
        }
        Ok(TreeValue::Map(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_shapes() {
        let tree = TreeValue::from(json!({
            "name": "square",
            "num_corners": 4,
            "ratio": 0.5,
            "tags": ["a", null, true],
        }));

        assert_eq!(tree.get("name"), Some(&TreeValue::from("square")));
        assert_eq!(tree.get("num_corners"), Some(&TreeValue::Int(4)));
        assert_eq!(tree.get("ratio"), Some(&TreeValue::Float(0.5)));
        assert_eq!(
            tree.get("tags"),
            Some(&TreeValue::Seq(vec![
                TreeValue::from("a"),
                TreeValue::Null,
                TreeValue::Bool(true),
            ]))
        );
    }

    #[test]
    fn test_map_equality_ignores_order() {
        let a = TreeValue::map([("x", 1), ("y", 2)]);
        let b = TreeValue::map([("y", 2), ("x", 1)]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_bytes_serialize_as_base64() {
        let tree = TreeValue::map([("data", TreeValue::Bytes(b"123".to_vec()))]);
        assert_eq!(tree.to_json().unwrap(), json!({"data": "MTIz"}));
    }

    #[test]
    fn test_json_text_round_trip() {
        let text = r#"{"shapes":["triangle",{"name":"square","num_corners":4}]}"#;
        let tree: TreeValue = serde_json::from_str(text).unwrap();
        assert_eq!(serde_json::to_string(&tree).unwrap(), text);
    }

    #[test]
    fn test_display_is_compact_json() {
        let tree = TreeValue::map([("badfield", true)]);
        assert_eq!(tree.to_string(), r#"{"badfield":true}"#);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(TreeValue::Null.kind(), "null");
        assert_eq!(TreeValue::map([("a", 1)]).kind(), "mapping");
        assert_eq!(TreeValue::Seq(vec![]).kind(), "sequence");
    }
}
