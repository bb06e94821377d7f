//! Runtime values held by record instances.
//!
//! A [`RecordValue`] is the dynamic form of a record instance: its record
//! identity plus an ordered map of field name to [`Value`]. Typed Rust structs
//! reach this form through [`Record::to_record`](crate::Record::to_record) and
//! leave it through [`Record::from_record`](crate::Record::from_record).

use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use indexmap::IndexMap;
use num_rational::Rational64;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::ValueError;
use crate::format;
use crate::traits::SerializableType;
use crate::tree::TreeValue;
use crate::types::RecordRef;

/// A runtime field value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Set(Vec<Value>),
    FrozenSet(Vec<Value>),
    Map(ValueMap),
    ChainMap(Vec<ValueMap>),
    Path(PathBuf),
    Enum(EnumMember),
    DateTime(DateTimeValue),
    Date(NaiveDate),
    Time(NaiveTime),
    Duration(TimeDelta),
    TimeZone(FixedOffset),
    Uuid(Uuid),
    Decimal(Decimal),
    Fraction(Rational64),
    Record(RecordValue),
    Custom(CustomValue),
}

impl Value {
    /// Short name of this value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::FrozenSet(_) => "frozenset",
            Self::Map(_) => "map",
            Self::ChainMap(_) => "chainmap",
            Self::Path(_) => "path",
            Self::Enum(_) => "enum",
            Self::DateTime(_) => "datetime",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Duration(_) => "duration",
            Self::TimeZone(_) => "timezone",
            Self::Uuid(_) => "uuid",
            Self::Decimal(_) => "decimal",
            Self::Fraction(_) => "fraction",
            Self::Record(_) => "record",
            Self::Custom(_) => "custom",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Build a set, dropping duplicate members.
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Set(dedup(items))
    }

    pub fn frozen_set(items: impl IntoIterator<Item = Value>) -> Self {
        Self::FrozenSet(dedup(items))
    }

    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    pub fn as_record(&self) -> Option<&RecordValue> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Structural conversion used by `Any` fields.
    ///
    /// Scalars, sequences and text-keyed maps become their tree shape; every
    /// other value is carried as [`TreeValue::Native`].
    pub fn to_tree(&self) -> TreeValue {
        match self {
            Self::Null => TreeValue::Null,
            Self::Bool(value) => TreeValue::Bool(*value),
            Self::Int(value) => TreeValue::Int(*value),
            Self::Float(value) => TreeValue::Float(*value),
            Self::Text(value) => TreeValue::Text(value.clone()),
            Self::Bytes(value) => TreeValue::Bytes(value.clone()),
            Self::List(items) | Self::Set(items) | Self::FrozenSet(items) => {
                TreeValue::Seq(items.iter().map(Value::to_tree).collect())
            }
            Self::Map(map) if map.keys().all(|key| matches!(key, Value::Text(_))) => {
                TreeValue::Map(
                    map.iter()
                        .filter_map(|(key, value)| match key {
                            Value::Text(key) => Some((key.clone(), value.to_tree())),
                            _ => None,
                        })
                        .collect(),
                )
            }
            other => TreeValue::Native(Box::new(other.clone())),
        }
    }

    /// Structural inverse of [`Value::to_tree`].
    pub fn from_tree(tree: TreeValue) -> Self {
        match tree {
            TreeValue::Null => Self::Null,
            TreeValue::Bool(value) => Self::Bool(value),
            TreeValue::Int(value) => Self::Int(value),
            TreeValue::Float(value) => Self::Float(value),
            TreeValue::Text(value) => Self::Text(value),
            TreeValue::Bytes(value) => Self::Bytes(value),
            TreeValue::Seq(items) => Self::List(items.into_iter().map(Self::from_tree).collect()),
            TreeValue::Map(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (Self::Text(key), Self::from_tree(value)))
                    .collect(),
            ),
            TreeValue::Native(value) => *value,
        }
    }

    /// The wire form used when a native value is serialized, if it has one.
    pub(crate) fn canonical_tree(&self) -> Option<TreeValue> {
        Some(match self {
            Self::Null => TreeValue::Null,
            Self::Bool(value) => TreeValue::Bool(*value),
            Self::Int(value) => TreeValue::Int(*value),
            Self::Float(value) => TreeValue::Float(*value),
            Self::Text(value) => TreeValue::Text(value.clone()),
            Self::Bytes(value) => TreeValue::Text(format::encode_bytes(value)),
            Self::List(items) | Self::Set(items) | Self::FrozenSet(items) => TreeValue::Seq(
                items
                    .iter()
                    .map(Value::canonical_tree)
                    .collect::<Option<_>>()?,
            ),
            Self::Map(map) => canonical_map(map)?,
            Self::ChainMap(layers) => TreeValue::Seq(
                layers
                    .iter()
                    .map(canonical_map)
                    .collect::<Option<_>>()?,
            ),
            Self::Path(path) => TreeValue::Text(path.to_str()?.to_owned()),
            Self::Enum(member) => member.value.clone(),
            Self::DateTime(value) => TreeValue::Text(format::datetime_iso(value)),
            Self::Date(value) => TreeValue::Text(format::date_iso(value)),
            Self::Time(value) => TreeValue::Text(format::time_iso(value)),
            Self::Duration(value) => TreeValue::Float(format::duration_seconds(value)),
            Self::TimeZone(value) => TreeValue::Text(format::timezone_name(value)),
            Self::Uuid(value) => TreeValue::Text(value.to_string()),
            Self::Decimal(value) => TreeValue::Text(value.to_string()),
            Self::Fraction(value) => TreeValue::Text(value.to_string()),
            Self::Record(_) => return None,
            Self::Custom(value) => value.serialize().ok()?,
        })
    }
}

fn canonical_map(map: &ValueMap) -> Option<TreeValue> {
    map.iter()
        .map(|(key, value)| {
            let key = format::scalar_key(&key.canonical_tree()?)?;
            Some((key, value.canonical_tree()?))
        })
        .collect::<Option<_>>()
        .map(TreeValue::Map)
}

fn dedup(items: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

impl_value_from! {
    bool => Bool,
    i64 => Int,
    i32 => Int,
    f64 => Float,
    String => Text,
    &str => Text,
    Vec<u8> => Bytes,
    PathBuf => Path,
    EnumMember => Enum,
    DateTimeValue => DateTime,
    NaiveDate => Date,
    NaiveTime => Time,
    TimeDelta => Duration,
    FixedOffset => TimeZone,
    Uuid => Uuid,
    Decimal => Decimal,
    Rational64 => Fraction,
    RecordValue => Record,
    ValueMap => Map,
}

/// An association list with order-insensitive equality.
///
/// Keys are arbitrary values, so this cannot be a hash map; lookups are linear.
#[derive(Debug, Clone, Default)]
pub struct ValueMap {
    entries: Vec<(Value, Value)>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing the value of an equal key in place.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(key, _)| key)
    }
}

impl PartialEq for ValueMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl FromIterator<(Value, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl IntoIterator for ValueMap {
    type Item = (Value, Value);
    type IntoIter = std::vec::IntoIter<(Value, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A member of a declared enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub enum_name: Arc<str>,
    pub name: Arc<str>,
    /// The member's underlying value, emitted on the wire.
    pub value: TreeValue,
}

/// A datetime with or without a UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeValue {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

/// The dynamic form of a record instance.
#[derive(Clone)]
pub struct RecordValue {
    record: RecordRef,
    fields: IndexMap<String, Value>,
}

impl RecordValue {
    pub fn new(record: RecordRef) -> Self {
        Self {
            record,
            fields: IndexMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(name)
    }

    pub fn record(&self) -> &RecordRef {
        &self.record
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> IndexMap<String, Value> {
        self.fields
    }
}

impl PartialEq for RecordValue {
    fn eq(&self, other: &Self) -> bool {
        self.record.name() == other.record.name() && self.fields == other.fields
    }
}

impl fmt::Debug for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct(self.record.name());
        for (name, value) in &self.fields {
            out.field(name, value);
        }
        out.finish()
    }
}

/// Object-safe view of a [`SerializableType`].
pub(crate) trait SerializableObject: fmt::Debug + Send + Sync + 'static {
    fn type_name(&self) -> &'static str;
    fn serialize_tree(&self) -> Result<TreeValue, ValueError>;
    fn as_any(&self) -> &dyn Any;
    fn eq_object(&self, other: &dyn SerializableObject) -> bool;
}

impl<T: SerializableType> SerializableObject for T {
    fn type_name(&self) -> &'static str {
        T::NAME
    }

    fn serialize_tree(&self) -> Result<TreeValue, ValueError> {
        SerializableType::serialize(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_object(&self, other: &dyn SerializableObject) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }
}

/// A value of a user type that serializes itself.
#[derive(Clone)]
pub struct CustomValue(Arc<dyn SerializableObject>);

impl CustomValue {
    pub fn new<T: SerializableType>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    pub fn serialize(&self) -> Result<TreeValue, ValueError> {
        self.0.serialize_tree()
    }

    pub fn downcast_ref<T: SerializableType>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Extract a typed value from a [`Value::Custom`].
    pub fn take<T: SerializableType>(value: Value) -> Result<T, ValueError> {
        match &value {
            Value::Custom(custom) => custom
                .downcast_ref::<T>()
                .cloned()
                .ok_or_else(|| ValueError::type_mismatch(T::NAME, &value)),
            other => Err(ValueError::type_mismatch(T::NAME, other)),
        }
    }
}

impl PartialEq for CustomValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_object(other.0.as_ref())
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_map_equality_ignores_order() {
        let a = Value::map([("a", 1), ("b", 2)]);
        let b = Value::map([("b", 2), ("a", 1)]);
        assert_eq!(a, b);
        assert_ne!(a, Value::map([("a", 1)]));
    }

    #[test]
    fn test_value_map_insert_replaces() {
        let mut map = ValueMap::new();
        assert_eq!(map.insert(Value::Int(1), Value::text("one")), None);
        assert_eq!(
            map.insert(Value::Int(1), Value::text("uno")),
            Some(Value::text("one"))
        );
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&Value::Int(1)), Some(&Value::text("uno")));
    }

    #[test]
    fn test_set_drops_duplicates() {
        assert_eq!(
            Value::set([Value::Int(1), Value::Int(2), Value::Int(1)]),
            Value::Set(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_structural_tree_conversion() {
        let value = Value::map([("a", Value::list([Value::Int(1), Value::Null]))]);
        let tree = value.to_tree();
        assert_eq!(
            tree,
            TreeValue::map([(
                "a",
                TreeValue::Seq(vec![TreeValue::Int(1), TreeValue::Null])
            )])
        );
        assert_eq!(Value::from_tree(tree), value);
    }

    #[test]
    fn test_non_tree_values_stay_native() {
        let id = Uuid::nil();
        let tree = Value::Uuid(id).to_tree();
        assert_eq!(tree, TreeValue::Native(Box::new(Value::Uuid(id))));
        assert_eq!(Value::from_tree(tree), Value::Uuid(id));
        assert_eq!(
            Value::Uuid(id).canonical_tree(),
            Some(TreeValue::from("00000000-0000-0000-0000-000000000000"))
        );
    }

    #[test]
    fn test_integer_keyed_map_is_native_with_text_keys_on_the_wire() {
        let value = Value::map([(1, "one")]);
        let tree = value.to_tree();
        assert!(matches!(tree, TreeValue::Native(_)));
        assert_eq!(
            tree.to_json().unwrap(),
            serde_json::json!({"1": "one"})
        );
    }
}
