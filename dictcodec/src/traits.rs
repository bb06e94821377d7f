//! Typed bridge between Rust types and the codec engine.
//!
//! This module defines the traits a Rust type implements to take part in
//! codec synthesis:
//!
//! - [`FieldType`]: any type usable as a record field. Declares its
//!   [`TypeExpr`] and converts to and from a runtime [`Value`].
//! - [`Record`]: a record type. Supplies the [`RecordDecl`] the schema is
//!   extracted from and converts to and from a [`RecordValue`].
//! - [`RecordHooks`]: per-record pre-decode and post-encode hooks.
//! - [`EnumType`]: an enumeration with underlying member values.
//! - [`SerializableType`]: a type that serializes itself.
//!
//! ## Deriving vs Manual Implementation
//!
//! `Record` and `EnumType` are normally derived:
//!
//! ```rust,ignore
//! use dictcodec::{Enumeration, Record};
//!
//! #[derive(Enumeration, Clone, Copy, Debug, PartialEq)]
//! enum Corner {
//!     #[enumeration(value = "sharp")]
//!     Sharp,
//!     #[enumeration(value = "round")]
//!     Round,
//! }
//!
//! #[derive(Record, Debug, PartialEq)]
//! struct Shape {
//!     name: String,
//!     corners: Vec<Corner>,
//! }
//! ```
//!
//! `SerializableType` is implemented by hand and registered as a field type
//! with [`serializable_field!`](crate::serializable_field).
//!
//! ## Provided Implementations
//!
//! - **Scalars**: `bool`, `String`, `i8`-`i64`, `u8`-`u32`, `f32`, `f64`
//! - **Collections**: `Option<T>`, `Vec<T>`, `VecDeque<T>`, `HashSet<T>`,
//!   `BTreeSet<T>`, `HashMap<K, V>`, `BTreeMap<K, V>`, `IndexMap<K, V>`
//! - **Wrappers**: `Box<T>`, `Arc<T>`
//! - **Other**: `PathBuf`, [`ByteString`], chrono date/time types, `Uuid`,
//!   `Decimal`, `Rational64`, [`Value`] (any), [`OneOf2`] and [`OneOf3`]

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, Utc,
};
use indexmap::IndexMap;
use num_rational::Rational64;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::codec::CompiledCodec;
use crate::encode::default_post_encode;
use crate::error::{ConversionError, SynthesisError, ValueError};
use crate::registry;
use crate::schema::RecordDecl;
use crate::tree::{TreeMap, TreeValue};
use crate::types::{EnumRef, RecordRef, TypeExpr};
use crate::value::{DateTimeValue, EnumMember, RecordValue, Value, ValueMap};

/// A type usable as a record field.
pub trait FieldType: Sized {
    /// The declared type of a field holding this type.
    fn type_expr() -> TypeExpr;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, ValueError>;
}

/// A record type: a named set of typed fields.
///
/// # Example
///
/// ```rust
/// use std::sync::{Arc, OnceLock};
/// use dictcodec::{
///     take_field, ConversionError, FieldDecl, FieldType, Record, RecordDecl, RecordValue,
/// };
///
/// #[derive(Debug, PartialEq)]
/// struct Point {
///     x: i64,
///     y: i64,
/// }
///
/// impl Record for Point {
///     const NAME: &'static str = "Point";
///
///     fn declaration() -> Arc<RecordDecl> {
///         static DECL: OnceLock<Arc<RecordDecl>> = OnceLock::new();
///         Arc::clone(DECL.get_or_init(|| {
///             Arc::new(
///                 RecordDecl::new(Self::NAME)
///                     .field(FieldDecl::new("x", i64::type_expr()))
///                     .field(FieldDecl::new("y", i64::type_expr()).with_default(0i64)),
///             )
///         }))
///     }
///
///     fn to_record(&self) -> RecordValue {
///         RecordValue::new(Self::record_ref())
///             .with("x", self.x.to_value())
///             .with("y", self.y.to_value())
///     }
///
///     fn from_record(mut record: RecordValue) -> Result<Self, ConversionError> {
///         Ok(Self {
///             x: take_field(&mut record, "x")?,
///             y: take_field(&mut record, "y")?,
///         })
///     }
/// }
///
/// let json = serde_json::json!({"x": 3});
/// let point: Point = dictcodec::from_json(json, &Default::default()).unwrap();
/// assert_eq!(point, Point { x: 3, y: 0 });
/// ```
pub trait Record: Sized + 'static {
    /// Record identity. Must be unique within the process.
    const NAME: &'static str;

    /// The record's declaration. Implementations build it once and share it.
    fn declaration() -> Arc<RecordDecl>;

    fn to_record(&self) -> RecordValue;

    fn from_record(record: RecordValue) -> Result<Self, ConversionError>;

    fn record_ref() -> RecordRef {
        RecordRef::of::<Self>()
    }

    /// The cached compiled codec for this record.
    fn codec() -> Result<Arc<CompiledCodec>, SynthesisError> {
        registry::get_or_build(&Self::record_ref())
    }
}

/// Per-record hooks. Both default to the identity, except that the default
/// post-encode hook applies `omit_null_fields`.
///
/// Derived records use these when declared with `#[record(hooks)]`.
pub trait RecordHooks {
    fn pre_decode(tree: TreeValue) -> TreeValue {
        tree
    }

    fn post_encode(map: TreeMap, omit_null_fields: bool) -> TreeMap {
        default_post_encode(map, omit_null_fields)
    }
}

/// An enumeration whose members carry underlying values.
pub trait EnumType: Sized + 'static {
    fn enum_ref() -> EnumRef;

    fn to_member(&self) -> EnumMember;

    fn from_member(member: &EnumMember) -> Option<Self>;
}

/// A type that serializes itself to and from a tree value.
///
/// ```rust
/// use dictcodec::{serializable_field, SerializableType, TreeValue, ValueError};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Celsius(f64);
///
/// impl SerializableType for Celsius {
///     const NAME: &'static str = "Celsius";
///
///     fn serialize(&self) -> Result<TreeValue, ValueError> {
///         Ok(TreeValue::Text(format!("{}C", self.0)))
///     }
///
///     fn deserialize(tree: &TreeValue) -> Result<Self, ValueError> {
///         tree.as_str()
///             .and_then(|text| text.strip_suffix('C'))
///             .and_then(|number| number.parse().ok())
///             .map(Celsius)
///             .ok_or_else(|| ValueError::invalid("Celsius", tree))
///     }
/// }
///
/// serializable_field!(Celsius);
/// ```
pub trait SerializableType: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    const NAME: &'static str;

    fn serialize(&self) -> Result<TreeValue, ValueError>;

    fn deserialize(tree: &TreeValue) -> Result<Self, ValueError>;
}

/// Implement [`FieldType`] for types implementing [`SerializableType`].
#[macro_export]
macro_rules! serializable_field {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::FieldType for $ty {
                fn type_expr() -> $crate::TypeExpr {
                    $crate::TypeExpr::serializable::<$ty>()
                }

                fn to_value(&self) -> $crate::Value {
                    $crate::Value::Custom($crate::CustomValue::new(::std::clone::Clone::clone(self)))
                }

                fn from_value(value: $crate::Value) -> ::std::result::Result<Self, $crate::ValueError> {
                    $crate::CustomValue::take::<$ty>(value)
                }
            }
        )+
    };
}

/// Remove a field from a decoded record value and convert it to `T`.
pub fn take_field<T: FieldType>(record: &mut RecordValue, name: &str) -> Result<T, ConversionError> {
    let owner = record.record().name().to_owned();
    let value = record
        .take(name)
        .ok_or_else(|| ConversionError::MissingRequiredField {
            field: name.to_owned(),
            type_name: T::type_expr().to_string(),
            owner: owner.clone(),
        })?;
    let raw = value.to_tree();
    T::from_value(value).map_err(|source| ConversionError::InvalidFieldValue {
        field: name.to_owned(),
        type_name: T::type_expr().to_string(),
        raw,
        owner,
        source,
    })
}

/// [`FieldType::from_value`] for record types.
pub fn record_from_value<T: Record>(value: Value) -> Result<T, ValueError> {
    match value {
        Value::Record(record) => T::from_record(record).map_err(ValueError::nested),
        other => Err(ValueError::type_mismatch(T::NAME, &other)),
    }
}

/// [`FieldType::from_value`] for enumerations.
pub fn enum_from_value<T: EnumType>(value: Value) -> Result<T, ValueError> {
    match &value {
        Value::Enum(member) => T::from_member(member).ok_or_else(|| {
            ValueError::lookup(format!(
                "{}.{} is not a member of {}",
                member.enum_name,
                member.name,
                T::enum_ref().name()
            ))
        }),
        other => Err(ValueError::type_mismatch(T::enum_ref().name(), other)),
    }
}

macro_rules! impl_field_type {
    ($($ty:ty => $expr:expr, $variant:ident);* $(;)?) => {
        $(
            impl FieldType for $ty {
                fn type_expr() -> TypeExpr {
                    $expr
                }

                fn to_value(&self) -> Value {
                    Value::$variant(Clone::clone(self))
                }

                fn from_value(value: Value) -> Result<Self, ValueError> {
                    match value {
                        Value::$variant(inner) => Ok(inner),
                        other => Err(ValueError::type_mismatch(Self::type_expr(), &other)),
                    }
                }
            }
        )*
    };
}

impl_field_type! {
    bool => TypeExpr::Bool, Bool;
    String => TypeExpr::Str, Text;
    PathBuf => TypeExpr::Path, Path;
    NaiveDate => TypeExpr::Date, Date;
    NaiveTime => TypeExpr::Time, Time;
    TimeDelta => TypeExpr::TimeDelta, Duration;
    FixedOffset => TypeExpr::TimeZone, TimeZone;
    Uuid => TypeExpr::Uuid, Uuid;
    Decimal => TypeExpr::Decimal, Decimal;
    Rational64 => TypeExpr::Fraction, Fraction;
}

macro_rules! impl_field_type_for_int {
    ($($ty:ty),*) => {
        $(
            impl FieldType for $ty {
                fn type_expr() -> TypeExpr {
                    TypeExpr::Int
                }

                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }

                fn from_value(value: Value) -> Result<Self, ValueError> {
                    match value {
                        Value::Int(number) => <$ty>::try_from(number)
                            .map_err(|_| ValueError::out_of_range(stringify!($ty), number)),
                        other => Err(ValueError::type_mismatch("int", &other)),
                    }
                }
            }
        )*
    };
}

impl_field_type_for_int!(i8, i16, i32, i64, u8, u16, u32);

impl FieldType for f64 {
    fn type_expr() -> TypeExpr {
        TypeExpr::Float
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(number) => Ok(number),
            Value::Int(number) => Ok(number as f64),
            other => Err(ValueError::type_mismatch("float", &other)),
        }
    }
}

impl FieldType for f32 {
    fn type_expr() -> TypeExpr {
        TypeExpr::Float
    }

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        f64::from_value(value).map(|number| number as f32)
    }
}

impl FieldType for Value {
    fn type_expr() -> TypeExpr {
        TypeExpr::Any
    }

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        Ok(value)
    }
}

impl<T: FieldType> FieldType for Option<T> {
    fn type_expr() -> TypeExpr {
        TypeExpr::optional(T::type_expr())
    }

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FieldType> FieldType for Box<T> {
    fn type_expr() -> TypeExpr {
        T::type_expr()
    }

    fn to_value(&self) -> Value {
        self.as_ref().to_value()
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        T::from_value(value).map(Box::new)
    }
}

impl<T: FieldType> FieldType for Arc<T> {
    fn type_expr() -> TypeExpr {
        T::type_expr()
    }

    fn to_value(&self) -> Value {
        self.as_ref().to_value()
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        T::from_value(value).map(Arc::new)
    }
}

fn items(value: Value, expected: &str) -> Result<Vec<Value>, ValueError> {
    match value {
        Value::List(items) | Value::Set(items) | Value::FrozenSet(items) => Ok(items),
        other => Err(ValueError::type_mismatch(expected, &other)),
    }
}

fn entries(value: Value) -> Result<ValueMap, ValueError> {
    match value {
        Value::Map(map) => Ok(map),
        other => Err(ValueError::type_mismatch("dict", &other)),
    }
}

macro_rules! impl_field_type_for_seq {
    ($($ty:ident<T $(: $bound:path)?> => $ctor:ident, $variant:ident);* $(;)?) => {
        $(
            impl<T: FieldType $(+ $bound)?> FieldType for $ty<T> {
                fn type_expr() -> TypeExpr {
                    TypeExpr::$ctor(T::type_expr())
                }

                fn to_value(&self) -> Value {
                    Value::$variant(self.iter().map(FieldType::to_value).collect())
                }

                fn from_value(value: Value) -> Result<Self, ValueError> {
                    items(value, stringify!($ctor))?
                        .into_iter()
                        .map(T::from_value)
                        .collect()
                }
            }
        )*
    };
}

impl_field_type_for_seq! {
    Vec<T> => list, List;
    VecDeque<T> => deque, List;
    BTreeSet<T: Ord> => set, Set;
}

impl<T: FieldType + Eq + Hash> FieldType for HashSet<T> {
    fn type_expr() -> TypeExpr {
        TypeExpr::set(T::type_expr())
    }

    fn to_value(&self) -> Value {
        Value::Set(self.iter().map(FieldType::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        items(value, "set")?.into_iter().map(T::from_value).collect()
    }
}

macro_rules! impl_field_type_for_map {
    ($($ty:ident<K: $($bound:path),+>);* $(;)?) => {
        $(
            impl<K: FieldType $(+ $bound)+, V: FieldType> FieldType for $ty<K, V> {
                fn type_expr() -> TypeExpr {
                    TypeExpr::dict(K::type_expr(), V::type_expr())
                }

                fn to_value(&self) -> Value {
                    Value::Map(
                        self.iter()
                            .map(|(key, value)| (key.to_value(), value.to_value()))
                            .collect(),
                    )
                }

                fn from_value(value: Value) -> Result<Self, ValueError> {
                    entries(value)?
                        .into_iter()
                        .map(|(key, value)| Ok((K::from_value(key)?, V::from_value(value)?)))
                        .collect()
                }
            }
        )*
    };
}

impl_field_type_for_map! {
    HashMap<K: Eq, Hash>;
    BTreeMap<K: Ord>;
    IndexMap<K: Eq, Hash>;
}

impl FieldType for NaiveDateTime {
    fn type_expr() -> TypeExpr {
        TypeExpr::DateTime
    }

    fn to_value(&self) -> Value {
        Value::DateTime(DateTimeValue::Naive(*self))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::DateTime(DateTimeValue::Naive(datetime)) => Ok(datetime),
            other => Err(ValueError::type_mismatch("naive datetime", &other)),
        }
    }
}

impl FieldType for DateTime<FixedOffset> {
    fn type_expr() -> TypeExpr {
        TypeExpr::DateTime
    }

    fn to_value(&self) -> Value {
        Value::DateTime(DateTimeValue::Aware(*self))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::DateTime(DateTimeValue::Aware(datetime)) => Ok(datetime),
            other => Err(ValueError::type_mismatch("aware datetime", &other)),
        }
    }
}

impl FieldType for DateTime<Utc> {
    fn type_expr() -> TypeExpr {
        TypeExpr::DateTime
    }

    fn to_value(&self) -> Value {
        Value::DateTime(DateTimeValue::Aware(self.with_timezone(&Utc.fix())))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        DateTime::<FixedOffset>::from_value(value).map(|datetime| datetime.with_timezone(&Utc))
    }
}

/// A byte string. `Vec<u8>` is a list of integers; this is bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteString(pub Vec<u8>);

impl Deref for ByteString {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for ByteString {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl FieldType for ByteString {
    fn type_expr() -> TypeExpr {
        TypeExpr::Bytes
    }

    fn to_value(&self) -> Value {
        Value::Bytes(self.0.clone())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bytes(bytes) => Ok(Self(bytes)),
            other => Err(ValueError::type_mismatch("bytes", &other)),
        }
    }
}

/// An immutable set, converted as a frozen set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FrozenSet<T: Ord>(pub BTreeSet<T>);

impl<T: Ord> FromIterator<T> for FrozenSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T: Ord> Deref for FrozenSet<T> {
    type Target = BTreeSet<T>;

    fn deref(&self) -> &BTreeSet<T> {
        &self.0
    }
}

impl<T: FieldType + Ord> FieldType for FrozenSet<T> {
    fn type_expr() -> TypeExpr {
        TypeExpr::frozen_set(T::type_expr())
    }

    fn to_value(&self) -> Value {
        Value::frozen_set(self.0.iter().map(FieldType::to_value))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        items(value, "frozenset")?.into_iter().map(T::from_value).collect()
    }
}

/// Layered mappings. Lookups search the layers in order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainMap<K: Eq + Hash, V>(pub Vec<IndexMap<K, V>>);

impl<K: Eq + Hash, V> Default for ChainMap<K, V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<K: Eq + Hash, V> ChainMap<K, V> {
    pub fn new(layers: Vec<IndexMap<K, V>>) -> Self {
        Self(layers)
    }

    /// The value of `key` in the first layer that has it.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.0.iter().find_map(|layer| layer.get(key))
    }

    pub fn layers(&self) -> &[IndexMap<K, V>] {
        &self.0
    }
}

impl<K: FieldType + Eq + Hash, V: FieldType> FieldType for ChainMap<K, V> {
    fn type_expr() -> TypeExpr {
        TypeExpr::chain_map(K::type_expr(), V::type_expr())
    }

    fn to_value(&self) -> Value {
        Value::ChainMap(
            self.0
                .iter()
                .map(|layer| {
                    layer
                        .iter()
                        .map(|(key, value)| (key.to_value(), value.to_value()))
                        .collect::<ValueMap>()
                })
                .collect(),
        )
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::ChainMap(layers) => layers
                .into_iter()
                .map(|layer| {
                    layer
                        .into_iter()
                        .map(|(key, value)| Ok((K::from_value(key)?, V::from_value(value)?)))
                        .collect::<Result<IndexMap<K, V>, ValueError>>()
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self),
            other => Err(ValueError::type_mismatch("chainmap", &other)),
        }
    }
}

macro_rules! one_of {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub enum $name<$($variant),+> {
            $($variant($variant)),+
        }

        impl<$($variant: FieldType),+> FieldType for $name<$($variant),+> {
            fn type_expr() -> TypeExpr {
                TypeExpr::union([$($variant::type_expr()),+])
            }

            fn to_value(&self) -> Value {
                match self {
                    $(Self::$variant(inner) => inner.to_value()),+
                }
            }

            fn from_value(value: Value) -> Result<Self, ValueError> {
                $(
                    if let Ok(inner) = $variant::from_value(value.clone()) {
                        return Ok(Self::$variant(inner));
                    }
                )+
                Err(ValueError::type_mismatch(Self::type_expr(), &value))
            }
        }
    };
}

one_of! {
    /// A field holding one of two types, tried in order.
    OneOf2 { A, B }
}

one_of! {
    /// A field holding one of three types, tried in order.
    OneOf3 { A, B, C }
}
