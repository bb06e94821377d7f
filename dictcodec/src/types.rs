//! Declared type expressions.
//!
//! A [`TypeExpr`] is what a field declares, before classification. It is
//! deliberately wider than what the engine accepts: bare containers, the
//! `AnyStr` placeholder, unbound type variables and opaque foreign types can
//! all be written down, and [`classify`](crate::category::classify) rejects them
//! with a [`SynthesisError`](crate::SynthesisError).

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::ValueError;
use crate::schema::RecordDecl;
use crate::traits::{Record, SerializableType};
use crate::tree::TreeValue;
use crate::value::{CustomValue, EnumMember, Value};

/// Ordered single-parameter containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    List,
    Tuple,
    Deque,
    Sequence,
    Set,
    FrozenSet,
}

impl CollectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Tuple => "tuple",
            Self::Deque => "deque",
            Self::Sequence => "sequence",
            Self::Set => "set",
            Self::FrozenSet => "frozenset",
        }
    }
}

/// Key/value containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingKind {
    Dict,
    Mapping,
    ChainMap,
}

impl MappingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dict => "dict",
            Self::Mapping => "mapping",
            Self::ChainMap => "chainmap",
        }
    }
}

/// An unclassified field type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Any,
    Union(Vec<TypeExpr>),
    NoneType,
    Bool,
    Str,
    /// The `AnyStr` placeholder. Never representable.
    AnyStr,
    /// An unbound type variable. Never representable.
    TypeVar(String),
    Int,
    Float,
    Bytes,
    ByteArray,
    Collection(CollectionKind, Option<Box<TypeExpr>>),
    Mapping(MappingKind, Option<Box<(TypeExpr, TypeExpr)>>),
    Path,
    Enum(EnumRef),
    DateTime,
    Date,
    Time,
    TimeDelta,
    TimeZone,
    Uuid,
    Decimal,
    Fraction,
    Record(RecordRef),
    Serializable(SerializableRef),
    Strategy(StrategyRef),
    /// A foreign type the engine knows nothing about.
    Opaque(String),
}

impl TypeExpr {
    /// `optional<T>`: a two-armed union whose second arm is the null type.
    pub fn optional(inner: TypeExpr) -> Self {
        Self::Union(vec![inner, Self::NoneType])
    }

    pub fn union(arms: impl IntoIterator<Item = TypeExpr>) -> Self {
        Self::Union(arms.into_iter().collect())
    }

    pub fn list(element: TypeExpr) -> Self {
        Self::Collection(CollectionKind::List, Some(Box::new(element)))
    }

    pub fn tuple(element: TypeExpr) -> Self {
        Self::Collection(CollectionKind::Tuple, Some(Box::new(element)))
    }

    pub fn deque(element: TypeExpr) -> Self {
        Self::Collection(CollectionKind::Deque, Some(Box::new(element)))
    }

    pub fn set(element: TypeExpr) -> Self {
        Self::Collection(CollectionKind::Set, Some(Box::new(element)))
    }

    pub fn frozen_set(element: TypeExpr) -> Self {
        Self::Collection(CollectionKind::FrozenSet, Some(Box::new(element)))
    }

    pub fn dict(key: TypeExpr, value: TypeExpr) -> Self {
        Self::Mapping(MappingKind::Dict, Some(Box::new((key, value))))
    }

    pub fn chain_map(key: TypeExpr, value: TypeExpr) -> Self {
        Self::Mapping(MappingKind::ChainMap, Some(Box::new((key, value))))
    }

    pub fn record<T: Record>() -> Self {
        Self::Record(RecordRef::of::<T>())
    }

    pub fn serializable<T: SerializableType>() -> Self {
        Self::Serializable(SerializableRef::of::<T>())
    }

    pub fn strategy(strategy: impl SerializationStrategy) -> Self {
        Self::Strategy(StrategyRef::new(strategy))
    }

    /// Record types referenced anywhere inside this expression.
    pub fn record_refs(&self) -> Vec<RecordRef> {
        let mut out = Vec::new();
        self.collect_records(&mut out);
        out
    }

    fn collect_records(&self, out: &mut Vec<RecordRef>) {
        match self {
            Self::Record(record) => out.push(record.clone()),
            Self::Union(arms) => arms.iter().for_each(|arm| arm.collect_records(out)),
            Self::Collection(_, Some(element)) => element.collect_records(out),
            Self::Mapping(_, Some(params)) => {
                params.0.collect_records(out);
                params.1.collect_records(out);
            }
            _ => {}
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Union(arms) if arms.len() == 2 && arms[1] == Self::NoneType => {
                write!(f, "optional<{}>", arms[0])
            }
            Self::Union(arms) => {
                f.write_str("union<")?;
                for (i, arm) in arms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arm}")?;
                }
                f.write_str(">")
            }
            Self::NoneType => f.write_str("none"),
            Self::Bool => f.write_str("bool"),
            Self::Str => f.write_str("str"),
            Self::AnyStr => f.write_str("AnyStr"),
            Self::TypeVar(name) => f.write_str(name),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Bytes => f.write_str("bytes"),
            Self::ByteArray => f.write_str("bytearray"),
            Self::Collection(kind, None) => f.write_str(kind.as_str()),
            Self::Collection(kind, Some(element)) => write!(f, "{}<{element}>", kind.as_str()),
            Self::Mapping(kind, None) => f.write_str(kind.as_str()),
            Self::Mapping(kind, Some(params)) => {
                write!(f, "{}<{}, {}>", kind.as_str(), params.0, params.1)
            }
            Self::Path => f.write_str("path"),
            Self::Enum(decl) => f.write_str(decl.name()),
            Self::DateTime => f.write_str("datetime"),
            Self::Date => f.write_str("date"),
            Self::Time => f.write_str("time"),
            Self::TimeDelta => f.write_str("duration"),
            Self::TimeZone => f.write_str("timezone"),
            Self::Uuid => f.write_str("uuid"),
            Self::Decimal => f.write_str("decimal"),
            Self::Fraction => f.write_str("fraction"),
            Self::Record(record) => f.write_str(record.name()),
            Self::Serializable(custom) => f.write_str(custom.name()),
            Self::Strategy(strategy) => f.write_str(strategy.name()),
            Self::Opaque(name) => f.write_str(name),
        }
    }
}

#[derive(Clone)]
enum RecordSource {
    Deferred(fn() -> Arc<RecordDecl>),
    Declared(Arc<RecordDecl>),
}

/// A lazily resolved reference to a record declaration.
///
/// Typed records are referenced through their declaration function, so a
/// record may refer to itself (directly or through other records) without the
/// declaration being built recursively.
#[derive(Clone)]
pub struct RecordRef {
    name: Arc<str>,
    source: RecordSource,
}

impl RecordRef {
    pub fn of<T: Record>() -> Self {
        Self::deferred(T::NAME, T::declaration)
    }

    pub fn deferred(name: impl Into<Arc<str>>, declaration: fn() -> Arc<RecordDecl>) -> Self {
        Self {
            name: name.into(),
            source: RecordSource::Deferred(declaration),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaration(&self) -> Arc<RecordDecl> {
        match &self.source {
            RecordSource::Deferred(declaration) => declaration(),
            RecordSource::Declared(decl) => Arc::clone(decl),
        }
    }

    /// Whether `self` is `other` or inherits from it.
    pub fn is_subtype_of(&self, other: &RecordRef) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![self.clone()];
        while let Some(current) = stack.pop() {
            if current.name() == other.name() {
                return true;
            }
            if seen.insert(current.name.clone()) {
                stack.extend(current.declaration().bases().iter().cloned());
            }
        }
        false
    }
}

impl From<RecordDecl> for RecordRef {
    fn from(decl: RecordDecl) -> Self {
        Self::from(Arc::new(decl))
    }
}

impl From<Arc<RecordDecl>> for RecordRef {
    fn from(decl: Arc<RecordDecl>) -> Self {
        Self {
            name: Arc::from(decl.name()),
            source: RecordSource::Declared(decl),
        }
    }
}

impl PartialEq for RecordRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for RecordRef {}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordRef").field(&self.name).finish()
    }
}

/// A declared enumeration: its name and ordered members.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    name: Arc<str>,
    members: Vec<(Arc<str>, TreeValue)>,
}

impl EnumDecl {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn member(mut self, name: impl Into<Arc<str>>, value: impl Into<TreeValue>) -> Self {
        self.members.push((name.into(), value.into()));
        self
    }
}

/// Shared handle to an [`EnumDecl`].
#[derive(Debug, Clone)]
pub struct EnumRef(Arc<EnumDecl>);

impl EnumRef {
    pub fn new(decl: EnumDecl) -> Self {
        Self(Arc::new(decl))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn members(&self) -> impl Iterator<Item = EnumMember> + '_ {
        self.0.members.iter().map(|(name, value)| self.build(name, value))
    }

    /// Look up the member whose underlying value equals `value`.
    pub fn member_for_value(&self, value: &TreeValue) -> Result<EnumMember, ValueError> {
        self.0
            .members
            .iter()
            .find(|(_, candidate)| candidate == value)
            .map(|(name, candidate)| self.build(name, candidate))
            .ok_or_else(|| {
                ValueError::lookup(format!("{value} is not a valid {}", self.name()))
            })
    }

    pub fn member_named(&self, name: &str) -> Option<EnumMember> {
        self.0
            .members
            .iter()
            .find(|(candidate, _)| candidate.as_ref() == name)
            .map(|(name, value)| self.build(name, value))
    }

    pub fn contains(&self, member: &EnumMember) -> bool {
        member.enum_name.as_ref() == self.name()
            && self.0.members.iter().any(|(name, _)| *name == member.name)
    }

    fn build(&self, name: &Arc<str>, value: &TreeValue) -> EnumMember {
        EnumMember {
            enum_name: Arc::clone(&self.0.name),
            name: Arc::clone(name),
            value: value.clone(),
        }
    }
}

impl PartialEq for EnumRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.name == other.0.name
    }
}

/// Reference to a type implementing [`SerializableType`].
#[derive(Clone, Copy)]
pub struct SerializableRef {
    name: &'static str,
    deserialize: fn(&TreeValue) -> Result<Value, ValueError>,
}

fn deserialize_custom<T: SerializableType>(tree: &TreeValue) -> Result<Value, ValueError> {
    T::deserialize(tree).map(|value| Value::Custom(CustomValue::new(value)))
}

impl SerializableRef {
    pub fn of<T: SerializableType>() -> Self {
        Self {
            name: T::NAME,
            deserialize: deserialize_custom::<T>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn deserialize(&self, tree: &TreeValue) -> Result<Value, ValueError> {
        (self.deserialize)(tree)
    }
}

impl PartialEq for SerializableRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for SerializableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SerializableRef").field(&self.name).finish()
    }
}

/// An external object that converts a field's values in both directions.
pub trait SerializationStrategy: Send + Sync + 'static {
    /// Name used in error messages.
    fn name(&self) -> &str;

    fn serialize(&self, value: &Value) -> Result<TreeValue, ValueError>;

    fn deserialize(&self, tree: &TreeValue) -> Result<Value, ValueError>;
}

/// Shared handle to a [`SerializationStrategy`].
#[derive(Clone)]
pub struct StrategyRef(Arc<dyn SerializationStrategy>);

impl StrategyRef {
    pub fn new(strategy: impl SerializationStrategy) -> Self {
        Self(Arc::new(strategy))
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn serialize(&self, value: &Value) -> Result<TreeValue, ValueError> {
        self.0.serialize(value)
    }

    pub fn deserialize(&self, tree: &TreeValue) -> Result<Value, ValueError> {
        self.0.deserialize(tree)
    }
}

impl PartialEq for StrategyRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for StrategyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StrategyRef").field(&self.name()).finish()
    }
}
