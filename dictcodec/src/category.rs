//! Type resolver: classifies declared types into a closed set of categories.
//!
//! Classification is a single match over [`TypeExpr`], so there is no
//! probing order to get wrong. Container parameters are classified
//! recursively; every failure is a [`SynthesisError`] raised once, when the
//! record's codec is built.

use std::fmt;

use crate::error::SynthesisError;
use crate::types::{
    CollectionKind, EnumRef, MappingKind, RecordRef, SerializableRef, StrategyRef, TypeExpr,
};
use crate::value::Value;

/// Which datetime-like type a [`TypeCategory::DateTime`] stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    DateTime,
    Date,
    Time,
}

/// The closed set of conversion strategies.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeCategory {
    Any,
    Optional(Box<TypeCategory>),
    Union(Vec<TypeCategory>),
    Boolean,
    NullType,
    Text,
    Integer,
    FloatingPoint,
    Bytes,
    /// List, tuple, deque or generic sequence; the kind is kept for messages.
    Sequence(CollectionKind, Box<TypeCategory>),
    Set(Box<TypeCategory>),
    FrozenSet(Box<TypeCategory>),
    ChainMapping(Box<TypeCategory>, Box<TypeCategory>),
    Mapping(Box<TypeCategory>, Box<TypeCategory>),
    PathLike,
    Enum(EnumRef),
    DateTime(TemporalKind),
    Duration,
    TimeZone,
    Uuid,
    Decimal,
    Fraction,
    NestedRecord(RecordRef),
    CustomSerializable(SerializableRef),
    StrategyBound(StrategyRef),
}

/// Field and record a type is being classified for, used in errors.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    pub field: &'a str,
    pub owner: &'a str,
}

impl FieldContext<'_> {
    fn unsupported(&self, ty: &TypeExpr, reason: &str) -> SynthesisError {
        SynthesisError::UnsupportedType {
            field: self.field.to_owned(),
            type_name: ty.to_string(),
            owner: self.owner.to_owned(),
            reason: reason.to_owned(),
        }
    }

    fn ambiguous(&self, ty: &TypeExpr, hint: String) -> SynthesisError {
        SynthesisError::AmbiguousContainer {
            field: self.field.to_owned(),
            type_name: ty.to_string(),
            owner: self.owner.to_owned(),
            hint,
        }
    }
}

/// Classify a declared type.
pub fn classify(ty: &TypeExpr, ctx: &FieldContext<'_>) -> Result<TypeCategory, SynthesisError> {
    Ok(match ty {
        TypeExpr::Record(record) => TypeCategory::NestedRecord(record.clone()),
        TypeExpr::Serializable(custom) => TypeCategory::CustomSerializable(*custom),
        TypeExpr::Strategy(strategy) => TypeCategory::StrategyBound(strategy.clone()),
        TypeExpr::Any => TypeCategory::Any,
        TypeExpr::Union(arms) => classify_union(ty, arms, ctx)?,
        TypeExpr::AnyStr => {
            return Err(ctx.unsupported(ty, "the AnyStr placeholder has no concrete representation"))
        }
        TypeExpr::TypeVar(_) => return Err(ctx.unsupported(ty, "unbound type variable")),
        TypeExpr::Bool => TypeCategory::Boolean,
        TypeExpr::NoneType => TypeCategory::NullType,
        TypeExpr::Str => TypeCategory::Text,
        TypeExpr::Collection(kind, None) => {
            return Err(ctx.ambiguous(ty, format!("use {}<T> instead", kind.as_str())))
        }
        TypeExpr::Collection(kind, Some(element)) => {
            let element = Box::new(classify(element, ctx)?);
            match kind {
                CollectionKind::Set => TypeCategory::Set(element),
                CollectionKind::FrozenSet => TypeCategory::FrozenSet(element),
                _ => TypeCategory::Sequence(*kind, element),
            }
        }
        TypeExpr::Mapping(kind, None) => {
            return Err(ctx.ambiguous(ty, format!("use {}<K, V> instead", kind.as_str())))
        }
        TypeExpr::Mapping(kind, Some(params)) => {
            let key = classify(&params.0, ctx)?;
            if key.is_record_like() {
                return Err(SynthesisError::UnsupportedContainerKey {
                    field: ctx.field.to_owned(),
                    type_name: ty.to_string(),
                    owner: ctx.owner.to_owned(),
                });
            }
            let value = classify(&params.1, ctx)?;
            match kind {
                MappingKind::ChainMap => TypeCategory::ChainMapping(Box::new(key), Box::new(value)),
                MappingKind::Dict | MappingKind::Mapping => {
                    TypeCategory::Mapping(Box::new(key), Box::new(value))
                }
            }
        }
        TypeExpr::Bytes | TypeExpr::ByteArray => TypeCategory::Bytes,
        TypeExpr::Path => TypeCategory::PathLike,
        TypeExpr::Enum(decl) => TypeCategory::Enum(decl.clone()),
        TypeExpr::Int => TypeCategory::Integer,
        TypeExpr::Float => TypeCategory::FloatingPoint,
        TypeExpr::DateTime => TypeCategory::DateTime(TemporalKind::DateTime),
        TypeExpr::Date => TypeCategory::DateTime(TemporalKind::Date),
        TypeExpr::Time => TypeCategory::DateTime(TemporalKind::Time),
        TypeExpr::TimeDelta => TypeCategory::Duration,
        TypeExpr::TimeZone => TypeCategory::TimeZone,
        TypeExpr::Uuid => TypeCategory::Uuid,
        TypeExpr::Decimal => TypeCategory::Decimal,
        TypeExpr::Fraction => TypeCategory::Fraction,
        TypeExpr::Opaque(_) => return Err(ctx.unsupported(ty, "no conversion strategy applies")),
    })
}

fn classify_union(
    ty: &TypeExpr,
    arms: &[TypeExpr],
    ctx: &FieldContext<'_>,
) -> Result<TypeCategory, SynthesisError> {
    match arms {
        [] => Err(ctx.unsupported(ty, "union without arms")),
        [only] => classify(only, ctx),
        [first, TypeExpr::NoneType] => Ok(TypeCategory::Optional(Box::new(classify(first, ctx)?))),
        _ => arms
            .iter()
            .map(|arm| classify(arm, ctx))
            .collect::<Result<_, _>>()
            .map(TypeCategory::Union),
    }
}

impl TypeCategory {
    fn is_record_like(&self) -> bool {
        match self {
            Self::NestedRecord(_) => true,
            Self::Optional(inner) => inner.is_record_like(),
            Self::Union(arms) => arms.iter().any(Self::is_record_like),
            _ => false,
        }
    }

    /// Shallow runtime check: could `value` be an instance of this category?
    ///
    /// Container contents are not inspected.
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any, _) | (Self::StrategyBound(_), _) => true,
            (Self::Optional(inner), value) => value.is_null() || inner.admits(value),
            (Self::Union(arms), value) => arms.iter().any(|arm| arm.admits(value)),
            (Self::Boolean, Value::Bool(_))
            | (Self::NullType, Value::Null)
            | (Self::Text, Value::Text(_))
            | (Self::Integer, Value::Int(_))
            | (Self::FloatingPoint, Value::Float(_))
            | (Self::Bytes, Value::Bytes(_))
            | (Self::Sequence(..), Value::List(_))
            | (Self::Set(_), Value::Set(_))
            | (Self::FrozenSet(_), Value::FrozenSet(_))
            | (Self::ChainMapping(..), Value::ChainMap(_))
            | (Self::Mapping(..), Value::Map(_))
            | (Self::PathLike, Value::Path(_))
            | (Self::Duration, Value::Duration(_))
            | (Self::TimeZone, Value::TimeZone(_))
            | (Self::Uuid, Value::Uuid(_))
            | (Self::Decimal, Value::Decimal(_))
            | (Self::Fraction, Value::Fraction(_)) => true,
            (Self::DateTime(TemporalKind::DateTime), Value::DateTime(_))
            | (Self::DateTime(TemporalKind::Date), Value::Date(_))
            | (Self::DateTime(TemporalKind::Time), Value::Time(_)) => true,
            (Self::Enum(decl), Value::Enum(member)) => decl.contains(member),
            (Self::NestedRecord(record), Value::Record(value)) => {
                value.record().is_subtype_of(record)
            }
            (Self::CustomSerializable(custom), Value::Custom(value)) => {
                value.type_name() == custom.name()
            }
            _ => false,
        }
    }
}

impl fmt::Display for TypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Optional(inner) => write!(f, "optional<{inner}>"),
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
            Self::Boolean => f.write_str("bool"),
            Self::NullType => f.write_str("none"),
            Self::Text => f.write_str("str"),
            Self::Integer => f.write_str("int"),
            Self::FloatingPoint => f.write_str("float"),
            Self::Bytes => f.write_str("bytes"),
            Self::Sequence(kind, element) => write!(f, "{}<{element}>", kind.as_str()),
            Self::Set(element) => write!(f, "set<{element}>"),
            Self::FrozenSet(element) => write!(f, "frozenset<{element}>"),
            Self::ChainMapping(key, value) => write!(f, "chainmap<{key}, {value}>"),
            Self::Mapping(key, value) => write!(f, "dict<{key}, {value}>"),
            Self::PathLike => f.write_str("path"),
            Self::Enum(decl) => f.write_str(decl.name()),
            Self::DateTime(TemporalKind::DateTime) => f.write_str("datetime"),
            Self::DateTime(TemporalKind::Date) => f.write_str("date"),
            Self::DateTime(TemporalKind::Time) => f.write_str("time"),
            Self::Duration => f.write_str("duration"),
            Self::TimeZone => f.write_str("timezone"),
            Self::Uuid => f.write_str("uuid"),
            Self::Decimal => f.write_str("decimal"),
            Self::Fraction => f.write_str("fraction"),
            Self::NestedRecord(record) => f.write_str(record.name()),
            Self::CustomSerializable(custom) => f.write_str(custom.name()),
            Self::StrategyBound(strategy) => f.write_str(strategy.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RecordDecl;
    use crate::types::EnumDecl;

    const CTX: FieldContext<'static> = FieldContext {
        field: "f",
        owner: "Owner",
    };

    fn shape() -> RecordRef {
        RecordRef::from(RecordDecl::new("Shape"))
    }

    #[test]
    fn test_optional_is_two_armed_union_with_none_last() {
        assert_eq!(
            classify(&TypeExpr::optional(TypeExpr::Int), &CTX).unwrap(),
            TypeCategory::Optional(Box::new(TypeCategory::Integer))
        );
        assert_eq!(
            classify(&TypeExpr::union([TypeExpr::NoneType, TypeExpr::Int]), &CTX).unwrap(),
            TypeCategory::Union(vec![TypeCategory::NullType, TypeCategory::Integer])
        );
        assert_eq!(
            classify(&TypeExpr::union([TypeExpr::Str]), &CTX).unwrap(),
            TypeCategory::Text
        );
    }

    #[test]
    fn test_parameters_are_classified_recursively() {
        let ty = TypeExpr::list(TypeExpr::union([TypeExpr::Str, TypeExpr::Record(shape())]));
        assert_eq!(
            classify(&ty, &CTX).unwrap(),
            TypeCategory::Sequence(
                CollectionKind::List,
                Box::new(TypeCategory::Union(vec![
                    TypeCategory::Text,
                    TypeCategory::NestedRecord(shape()),
                ]))
            )
        );
        assert_eq!(
            classify(&TypeExpr::frozen_set(TypeExpr::Bytes), &CTX).unwrap(),
            TypeCategory::FrozenSet(Box::new(TypeCategory::Bytes))
        );
    }

    #[test]
    fn test_placeholders_are_unsupported() {
        for ty in [
            TypeExpr::AnyStr,
            TypeExpr::TypeVar("T".into()),
            TypeExpr::Opaque("socket".into()),
            TypeExpr::list(TypeExpr::AnyStr),
        ] {
            let err = classify(&ty, &CTX).unwrap_err();
            assert!(
                matches!(err, SynthesisError::UnsupportedType { .. }),
                "{ty} should be unsupported"
            );
        }
    }

    #[test]
    fn test_bare_containers_are_ambiguous() {
        let err = classify(&TypeExpr::Mapping(MappingKind::Dict, None), &CTX).unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @"field 'f' of Owner uses bare container dict: use dict<K, V> instead"
        );
    }

    #[test]
    fn test_record_keys_are_rejected() {
        for ty in [
            TypeExpr::dict(TypeExpr::Record(shape()), TypeExpr::Int),
            TypeExpr::chain_map(TypeExpr::optional(TypeExpr::Record(shape())), TypeExpr::Int),
        ] {
            let err = classify(&ty, &CTX).unwrap_err();
            assert!(matches!(err, SynthesisError::UnsupportedContainerKey { .. }));
        }
        assert!(classify(&TypeExpr::dict(TypeExpr::Str, TypeExpr::Record(shape())), &CTX).is_ok());
    }

    #[test]
    fn test_admits_is_shallow_and_strict() {
        assert!(TypeCategory::Integer.admits(&Value::Int(1)));
        assert!(!TypeCategory::Integer.admits(&Value::Bool(true)));
        assert!(!TypeCategory::FloatingPoint.admits(&Value::Int(1)));
        assert!(TypeCategory::Sequence(CollectionKind::List, Box::new(TypeCategory::Integer))
            .admits(&Value::list([Value::text("not checked")])));

        let color = EnumRef::new(EnumDecl::new("Color").member("RED", 1));
        let red = color.member_named("RED").unwrap();
        assert!(TypeCategory::Enum(color).admits(&Value::Enum(red)));
    }
}
