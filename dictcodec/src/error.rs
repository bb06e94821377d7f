//! Error types for codec synthesis and conversion.
//!
//! Errors come in two tiers:
//!
//! - [`SynthesisError`] is raised while a record's schema and codec are being
//!   built. It is fatal for that record type and never retried.
//! - [`ConversionError`] is raised by `encode`/`decode` calls on an already
//!   compiled codec and always names the field it happened on.
//!
//! [`ValueError`] is the failure of a single value transform. The decoder and
//! encoder wrap it into a field-attributed [`ConversionError`]; the union
//! resolver inspects [`ValueError::is_recoverable`] to decide whether the next
//! variant may be tried.

use thiserror::Error;

use crate::tree::TreeValue;
use crate::value::Value;

/// Failure raised while building a record schema or compiled codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    /// The declared type cannot be represented by any conversion strategy.
    #[error("field '{field}' of {owner} has unsupported type {type_name}: {reason}")]
    UnsupportedType {
        field: String,
        type_name: String,
        owner: String,
        reason: String,
    },

    /// A container type was declared without element/key/value parameters.
    #[error("field '{field}' of {owner} uses bare container {type_name}: {hint}")]
    AmbiguousContainer {
        field: String,
        type_name: String,
        owner: String,
        hint: String,
    },

    /// A record type was used as a mapping or chain-mapping key.
    #[error("field '{field}' of {owner}: record types cannot be used as mapping keys in {type_name}")]
    UnsupportedContainerKey {
        field: String,
        type_name: String,
        owner: String,
    },

    /// The record declaration itself is malformed.
    #[error("record {owner} cannot be introspected: {reason}")]
    Introspection { owner: String, reason: String },
}

/// Failure raised by a compiled codec's `encode` or `decode`.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// A field without a default was absent from the input mapping.
    #[error("field '{field}' of type {type_name} is missing in {owner}")]
    MissingRequiredField {
        field: String,
        type_name: String,
        owner: String,
    },

    /// A present field value could not be decoded into its declared type.
    #[error("field '{field}' of type {type_name} in {owner} has invalid value {raw}: {source}")]
    InvalidFieldValue {
        field: String,
        type_name: String,
        raw: TreeValue,
        owner: String,
        #[source]
        source: ValueError,
    },

    /// No union variant accepted the value.
    #[error("union value for field '{field}' could not be converted using types ({})", .attempted.join(", "))]
    UnionResolutionFailure {
        field: String,
        attempted: Vec<String>,
    },

    /// Encoding failed while handling a field.
    #[error("encoding {owner} failed handling field '{field}': {source}")]
    ConversionFailure {
        field: String,
        owner: String,
        #[source]
        source: ValueError,
    },

    /// Decode input (after the pre-decode hook) was not a mapping.
    #[error("input for {owner} should be a mapping, found {found}")]
    ExpectedMapping { owner: String, found: &'static str },

    /// A record codec needed during conversion could not be synthesized.
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// The tree value could not be rendered as JSON.
    #[error("tree value cannot be represented as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConversionError {
    /// Name of the field the error is attributed to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingRequiredField { field, .. }
            | Self::InvalidFieldValue { field, .. }
            | Self::UnionResolutionFailure { field, .. }
            | Self::ConversionFailure { field, .. } => Some(field),
            Self::ExpectedMapping { .. } | Self::Synthesis(_) | Self::Json(_) => None,
        }
    }
}

/// Failure of a single value transform.
#[derive(Debug, Error)]
pub enum ValueError {
    /// The value has the wrong shape for the expected type.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: &'static str,
    },

    /// The value has the right shape but cannot be parsed or converted.
    #[error("invalid {expected} value: {message}")]
    InvalidValue { expected: String, message: String },

    /// A numeric value does not fit the target type.
    #[error("{value} is out of range for {expected}")]
    OutOfRange { expected: String, value: String },

    /// A lookup (enum member, record attribute) failed.
    #[error("{0}")]
    Lookup(String),

    /// A nested conversion failed.
    #[error(transparent)]
    Nested(Box<ConversionError>),

    /// Raised by user serialize/deserialize code. Never swallowed by union trials.
    #[error("{0}")]
    External(String),
}

impl ValueError {
    pub fn type_mismatch(expected: impl ToString, found: &Value) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            found: found.kind(),
        }
    }

    pub fn tree_mismatch(expected: impl ToString, found: &TreeValue) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            found: found.kind(),
        }
    }

    pub fn invalid(expected: impl ToString, message: impl ToString) -> Self {
        Self::InvalidValue {
            expected: expected.to_string(),
            message: message.to_string(),
        }
    }

    pub fn out_of_range(expected: impl ToString, value: impl ToString) -> Self {
        Self::OutOfRange {
            expected: expected.to_string(),
            value: value.to_string(),
        }
    }

    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup(message.into())
    }

    pub fn external(message: impl Into<String>) -> Self {
        Self::External(message.into())
    }

    pub fn nested(error: ConversionError) -> Self {
        Self::Nested(Box::new(error))
    }

    /// Whether a union trial may swallow this error and try the next variant.
    ///
    /// User-raised errors and synthesis failures of nested records propagate.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::TypeMismatch { .. }
            | Self::InvalidValue { .. }
            | Self::OutOfRange { .. }
            | Self::Lookup(_) => true,
            Self::Nested(inner) => !matches!(
                inner.as_ref(),
                ConversionError::Synthesis(_) | ConversionError::Json(_)
            ),
            Self::External(_) => false,
        }
    }
}

impl From<SynthesisError> for ValueError {
    fn from(error: SynthesisError) -> Self {
        Self::nested(ConversionError::Synthesis(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = ConversionError::MissingRequiredField {
            field: "name".into(),
            type_name: "str".into(),
            owner: "shapes::CustomShape".into(),
        };
        insta::assert_snapshot!(
            err.to_string(),
            @"field 'name' of type str is missing in shapes::CustomShape"
        );
        assert_eq!(err.field(), Some("name"));
    }

    #[test]
    fn test_union_failure_message() {
        let err = ConversionError::UnionResolutionFailure {
            field: "shapes".into(),
            attempted: vec!["str".into(), "CustomShape".into()],
        };
        insta::assert_snapshot!(
            err.to_string(),
            @"union value for field 'shapes' could not be converted using types (str, CustomShape)"
        );
    }

    #[test]
    fn test_ambiguous_container_message() {
        let err = SynthesisError::AmbiguousContainer {
            field: "tags".into(),
            type_name: "list".into(),
            owner: "Post".into(),
            hint: "use list<T> instead".into(),
        };
        insta::assert_snapshot!(
            err.to_string(),
            @"field 'tags' of Post uses bare container list: use list<T> instead"
        );
    }

    #[test]
    fn test_recoverable_kinds() {
        assert!(ValueError::lookup("no member").is_recoverable());
        assert!(ValueError::invalid("int", "four").is_recoverable());
        assert!(!ValueError::external("boom").is_recoverable());

        let nested = ValueError::nested(ConversionError::MissingRequiredField {
            field: "a".into(),
            type_name: "int".into(),
            owner: "R".into(),
        });
        assert!(nested.is_recoverable());

        let synthesis: ValueError = SynthesisError::Introspection {
            owner: "R".into(),
            reason: "inheritance cycle".into(),
        }
        .into();
        assert!(!synthesis.is_recoverable());
    }
}
