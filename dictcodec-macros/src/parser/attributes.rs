//! Attribute parsing using darling.
//!
//! This module defines the attribute structures for `#[record(...)]` on
//! structs and their fields, and `#[enumeration(...)]` on enums and their
//! variants.

use darling::util::Override;
use darling::{FromDeriveInput, FromField, FromMeta, FromVariant};
use syn::{Generics, Ident, Lit, Path, Type};

/// Container-level attributes parsed from `#[record(...)]` on a struct.
#[derive(Debug, Clone, FromDeriveInput)]
#[darling(attributes(record), supports(struct_named))]
pub struct RecordAttrs {
    pub ident: Ident,

    pub generics: Generics,

    /// Record identity; defaults to the module path plus the type name
    #[darling(default)]
    pub name: Option<String>,

    /// Derive wire keys from field names with a case convention
    #[darling(default)]
    pub rename_all: Option<RenameRule>,

    /// Base records, flattened in order. Inherited fields must be redeclared
    #[darling(default, multiple)]
    pub extends: Vec<Path>,

    /// Use the type's `RecordHooks` implementation
    #[darling(default)]
    pub hooks: bool,
}

/// Field-level attributes parsed from `#[record(...)]` on struct fields.
#[derive(Debug, Clone, FromField)]
#[darling(attributes(record))]
pub struct FieldAttrs {
    pub ident: Option<Ident>,

    pub ty: Type,

    /// Wire key for this field
    #[darling(default)]
    pub rename: Option<String>,

    /// `default` uses `Default::default()`, `default = "expr"` uses `expr`
    #[darling(default)]
    pub default: Option<Override<String>>,

    /// Class-level field: declared but never converted
    #[darling(default)]
    pub skip: bool,

    /// Strategy expression the field converts through
    #[darling(default)]
    pub with: Option<String>,
}

impl FieldAttrs {
    /// The wire key for a field named `name`.
    pub fn key(&self, name: &str, rename_rule: Option<RenameRule>) -> String {
        if let Some(ref key) = self.rename {
            return key.clone();
        }
        match rename_rule {
            Some(rule) => rule.apply(name),
            None => name.to_string(),
        }
    }
}

/// Container-level attributes parsed from `#[enumeration(...)]` on an enum.
#[derive(Debug, Clone, FromDeriveInput)]
#[darling(attributes(enumeration), supports(enum_unit))]
pub struct EnumerationAttrs {
    pub ident: Ident,

    pub generics: Generics,

    /// Enumeration name; defaults to the type name
    #[darling(default)]
    pub name: Option<String>,

    /// Derive member values from variant names when no value is given
    #[darling(default)]
    pub rename_all: Option<RenameRule>,
}

/// Variant-level attributes parsed from `#[enumeration(...)]`.
#[derive(Debug, Clone, FromVariant)]
#[darling(attributes(enumeration))]
pub struct VariantAttrs {
    pub ident: Ident,

    /// Underlying member value: a string, integer, float or bool literal
    #[darling(default)]
    pub value: Option<Lit>,
}

/// Rename rule for field keys and member values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromMeta)]
pub enum RenameRule {
    /// camelCase
    #[darling(rename = "camelCase")]
    CamelCase,

    /// snake_case
    #[darling(rename = "snake_case")]
    SnakeCase,

    /// PascalCase
    #[darling(rename = "PascalCase")]
    PascalCase,

    /// SCREAMING_SNAKE_CASE
    #[darling(rename = "SCREAMING_SNAKE_CASE")]
    ScreamingSnakeCase,

    /// kebab-case
    #[darling(rename = "kebab-case")]
    KebabCase,

    /// lowercase
    #[darling(rename = "lowercase")]
    LowerCase,
}

impl RenameRule {
    pub fn apply(&self, name: &str) -> String {
        use convert_case::{Case, Casing};

        match self {
            RenameRule::CamelCase => name.to_case(Case::Camel),
            RenameRule::SnakeCase => name.to_case(Case::Snake),
            RenameRule::PascalCase => name.to_case(Case::Pascal),
            RenameRule::ScreamingSnakeCase => name.to_case(Case::UpperSnake),
            RenameRule::KebabCase => name.to_case(Case::Kebab),
            RenameRule::LowerCase => name.to_lowercase(),
        }
    }
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_identifier() -> impl Strategy<Value = String> {
        proptest::collection::vec("[a-z]{1,10}", 1..=3).prop_map(|words| words.join("_"))
    }

    fn arb_rename_rule() -> impl Strategy<Value = RenameRule> {
        prop_oneof![
            Just(RenameRule::CamelCase),
            Just(RenameRule::SnakeCase),
            Just(RenameRule::PascalCase),
            Just(RenameRule::ScreamingSnakeCase),
            Just(RenameRule::KebabCase),
            Just(RenameRule::LowerCase),
        ]
    }

    proptest! {
        /// Renamed keys are never empty and are stable across calls.
        #[test]
        fn prop_rename_is_deterministic_and_non_empty(
            name in arb_identifier(),
            rule in arb_rename_rule()
        ) {
            let first = rule.apply(&name);
            prop_assert!(!first.is_empty());
            prop_assert_eq!(first, rule.apply(&name));
        }

        /// snake_case input survives a snake_case rename untouched.
        #[test]
        fn prop_snake_case_is_identity_on_snake_input(name in arb_identifier()) {
            prop_assert_eq!(RenameRule::SnakeCase.apply(&name), name);
        }
    }
}
