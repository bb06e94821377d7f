//! Enum parsing logic.
//!
//! Only unit variants are supported. Each variant becomes a member whose
//! underlying value is the `value` literal, or the variant name (after
//! `rename_all`) when none is given.

use darling::{FromDeriveInput, FromVariant};
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Lit};

use crate::error::ParseError;
use crate::ir::{EnumIR, MemberValue, VariantIR};
use crate::parser::attributes::{EnumerationAttrs, VariantAttrs};

/// Parses enum definitions into [`EnumIR`].
pub struct EnumParser;

impl EnumParser {
    pub fn parse(input: &DeriveInput) -> Result<EnumIR, ParseError> {
        let attrs = EnumerationAttrs::from_derive_input(input)?;

        if !attrs.generics.params.is_empty() {
            return Err(ParseError::new("Enumeration cannot be derived for generic enums")
                .with_span(attrs.generics.span()));
        }

        let Data::Enum(data) = &input.data else {
            return Err(ParseError::new("Enumeration can only be derived for enums")
                .with_span(input.ident.span()));
        };

        let mut variants = Vec::with_capacity(data.variants.len());
        for variant in &data.variants {
            let variant_attrs = VariantAttrs::from_variant(variant)?;
            let name = variant_attrs.ident.to_string();
            let value = match &variant_attrs.value {
                Some(lit) => member_value(lit)?,
                None => MemberValue::Text(match attrs.rename_all {
                    Some(rule) => rule.apply(&name),
                    None => name.clone(),
                }),
            };
            if variants.iter().any(|v: &VariantIR| v.value == value) {
                return Err(ParseError::new(format!(
                    "variant '{}' repeats the value of an earlier variant",
                    name
                ))
                .with_span(variant.span()));
            }
            variants.push(VariantIR {
                ident: variant_attrs.ident,
                name,
                value,
            });
        }

        Ok(EnumIR {
            name: attrs.name.unwrap_or_else(|| attrs.ident.to_string()),
            ident: attrs.ident,
            variants,
        })
    }
}

fn member_value(lit: &Lit) -> Result<MemberValue, ParseError> {
    let invalid = |error: syn::Error| ParseError::new(error.to_string()).with_span(lit.span());
    match lit {
        Lit::Str(text) => Ok(MemberValue::Text(text.value())),
        Lit::Int(int) => int.base10_parse().map(MemberValue::Int).map_err(invalid),
        Lit::Float(float) => float.base10_parse().map(MemberValue::Float).map_err(invalid),
        Lit::Bool(boolean) => Ok(MemberValue::Bool(boolean.value)),
        _ => Err(ParseError::new("member values must be string, integer, float or bool literals")
            .with_span(lit.span())),
    }
}
