//! Struct parsing logic.
//!
//! Only named, non-generic structs can derive `Record`: a record's fields
//! are looked up by name, and its declaration is built once per type.

use darling::util::Override;
use darling::{FromDeriveInput, FromField};
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Expr, Fields};

use crate::error::ParseError;
use crate::ir::{DefaultIR, FieldIR, FieldKind, RecordIR};
use crate::parser::attributes::{FieldAttrs, RecordAttrs, RenameRule};

const EXTRA_FIELD: &str = "_extra";

/// Parses struct definitions into [`RecordIR`].
pub struct StructParser;

impl StructParser {
    pub fn parse(input: &DeriveInput) -> Result<RecordIR, ParseError> {
        let attrs = RecordAttrs::from_derive_input(input)?;

        if !attrs.generics.params.is_empty() {
            return Err(ParseError::new("Record cannot be derived for generic structs")
                .with_span(attrs.generics.span())
                .with_suggestion("declare one concrete record per instantiation"));
        }

        let fields = match &input.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(fields) => &fields.named,
                _ => {
                    return Err(ParseError::new("Record requires named fields")
                        .with_span(input.ident.span()))
                }
            },
            _ => {
                return Err(ParseError::new("Record can only be derived for structs")
                    .with_span(input.ident.span()))
            }
        };

        let fields = fields
            .iter()
            .map(|field| Self::parse_field(field, attrs.rename_all))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RecordIR {
            ident: attrs.ident,
            name: attrs.name,
            bases: attrs.extends,
            hooks: attrs.hooks,
            fields,
        })
    }

    fn parse_field(
        field: &syn::Field,
        rename_all: Option<RenameRule>,
    ) -> Result<FieldIR, ParseError> {
        let attrs = FieldAttrs::from_field(field)?;
        let ident = attrs
            .ident
            .clone()
            .ok_or_else(|| ParseError::new("field has no identifier").with_span(field.span()))?;
        let name = ident.unraw().to_string();

        let kind = if attrs.skip {
            FieldKind::ClassLevel
        } else if name.starts_with('_') && name != EXTRA_FIELD {
            FieldKind::Private
        } else {
            FieldKind::Data
        };

        let default = match &attrs.default {
            None => DefaultIR::None,
            Some(Override::Inherit) => DefaultIR::Trait,
            Some(Override::Explicit(source)) => DefaultIR::Expr(parse_expr(source, field)?),
        };

        let strategy = attrs
            .with
            .as_deref()
            .map(|source| parse_expr(source, field))
            .transpose()?;

        if kind != FieldKind::Data && (strategy.is_some() || attrs.rename.is_some()) {
            return Err(ParseError::new(format!(
                "field '{}' is never converted, so `with` and `rename` have no effect",
                name
            ))
            .with_span(field.span()));
        }

        Ok(FieldIR {
            key: attrs.key(&name, rename_all),
            ident,
            name,
            ty: attrs.ty,
            kind,
            default,
            strategy,
        })
    }
}

fn parse_expr(source: &str, field: &syn::Field) -> Result<Expr, ParseError> {
    syn::parse_str(source).map_err(|error| {
        ParseError::new(format!("invalid expression `{}`: {}", source, error))
            .with_span(field.span())
    })
}
