//! # dictcodec-macros
//!
//! Derive macros for the `dictcodec` crate.
//!
//! `#[derive(Record)]` declares a struct as a record: its fields, wire keys,
//! defaults, bases and hooks. `#[derive(Enumeration)]` declares a unit enum
//! whose members carry underlying values.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dictcodec::{Enumeration, Record};
//!
//! #[derive(Enumeration, Clone, Copy, Debug, PartialEq)]
//! #[enumeration(rename_all = "lowercase")]
//! enum Kind {
//!     Triangle,
//!     Square,
//! }
//!
//! #[derive(Record, Debug, PartialEq)]
//! #[record(rename_all = "camelCase")]
//! struct Shape {
//!     kind: Kind,
//!     #[record(default = "4")]
//!     num_corners: u32,
//! }
//! ```
//!
//! ## Attributes
//!
//! ### Record Container Attributes
//!
//! - `#[record(name = "Name")]` - Record identity (default: module path and type name)
//! - `#[record(rename_all = "camelCase")]` - Wire keys follow a naming convention
//! - `#[record(extends = "Base")]` - Inherit from another record; may repeat.
//!   The struct must redeclare every inherited field it serializes, otherwise
//!   building the codec fails
//! - `#[record(hooks)]` - Use the type's `RecordHooks` implementation
//!
//! ### Record Field Attributes
//!
//! - `#[record(rename = "key")]` - Wire key for this field
//! - `#[record(default)]` - Default to `Default::default()` when absent
//! - `#[record(default = "expr")]` - Default to `expr` when absent
//! - `#[record(skip)]` - Class-level field, never converted
//! - `#[record(with = "expr")]` - Convert through a serialization strategy
//!
//! ### Enumeration Attributes
//!
//! - `#[enumeration(name = "Name")]` - Enumeration name (default: type name)
//! - `#[enumeration(rename_all = "lowercase")]` - Derive member values from variant names
//! - `#[enumeration(value = ...)]` - Member value: string, integer, float or bool

use proc_macro::TokenStream;
use syn::DeriveInput;

mod codegen;
mod error;
mod ir;
mod parser;

use codegen::ImplBlockGenerator;
use parser::enum_parser::EnumParser;
use parser::struct_parser::StructParser;

/// Derive macro declaring a struct as a record.
///
/// # Example
///
/// ```rust,ignore
/// use dictcodec::Record;
///
/// #[derive(Record)]
/// struct User {
///     name: String,
///     age: u32,
/// }
/// ```
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);

    match StructParser::parse(&input) {
        Ok(record) => ImplBlockGenerator::new().generate_record(&record).into(),
        Err(err) => err.into_syn_error().into_compile_error().into(),
    }
}

/// Derive macro declaring a unit enum as an enumeration.
///
/// # Example
///
/// ```rust,ignore
/// use dictcodec::Enumeration;
///
/// #[derive(Enumeration)]
/// enum Level {
///     #[enumeration(value = 1)]
///     Low,
///     #[enumeration(value = 2)]
///     High,
/// }
/// ```
#[proc_macro_derive(Enumeration, attributes(enumeration))]
pub fn derive_enumeration(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);

    match EnumParser::parse(&input) {
        Ok(enumeration) => ImplBlockGenerator::new().generate_enum(&enumeration).into(),
        Err(err) => err.into_syn_error().into_compile_error().into(),
    }
}
