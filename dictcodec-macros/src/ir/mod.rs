//! Intermediate representation.
//!
//! Parsers turn derive input into these structures; the code generator
//! turns them into impl blocks. Everything attribute-related is resolved
//! here, so the generator never looks at attributes.

use syn::{Expr, Ident, Path, Type};

/// A struct deriving `Record`.
#[derive(Debug, Clone)]
pub struct RecordIR {
    pub ident: Ident,
    /// Explicit record name; `None` means module path plus type name
    pub name: Option<String>,
    pub bases: Vec<Path>,
    pub hooks: bool,
    pub fields: Vec<FieldIR>,
}

/// One struct field.
#[derive(Debug, Clone)]
pub struct FieldIR {
    pub ident: Ident,
    /// Field name as declared, without a raw-identifier prefix
    pub name: String,
    pub key: String,
    pub ty: Type,
    pub kind: FieldKind,
    pub default: DefaultIR,
    pub strategy: Option<Expr>,
}

impl FieldIR {
    /// Whether the field takes part in conversion.
    pub fn is_data(&self) -> bool {
        self.kind == FieldKind::Data
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Data,
    /// `#[record(skip)]`
    ClassLevel,
    /// Name starts with `_`
    Private,
}

#[derive(Debug, Clone)]
pub enum DefaultIR {
    None,
    /// `Default::default()` of the field type
    Trait,
    Expr(Expr),
}

/// An enum deriving `Enumeration`.
#[derive(Debug, Clone)]
pub struct EnumIR {
    pub ident: Ident,
    pub name: String,
    pub variants: Vec<VariantIR>,
}

#[derive(Debug, Clone)]
pub struct VariantIR {
    pub ident: Ident,
    pub name: String,
    pub value: MemberValue,
}

/// A member's underlying value.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}
