//! Record declarations and the field schema extractor.
//!
//! A [`RecordDecl`] is the reflection input for one record type: its name,
//! base records, field declarations and hooks. [`extract`] flattens a record
//! and its ancestry into a [`RecordSchema`]: the ordered list of serialized
//! fields, each classified into a [`TypeCategory`].
//!
//! ## Flattening rules
//!
//! - Ancestors are walked from least to most derived.
//! - A field redeclared in a derived record takes the derived type and
//!   default but keeps the position where it was first declared.
//! - Class-level and init-only fields are excluded, as are fields whose name
//!   starts with `_`, except the overflow field [`EXTRA_FIELD`].
//! - Hooks are inherited from the nearest ancestor that declares them.
//! - A [closed](RecordDecl::closed) record must redeclare every inherited
//!   field it serializes, since its type can only store its own fields.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::category::{classify, FieldContext, TypeCategory};
use crate::error::SynthesisError;
use crate::tree::{TreeMap, TreeValue};
use crate::types::{RecordRef, TypeExpr};
use crate::value::Value;

/// The one underscore-prefixed field name that is still serialized.
pub const EXTRA_FIELD: &str = "_extra";

/// Pre-decode hook: rewrites the whole input before field extraction.
pub type PreDecodeHook = Arc<dyn Fn(TreeValue) -> TreeValue + Send + Sync>;

/// Post-encode hook: rewrites the encoded map, given `omit_null_fields`.
pub type PostEncodeHook = Arc<dyn Fn(TreeMap, bool) -> TreeMap + Send + Sync>;

/// Per-record hooks. Missing hooks behave as the defaults.
#[derive(Clone, Default)]
pub struct Hooks {
    pub pre_decode: Option<PreDecodeHook>,
    pub post_encode: Option<PostEncodeHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("pre_decode", &self.pre_decode.is_some())
            .field("post_encode", &self.post_encode.is_some())
            .finish()
    }
}

/// How a declared field participates in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldMarker {
    #[default]
    Data,
    /// Shared by all instances; not part of the data.
    ClassLevel,
    /// Only used during construction; not stored.
    InitOnly,
}

/// A field default: a fixed value or a factory producing a fresh one.
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    pub fn produce(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// One declared field.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    /// Wire key; the field name when unset.
    pub key: Option<String>,
    pub ty: TypeExpr,
    pub default: Option<DefaultValue>,
    pub marker: FieldMarker,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            key: None,
            ty,
            default: None,
            marker: FieldMarker::Data,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    pub fn with_default_factory(
        mut self,
        factory: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        self.default = Some(DefaultValue::Factory(Arc::new(factory)));
        self
    }

    pub fn with_marker(mut self, marker: FieldMarker) -> Self {
        self.marker = marker;
        self
    }
}

/// Reflection input for one record type.
#[derive(Debug, Clone)]
pub struct RecordDecl {
    name: Arc<str>,
    bases: Vec<RecordRef>,
    fields: Vec<FieldDecl>,
    hooks: Hooks,
    closed: bool,
}

impl RecordDecl {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            fields: Vec::new(),
            hooks: Hooks::default(),
            closed: false,
        }
    }

    /// The record's type holds only the fields this declaration lists.
    ///
    /// Extraction then fails if an inherited field would be serialized
    /// without being redeclared here.
    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }

    /// Add a base record. Bases are flattened in the order they are added.
    pub fn extends(mut self, base: impl Into<RecordRef>) -> Self {
        self.bases.push(base.into());
        self
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_pre_decode(
        mut self,
        hook: impl Fn(TreeValue) -> TreeValue + Send + Sync + 'static,
    ) -> Self {
        self.hooks.pre_decode = Some(Arc::new(hook));
        self
    }

    pub fn with_post_encode(
        mut self,
        hook: impl Fn(TreeMap, bool) -> TreeMap + Send + Sync + 'static,
    ) -> Self {
        self.hooks.post_encode = Some(Arc::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bases(&self) -> &[RecordRef] {
        &self.bases
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// A flattened, classified field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub key: String,
    pub declared: TypeExpr,
    pub category: TypeCategory,
    pub default: Option<DefaultValue>,
    /// Name of the record whose declaration won.
    pub declared_by: Arc<str>,
}

impl FieldDescriptor {
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// The flattened schema of one record type. Immutable once built.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub record: RecordRef,
    pub fields: Vec<FieldDescriptor>,
    pub hooks: Hooks,
}

impl RecordSchema {
    pub fn name(&self) -> &str {
        self.record.name()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }
}

fn is_serialized_name(name: &str) -> bool {
    !name.starts_with('_') || name == EXTRA_FIELD
}

/// Flatten `record` and its ancestry into a [`RecordSchema`].
pub fn extract(record: &RecordRef) -> Result<RecordSchema, SynthesisError> {
    let chain = linearize(record)?;
    let owner = record.name();

    let mut merged: IndexMap<String, (FieldDecl, Arc<str>)> = IndexMap::new();
    for decl in &chain {
        validate(decl)?;
        for field in decl.fields() {
            if field.marker != FieldMarker::Data || !is_serialized_name(&field.name) {
                merged.shift_remove(&field.name);
                continue;
            }
            merged.insert(field.name.clone(), (field.clone(), Arc::clone(&decl.name)));
        }
    }

    if let Some(root) = chain.last().filter(|decl| decl.closed) {
        if let Some((name, (_, base))) = merged
            .iter()
            .find(|(_, (_, declared_by))| *declared_by != root.name)
        {
            return Err(SynthesisError::Introspection {
                owner: owner.to_owned(),
                reason: format!("field '{name}' inherited from {base} is not redeclared"),
            });
        }
    }

    let mut keys = HashSet::new();
    let mut fields = Vec::with_capacity(merged.len());
    for (name, (field, declared_by)) in merged {
        let category = classify(
            &field.ty,
            &FieldContext {
                field: &name,
                owner,
            },
        )?;
        let key = field.key.unwrap_or_else(|| name.clone());
        if !keys.insert(key.clone()) {
            return Err(SynthesisError::Introspection {
                owner: owner.to_owned(),
                reason: format!("more than one field uses the key '{key}'"),
            });
        }
        fields.push(FieldDescriptor {
            name,
            key,
            declared: field.ty,
            category,
            default: field.default,
            declared_by,
        });
    }

    let hooks = Hooks {
        pre_decode: chain
            .iter()
            .rev()
            .find_map(|decl| decl.hooks.pre_decode.clone()),
        post_encode: chain
            .iter()
            .rev()
            .find_map(|decl| decl.hooks.post_encode.clone()),
    };

    Ok(RecordSchema {
        record: record.clone(),
        fields,
        hooks,
    })
}

fn validate(decl: &RecordDecl) -> Result<(), SynthesisError> {
    let mut seen = HashSet::new();
    for field in decl.fields() {
        if field.name.is_empty() {
            return Err(SynthesisError::Introspection {
                owner: decl.name().to_owned(),
                reason: "field with an empty name".to_owned(),
            });
        }
        if !seen.insert(field.name.as_str()) {
            return Err(SynthesisError::Introspection {
                owner: decl.name().to_owned(),
                reason: format!("field '{}' is declared twice", field.name),
            });
        }
    }
    Ok(())
}

/// Ancestry in least- to most-derived order, each record once.
fn linearize(record: &RecordRef) -> Result<Vec<Arc<RecordDecl>>, SynthesisError> {
    let mut order = Vec::new();
    let mut done = HashSet::new();
    let mut active = Vec::new();
    visit(record, record.name(), &mut order, &mut done, &mut active)?;
    Ok(order)
}

fn visit(
    record: &RecordRef,
    owner: &str,
    order: &mut Vec<Arc<RecordDecl>>,
    done: &mut HashSet<String>,
    active: &mut Vec<String>,
) -> Result<(), SynthesisError> {
    if active.iter().any(|name| name == record.name()) {
        let mut path = active.clone();
        path.push(record.name().to_owned());
        return Err(SynthesisError::Introspection {
            owner: owner.to_owned(),
            reason: format!("inheritance cycle {}", path.join(" -> ")),
        });
    }
    if done.contains(record.name()) {
        return Ok(());
    }

    active.push(record.name().to_owned());
    let decl = record.declaration();
    for base in decl.bases() {
        visit(base, owner, order, done, active)?;
    }
    active.pop();

    done.insert(record.name().to_owned());
    order.push(decl);
    Ok(())
}
