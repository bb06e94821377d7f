//! Process-wide codec cache.
//!
//! Every record type gets one slot, created on first lookup. The slot is a
//! [`OnceCell`], so concurrent first access from several threads synthesizes
//! the codec exactly once; later lookups take only the read lock.
//!
//! A slot is bound to the declaration that created it. Looking up the same
//! name with a different declaration is a [`SynthesisError`], so a name can
//! never hand out a codec built from another record's schema.
//!
//! Synthesis never recurses into another record's synthesis. Nested records
//! hold a [`LazyCodec`] that looks their codec up on first use, which is how
//! cyclic record graphs stay finite. [`detect_cycles`] reports such cycles.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;
use tracing::debug;

use crate::codec::CompiledCodec;
use crate::error::SynthesisError;
use crate::schema::RecordDecl;
use crate::types::RecordRef;

struct Slot {
    declaration: Arc<RecordDecl>,
    codec: OnceCell<Arc<CompiledCodec>>,
}

static REGISTRY: Lazy<CodecRegistry> = Lazy::new(CodecRegistry::new);

/// Cache of compiled codecs keyed by record name.
#[derive(Default)]
pub struct CodecRegistry {
    slots: RwLock<HashMap<Arc<str>, Arc<Slot>>>,
}

impl CodecRegistry {
    fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static CodecRegistry {
        &REGISTRY
    }

    /// Return the cached codec for `record`, synthesizing it on first use.
    ///
    /// Fails if another declaration already registered the same record name.
    pub fn get_or_build(&self, record: &RecordRef) -> Result<Arc<CompiledCodec>, SynthesisError> {
        let slot = self.slot(record)?;
        let codec = slot.codec.get_or_try_init(|| {
            if let Some(cycle) = detect_cycles(record) {
                debug!(
                    record = record.name(),
                    cycle = %cycle.join(" -> "),
                    "record graph is cyclic, nested codecs resolve lazily"
                );
            }
            CompiledCodec::build(record).map(Arc::new)
        })?;
        Ok(Arc::clone(codec))
    }

    fn slot(&self, record: &RecordRef) -> Result<Arc<Slot>, SynthesisError> {
        let declaration = record.declaration();
        let existing = self.slots.read().get(record.name()).cloned();
        let slot = match existing {
            Some(slot) => slot,
            None => {
                let mut slots = self.slots.write();
                Arc::clone(slots.entry(Arc::from(record.name())).or_insert_with(|| {
                    Arc::new(Slot {
                        declaration: Arc::clone(&declaration),
                        codec: OnceCell::new(),
                    })
                }))
            }
        };
        if !Arc::ptr_eq(&slot.declaration, &declaration) {
            return Err(SynthesisError::Introspection {
                owner: record.name().to_owned(),
                reason: "record name already registered by a different declaration".to_owned(),
            });
        }
        Ok(slot)
    }

    /// Get an already compiled codec by record name.
    pub fn get(&self, name: &str) -> Option<Arc<CompiledCodec>> {
        self.slots
            .read()
            .get(name)
            .and_then(|slot| slot.codec.get().cloned())
    }

    /// Names of all records with a compiled codec.
    pub fn records(&self) -> Vec<String> {
        self.slots
            .read()
            .iter()
            .filter(|(_, slot)| slot.codec.get().is_some())
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Number of compiled codecs.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .values()
            .filter(|slot| slot.codec.get().is_some())
            .count()
    }

    /// Check if no codec has been compiled yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Return the cached codec for `record` from the process-wide registry.
pub fn get_or_build(record: &RecordRef) -> Result<Arc<CompiledCodec>, SynthesisError> {
    CodecRegistry::global().get_or_build(record)
}

/// A nested record's codec, looked up on first use and then kept.
pub(crate) struct LazyCodec {
    record: RecordRef,
    codec: OnceCell<Arc<CompiledCodec>>,
}

impl LazyCodec {
    pub(crate) fn new(record: RecordRef) -> Self {
        Self {
            record,
            codec: OnceCell::new(),
        }
    }

    pub(crate) fn record(&self) -> &RecordRef {
        &self.record
    }

    pub(crate) fn get(&self) -> Result<&Arc<CompiledCodec>, SynthesisError> {
        self.codec.get_or_try_init(|| get_or_build(&self.record))
    }
}

/// Detect a cycle in the record graph reachable from `root` and return its
/// path if found.
///
/// Edges run from a record to its bases and to every record named in its
/// field types.
pub fn detect_cycles(root: &RecordRef) -> Option<Vec<String>> {
    let mut visited = HashSet::new();
    let mut path = Vec::new();
    find_cycle(root, &mut visited, &mut path)
}

fn find_cycle(
    record: &RecordRef,
    visited: &mut HashSet<String>,
    path: &mut Vec<String>,
) -> Option<Vec<String>> {
    let name = record.name();
    if let Some(start) = path.iter().position(|n| n == name) {
        let mut cycle: Vec<String> = path[start..].to_vec();
        cycle.push(name.to_string());
        return Some(cycle);
    }

    if visited.contains(name) {
        return None;
    }

    path.push(name.to_string());

    let decl = record.declaration();
    let dependencies = decl
        .bases()
        .iter()
        .cloned()
        .chain(decl.fields().iter().flat_map(|field| field.ty.record_refs()));
    for dep in dependencies {
        if let Some(cycle) = find_cycle(&dep, visited, path) {
            return Some(cycle);
        }
    }

    path.pop();
    visited.insert(name.to_string());
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    use crate::schema::{FieldDecl, RecordDecl};
    use crate::types::TypeExpr;

    fn node_decl() -> Arc<RecordDecl> {
        static DECL: OnceLock<Arc<RecordDecl>> = OnceLock::new();
        Arc::clone(DECL.get_or_init(|| {
            Arc::new(
                RecordDecl::new("registry::Node")
                    .field(FieldDecl::new("value", TypeExpr::Int))
                    .field(FieldDecl::new(
                        "children",
                        TypeExpr::list(TypeExpr::Record(node())),
                    )),
            )
        }))
    }

    fn node() -> RecordRef {
        RecordRef::deferred("registry::Node", node_decl)
    }

    fn leaf_decl() -> Arc<RecordDecl> {
        static DECL: OnceLock<Arc<RecordDecl>> = OnceLock::new();
        Arc::clone(DECL.get_or_init(|| {
            Arc::new(RecordDecl::new("registry::Leaf").field(FieldDecl::new("id", TypeExpr::Uuid)))
        }))
    }

    fn leaf() -> RecordRef {
        RecordRef::from(leaf_decl())
    }

    #[test]
    fn test_get_or_build_is_idempotent() {
        let first = get_or_build(&leaf()).unwrap();
        let second = get_or_build(&leaf()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(CodecRegistry::global().get("registry::Leaf").is_some());
        assert!(!CodecRegistry::global().is_empty());
    }

    #[test]
    fn test_same_name_with_another_declaration_is_rejected() {
        let first = RecordRef::from(
            RecordDecl::new("registry::Same").field(FieldDecl::new("a", TypeExpr::Int)),
        );
        let second = RecordRef::from(
            RecordDecl::new("registry::Same").field(FieldDecl::new("b", TypeExpr::Str)),
        );

        let codec = get_or_build(&first).unwrap();
        assert_eq!(codec.schema().fields[0].name, "a");

        let err = get_or_build(&second).unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @"record registry::Same cannot be introspected: record name already registered by a different declaration"
        );

        // The original binding is untouched.
        assert!(Arc::ptr_eq(&get_or_build(&first).unwrap(), &codec));
    }

    #[test]
    fn test_concurrent_first_access_builds_once() {
        let record = RecordRef::from(
            RecordDecl::new("registry::Concurrent").field(FieldDecl::new("n", TypeExpr::Int)),
        );
        let codecs: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| get_or_build(&record).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for codec in &codecs[1..] {
            assert!(Arc::ptr_eq(&codecs[0], codec));
        }
    }

    #[test]
    fn test_synthesis_failure_is_reported_every_time() {
        let broken = RecordRef::from(
            RecordDecl::new("registry::Broken").field(FieldDecl::new("s", TypeExpr::AnyStr)),
        );
        assert!(get_or_build(&broken).is_err());
        assert!(get_or_build(&broken).is_err());
        assert!(CodecRegistry::global().get("registry::Broken").is_none());
    }

    #[test]
    fn test_detect_cycles_reports_path() {
        assert_eq!(
            detect_cycles(&node()),
            Some(vec!["registry::Node".to_string(), "registry::Node".to_string()])
        );
        assert_eq!(detect_cycles(&leaf()), None);
    }

    #[test]
    fn test_cyclic_record_synthesizes() {
        let codec = get_or_build(&node()).unwrap();
        assert_eq!(codec.schema().fields.len(), 2);
    }
}
