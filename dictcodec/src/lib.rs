//! # dictcodec
//!
//! Type-directed synthesis of converters between typed records and plain
//! tree values (maps, sequences and scalars).
//!
//! ## Overview
//!
//! A record type declares its fields and their types once. The first time a
//! record is encoded or decoded, `dictcodec` extracts its schema, classifies
//! every field type into a category, and composes a pair of converters out of
//! per-category transforms. The compiled pair is cached for the rest of the
//! process, so later conversions do no type inspection at all.
//!
//! Tree values ([`TreeValue`]) carry only what JSON-like formats can express,
//! plus raw bytes and, when raw options are enabled, native values passed
//! through untouched.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dictcodec::{from_json, to_json, Options, Record};
//!
//! #[derive(Record, Debug, PartialEq)]
//! struct User {
//!     name: String,
//!     age: u32,
//!     email: Option<String>,
//! }
//!
//! let user: User = from_json(
//!     serde_json::json!({"name": "Ada", "age": 36, "email": null}),
//!     &Options::default(),
//! )?;
//!
//! let json = to_json(&user, &Options::default().with_omit_null_fields(true))?;
//! // => {"name": "Ada", "age": 36}
//! ```
//!
//! ## Features
//!
//! | Feature | Description | Default |
//! |---------|-------------|---------|
//! | `derive` | `#[derive(Record)]` and `#[derive(Enumeration)]` | ✅ |
//!
//! ## Container Attributes
//!
//! | Attribute | Description |
//! |-----------|-------------|
//! | `#[record(name = "Name")]` | Record identity used by the codec cache |
//! | `#[record(rename_all = "camelCase")]` | Wire keys follow a naming convention |
//! | `#[record(extends = "Base")]` | Inherit fields and hooks from another record; inherited fields must be redeclared |
//! | `#[record(hooks)]` | Use the type's [`RecordHooks`] implementation |
//!
//! ## Field Attributes
//!
//! | Attribute | Description |
//! |-----------|-------------|
//! | `#[record(rename = "key")]` | Wire key for this field |
//! | `#[record(default)]` | Use `Default::default()` when the key is absent |
//! | `#[record(default = "expr")]` | Use `expr` when the key is absent |
//! | `#[record(skip)]` | Class-level field, never converted |
//! | `#[record(with = "expr")]` | Convert through a [`SerializationStrategy`] |
//!
//! Fields whose name starts with `_` are private and never converted, except
//! `_extra`, which carries the pass-through map handed to the hooks.
//!
//! ## Options
//!
//! | Option | Effect |
//! |--------|--------|
//! | `raw_bytes` | Bytes stay native instead of base64 text |
//! | `raw_enum` | Enum members stay native instead of their value |
//! | `raw_datetime` | Dates, times and durations stay native |
//! | `omit_null_fields` | Null entries are dropped from encoded maps |
//!
//! ## Supported Field Types
//!
//! | Category | Rust types | Wire form |
//! |----------|------------|-----------|
//! | Boolean | `bool` | bool |
//! | Text | `String` | text |
//! | Integer | `i8`-`i64`, `u8`-`u32` | int |
//! | Float | `f32`, `f64` | float |
//! | Bytes | [`ByteString`] | base64 text |
//! | Sequence | `Vec<T>`, `VecDeque<T>` | sequence |
//! | Set | `HashSet<T>`, `BTreeSet<T>` | sequence |
//! | Frozen set | [`FrozenSet`] | sequence |
//! | Mapping | `HashMap<K, V>`, `BTreeMap<K, V>`, `IndexMap<K, V>` | mapping |
//! | Chain mapping | [`ChainMap`] | sequence of mappings |
//! | Path | `PathBuf` | text |
//! | Date/time | chrono `NaiveDateTime`, `DateTime`, `NaiveDate`, `NaiveTime` | ISO-8601 text |
//! | Duration | `TimeDelta` | float seconds |
//! | Time zone | `FixedOffset` | text |
//! | UUID | `Uuid` | hyphenated text |
//! | Decimal | `Decimal` | text |
//! | Fraction | `Rational64` | text |
//! | Optional | `Option<T>` | null or `T` |
//! | Union | [`OneOf2`], [`OneOf3`] | first arm that converts |
//! | Record | any [`Record`] | mapping |
//! | Enum | any [`EnumType`] | member value |
//! | Self-serializing | any [`SerializableType`] | its own tree |
//! | Any | [`Value`] | structural |
//!
//! ## Manual Declarations
//!
//! Records can also be declared without a Rust type and converted through
//! [`RecordValue`]s directly:
//!
//! ```rust
//! use dictcodec::{get_or_build, FieldDecl, Options, RecordDecl, RecordRef, TreeValue, TypeExpr};
//!
//! let point = RecordRef::from(
//!     RecordDecl::new("docs::Point")
//!         .field(FieldDecl::new("x", TypeExpr::Int))
//!         .field(FieldDecl::new("tags", TypeExpr::list(TypeExpr::Str)).with_default_factory(
//!             || dictcodec::Value::list([]),
//!         )),
//! );
//!
//! let codec = get_or_build(&point).unwrap();
//! let record = codec
//!     .decode(TreeValue::map([("x", TreeValue::Int(1))]), &Options::default())
//!     .unwrap();
//! assert_eq!(record.get("x"), Some(&dictcodec::Value::Int(1)));
//!
//! let tree = codec.encode(&record, &Options::default()).unwrap();
//! assert_eq!(tree.to_string(), r#"{"x":1,"tags":[]}"#);
//! ```

pub mod category;
pub mod codec;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
mod format;
pub mod registry;
pub mod schema;
pub mod traits;
pub mod tree;
pub mod types;
mod union;
pub mod value;

pub use category::{classify, FieldContext, TemporalKind, TypeCategory};
pub use codec::{from_json, from_tree, to_json, to_tree, CompiledCodec};
pub use config::Options;
pub use decode::{build_decoder, RecordDecoder};
pub use encode::{build_encoder, default_post_encode, RecordEncoder};
pub use error::{ConversionError, SynthesisError, ValueError};
pub use registry::{detect_cycles, get_or_build, CodecRegistry};
pub use schema::{
    DefaultValue, FieldDecl, FieldDescriptor, FieldMarker, Hooks, PostEncodeHook, PreDecodeHook,
    RecordDecl, RecordSchema, EXTRA_FIELD,
};
pub use traits::{
    enum_from_value, record_from_value, take_field, ByteString, ChainMap, EnumType, FieldType,
    FrozenSet, OneOf2, OneOf3, Record, RecordHooks, SerializableType,
};
pub use tree::{TreeMap, TreeValue};
pub use types::{
    CollectionKind, EnumDecl, EnumRef, MappingKind, RecordRef, SerializableRef,
    SerializationStrategy, StrategyRef, TypeExpr,
};
pub use value::{CustomValue, DateTimeValue, EnumMember, RecordValue, Value, ValueMap};

// Re-export derive macros when available
#[cfg(feature = "derive")]
pub use dictcodec_macros::{Enumeration, Record};
