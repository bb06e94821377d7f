//! Encoder synthesizer: builds record → tree transforms from a schema.
//!
//! Each field's [`TypeCategory`] is turned into an [`EncodeFn`] once, when
//! the codec is built. Nested records are not synthesized here; their codecs
//! are looked up on first use (see [`LazyCodec`]), which keeps synthesis of
//! self-referencing records finite.

use std::sync::Arc;

use crate::category::{TemporalKind, TypeCategory};
use crate::config::Options;
use crate::error::{ConversionError, ValueError};
use crate::format;
use crate::registry::{self, LazyCodec};
use crate::schema::RecordSchema;
use crate::tree::{TreeMap, TreeValue};
use crate::union::UnionEncoder;
use crate::value::{RecordValue, Value, ValueMap};

/// A synthesized value transform, encode direction.
pub(crate) type EncodeFn =
    Arc<dyn Fn(&Value, &Options) -> Result<TreeValue, ValueError> + Send + Sync>;

/// The default post-encode hook: drops null entries when asked to.
pub fn default_post_encode(mut map: TreeMap, omit_null_fields: bool) -> TreeMap {
    if omit_null_fields {
        map.retain(|_, value| !value.is_null());
    }
    map
}

/// Encode half of a compiled codec.
pub struct RecordEncoder {
    schema: Arc<RecordSchema>,
    transforms: Vec<EncodeFn>,
}

/// Synthesize the encoder for a schema.
pub fn build_encoder(schema: Arc<RecordSchema>) -> RecordEncoder {
    let transforms = schema
        .fields
        .iter()
        .map(|field| transform(&field.category, &Arc::from(field.name.as_str())))
        .collect();
    RecordEncoder { schema, transforms }
}

impl RecordEncoder {
    /// Encode a record value into its wire map.
    ///
    /// Null field values encode to null without consulting the field's
    /// category. The post-encode hook runs last.
    pub fn encode(
        &self,
        record: &RecordValue,
        options: &Options,
    ) -> Result<TreeMap, ConversionError> {
        let owner = self.schema.name();
        let mut out = TreeMap::with_capacity(self.transforms.len());

        for (field, transform) in self.schema.fields.iter().zip(&self.transforms) {
            let failure = |source: ValueError| ConversionError::ConversionFailure {
                field: field.name.clone(),
                owner: owner.to_owned(),
                source,
            };

            let value = record.get(&field.name).ok_or_else(|| {
                failure(ValueError::lookup(format!(
                    "{} value has no field '{}'",
                    record.record().name(),
                    field.name
                )))
            })?;

            let tree = if value.is_null() {
                TreeValue::Null
            } else {
                transform(value, options).map_err(failure)?
            };
            out.insert(field.key.clone(), tree);
        }

        Ok(match &self.schema.hooks.post_encode {
            Some(hook) => hook(out, options.omit_null_fields),
            None => default_post_encode(out, options.omit_null_fields),
        })
    }
}

fn encoder<F>(f: F) -> EncodeFn
where
    F: Fn(&Value, &Options) -> Result<TreeValue, ValueError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn transform(category: &TypeCategory, field: &Arc<str>) -> EncodeFn {
    let expected = category.to_string();

    match category {
        TypeCategory::Any => encoder(|value, _| Ok(value.to_tree())),

        TypeCategory::NestedRecord(record) => {
            let declared = LazyCodec::new(record.clone());
            encoder(move |value, options| match value {
                Value::Record(nested) => {
                    // Values of derived records encode with their own codec.
                    let codec = if nested.record() == declared.record() {
                        Arc::clone(declared.get()?)
                    } else {
                        registry::get_or_build(nested.record())?
                    };
                    codec.encode(nested, options).map_err(ValueError::nested)
                }
                other => Err(ValueError::type_mismatch(&expected, other)),
            })
        }

        TypeCategory::CustomSerializable(_) => encoder(move |value, _| match value {
            Value::Custom(custom) => custom.serialize(),
            other => Err(ValueError::type_mismatch(&expected, other)),
        }),

        TypeCategory::StrategyBound(strategy) => {
            let strategy = strategy.clone();
            encoder(move |value, _| strategy.serialize(value))
        }

        TypeCategory::Optional(inner) => {
            let inner = transform(inner, field);
            encoder(move |value, options| {
                if value.is_null() {
                    Ok(TreeValue::Null)
                } else {
                    inner(value, options)
                }
            })
        }

        TypeCategory::Union(arms) => {
            let resolver = UnionEncoder::new(
                Arc::clone(field),
                arms.iter()
                    .map(|arm| (arm.clone(), transform(arm, field)))
                    .collect(),
            );
            encoder(move |value, options| resolver.encode(value, options))
        }

        TypeCategory::Boolean => encoder(move |value, _| match value {
            Value::Bool(flag) => Ok(TreeValue::Bool(*flag)),
            other => Err(ValueError::type_mismatch(&expected, other)),
        }),

        TypeCategory::NullType => encoder(move |value, _| match value {
            Value::Null => Ok(TreeValue::Null),
            other => Err(ValueError::type_mismatch(&expected, other)),
        }),

        TypeCategory::Text => encoder(move |value, _| match value {
            Value::Text(text) => Ok(TreeValue::Text(text.clone())),
            other => Err(ValueError::type_mismatch(&expected, other)),
        }),

        TypeCategory::Integer => encoder(|value, _| coerce_int(value).map(TreeValue::Int)),

        TypeCategory::FloatingPoint => {
            encoder(|value, _| coerce_float(value).map(TreeValue::Float))
        }

        TypeCategory::Sequence(_, element)
        | TypeCategory::Set(element)
        | TypeCategory::FrozenSet(element) => {
            let element = transform(element, field);
            encoder(move |value, options| match value {
                Value::List(items) | Value::Set(items) | Value::FrozenSet(items) => items
                    .iter()
                    .map(|item| element(item, options))
                    .collect::<Result<_, _>>()
                    .map(TreeValue::Seq),
                other => Err(ValueError::type_mismatch(&expected, other)),
            })
        }

        TypeCategory::Mapping(key, value) => {
            let key = transform(key, field);
            let value = transform(value, field);
            encoder(move |input, options| match input {
                Value::Map(map) => encode_map(map, &key, &value, options).map(TreeValue::Map),
                other => Err(ValueError::type_mismatch(&expected, other)),
            })
        }

        TypeCategory::ChainMapping(key, value) => {
            let key = transform(key, field);
            let value = transform(value, field);
            encoder(move |input, options| match input {
                Value::ChainMap(layers) => layers
                    .iter()
                    .map(|layer| encode_map(layer, &key, &value, options).map(TreeValue::Map))
                    .collect::<Result<_, _>>()
                    .map(TreeValue::Seq),
                other => Err(ValueError::type_mismatch(&expected, other)),
            })
        }

        TypeCategory::Bytes => encoder(move |value, options| match value {
            Value::Bytes(bytes) if options.raw_bytes => Ok(TreeValue::Bytes(bytes.clone())),
            Value::Bytes(bytes) => Ok(TreeValue::Text(format::encode_bytes(bytes))),
            other => Err(ValueError::type_mismatch(&expected, other)),
        }),

        TypeCategory::PathLike => encoder(move |value, _| match value {
            Value::Path(path) => path
                .to_str()
                .map(|text| TreeValue::Text(text.to_owned()))
                .ok_or_else(|| ValueError::invalid("path", "path is not valid unicode")),
            other => Err(ValueError::type_mismatch(&expected, other)),
        }),

        TypeCategory::Enum(decl) => {
            let decl = decl.clone();
            encoder(move |value, options| match value {
                Value::Enum(member) if !decl.contains(member) => Err(ValueError::lookup(format!(
                    "{}.{} is not a member of {}",
                    member.enum_name,
                    member.name,
                    decl.name()
                ))),
                Value::Enum(_) if options.raw_enum => Ok(TreeValue::Native(Box::new(value.clone()))),
                Value::Enum(member) => Ok(member.value.clone()),
                other => Err(ValueError::type_mismatch(&expected, other)),
            })
        }

        TypeCategory::DateTime(kind) => {
            let kind = *kind;
            encoder(move |value, options| {
                let text = match (kind, value) {
                    (TemporalKind::DateTime, Value::DateTime(datetime)) => {
                        format::datetime_iso(datetime)
                    }
                    (TemporalKind::Date, Value::Date(date)) => format::date_iso(date),
                    (TemporalKind::Time, Value::Time(time)) => format::time_iso(time),
                    (_, other) => return Err(ValueError::type_mismatch(&expected, other)),
                };
                Ok(if options.raw_datetime {
                    TreeValue::Native(Box::new(value.clone()))
                } else {
                    TreeValue::Text(text)
                })
            })
        }

        TypeCategory::Duration => encoder(move |value, options| match value {
            Value::Duration(_) if options.raw_datetime => {
                Ok(TreeValue::Native(Box::new(value.clone())))
            }
            Value::Duration(delta) => Ok(TreeValue::Float(format::duration_seconds(delta))),
            other => Err(ValueError::type_mismatch(&expected, other)),
        }),

        TypeCategory::TimeZone => encoder(move |value, _| match value {
            Value::TimeZone(offset) => Ok(TreeValue::Text(format::timezone_name(offset))),
            other => Err(ValueError::type_mismatch(&expected, other)),
        }),

        TypeCategory::Uuid => encoder(move |value, _| match value {
            Value::Uuid(id) => Ok(TreeValue::Text(id.to_string())),
            other => Err(ValueError::type_mismatch(&expected, other)),
        }),

        TypeCategory::Decimal => encoder(move |value, _| match value {
            Value::Decimal(number) => Ok(TreeValue::Text(number.to_string())),
            other => Err(ValueError::type_mismatch(&expected, other)),
        }),

        TypeCategory::Fraction => encoder(move |value, _| match value {
            Value::Fraction(ratio) => Ok(TreeValue::Text(ratio.to_string())),
            other => Err(ValueError::type_mismatch(&expected, other)),
        }),
    }
}

fn encode_map(
    map: &ValueMap,
    key: &EncodeFn,
    value: &EncodeFn,
    options: &Options,
) -> Result<TreeMap, ValueError> {
    map.iter()
        .map(|(k, v)| {
            let encoded = key(k, options)?;
            let text = format::scalar_key(&encoded).ok_or_else(|| {
                ValueError::invalid(
                    "mapping key",
                    format!("{} keys cannot be written as text", encoded.kind()),
                )
            })?;
            Ok((text, value(v, options)?))
        })
        .collect()
}

/// Explicit integer coercion: integers, integral text, and floats truncated
/// toward zero. Booleans are not integers here.
fn coerce_int(value: &Value) -> Result<i64, ValueError> {
    match value {
        Value::Int(number) => Ok(*number),
        Value::Float(number) => {
            let truncated = number.trunc();
            if truncated.is_finite() && truncated.abs() < i64::MAX as f64 {
                Ok(truncated as i64)
            } else {
                Err(ValueError::out_of_range("int", number))
            }
        }
        Value::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| ValueError::invalid("int", format!("'{text}' is not an integer"))),
        other => Err(ValueError::type_mismatch("int", other)),
    }
}

fn coerce_float(value: &Value) -> Result<f64, ValueError> {
    match value {
        Value::Float(number) => Ok(*number),
        Value::Int(number) => Ok(*number as f64),
        Value::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| ValueError::invalid("float", format!("'{text}' is not a number"))),
        other => Err(ValueError::type_mismatch("float", other)),
    }
}
