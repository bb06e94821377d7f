//! Decoder synthesizer: builds tree → record transforms from a schema.

use std::path::PathBuf;
use std::sync::Arc;

use num_rational::Rational64;
use rust_decimal::Decimal;

use crate::category::{TemporalKind, TypeCategory};
use crate::config::Options;
use crate::error::{ConversionError, ValueError};
use crate::format;
use crate::registry::LazyCodec;
use crate::schema::RecordSchema;
use crate::tree::{TreeMap, TreeValue};
use crate::union::UnionDecoder;
use crate::value::{RecordValue, Value, ValueMap};

/// A synthesized value transform, decode direction.
pub(crate) type DecodeFn =
    Arc<dyn Fn(&TreeValue, &Options) -> Result<Value, ValueError> + Send + Sync>;

/// Decode half of a compiled codec.
pub struct RecordDecoder {
    schema: Arc<RecordSchema>,
    transforms: Vec<DecodeFn>,
}

/// Synthesize the decoder for a schema.
pub fn build_decoder(schema: Arc<RecordSchema>) -> RecordDecoder {
    let transforms = schema
        .fields
        .iter()
        .map(|field| transform(&field.category, &Arc::from(field.name.as_str())))
        .collect();
    RecordDecoder { schema, transforms }
}

impl RecordDecoder {
    /// Decode a wire value into a record value.
    ///
    /// The pre-decode hook runs first. Absent fields take their default;
    /// explicit nulls decode to [`Value::Null`] whatever the field's type.
    pub fn decode(&self, input: TreeValue, options: &Options) -> Result<RecordValue, ConversionError> {
        let input = match &self.schema.hooks.pre_decode {
            Some(hook) => hook(input),
            None => input,
        };
        let map = match input {
            TreeValue::Map(map) => map,
            other => {
                return Err(ConversionError::ExpectedMapping {
                    owner: self.schema.name().to_owned(),
                    found: other.kind(),
                })
            }
        };
        self.decode_fields(&map, options)
    }

    fn decode_fields(&self, map: &TreeMap, options: &Options) -> Result<RecordValue, ConversionError> {
        let owner = self.schema.name();
        let mut record = RecordValue::new(self.schema.record.clone());

        for (field, transform) in self.schema.fields.iter().zip(&self.transforms) {
            let value = match map.get(&field.key) {
                None => match &field.default {
                    Some(default) => default.produce(),
                    None => {
                        return Err(ConversionError::MissingRequiredField {
                            field: field.name.clone(),
                            type_name: field.declared.to_string(),
                            owner: owner.to_owned(),
                        })
                    }
                },
                Some(TreeValue::Null) => Value::Null,
                Some(raw) => transform(raw, options).map_err(|source| {
                    ConversionError::InvalidFieldValue {
                        field: field.name.clone(),
                        type_name: field.declared.to_string(),
                        raw: raw.clone(),
                        owner: owner.to_owned(),
                        source,
                    }
                })?,
            };
            record.insert(field.name.clone(), value);
        }

        Ok(record)
    }
}

fn decoder<F>(f: F) -> DecodeFn
where
    F: Fn(&TreeValue, &Options) -> Result<Value, ValueError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn transform(category: &TypeCategory, field: &Arc<str>) -> DecodeFn {
    let expected = category.to_string();

    match category {
        TypeCategory::Any => decoder(|tree, _| Ok(Value::from_tree(tree.clone()))),

        TypeCategory::NestedRecord(record) => {
            let codec = LazyCodec::new(record.clone());
            decoder(move |tree, options| {
                codec
                    .get()?
                    .decode(tree.clone(), options)
                    .map(Value::Record)
                    .map_err(ValueError::nested)
            })
        }

        TypeCategory::CustomSerializable(custom) => {
            let custom = *custom;
            decoder(move |tree, _| custom.deserialize(tree))
        }

        TypeCategory::StrategyBound(strategy) => {
            let strategy = strategy.clone();
            decoder(move |tree, _| strategy.deserialize(tree))
        }

        TypeCategory::Optional(inner) => {
            let inner = transform(inner, field);
            decoder(move |tree, options| match tree {
                TreeValue::Null => Ok(Value::Null),
                tree => inner(tree, options),
            })
        }

        TypeCategory::Union(arms) => {
            let resolver = UnionDecoder::new(
                Arc::clone(field),
                arms.iter()
                    .map(|arm| (arm.clone(), transform(arm, field)))
                    .collect(),
            );
            decoder(move |tree, options| resolver.decode(tree, options))
        }

        TypeCategory::Boolean => decoder(move |tree, _| match tree {
            TreeValue::Bool(flag) => Ok(Value::Bool(*flag)),
            other => Err(ValueError::tree_mismatch(&expected, other)),
        }),

        TypeCategory::NullType => decoder(move |tree, _| match tree {
            TreeValue::Null => Ok(Value::Null),
            other => Err(ValueError::tree_mismatch(&expected, other)),
        }),

        TypeCategory::Text => decoder(move |tree, _| match tree {
            TreeValue::Text(text) => Ok(Value::Text(text.clone())),
            other => Err(ValueError::tree_mismatch(&expected, other)),
        }),

        TypeCategory::Integer => decoder(|tree, _| unpack_int(tree).map(Value::Int)),

        TypeCategory::FloatingPoint => decoder(|tree, _| unpack_float(tree).map(Value::Float)),

        TypeCategory::Sequence(_, element) => {
            let element = transform(element, field);
            decoder(move |tree, options| {
                unpack_items(tree, &element, options, &expected).map(Value::List)
            })
        }

        TypeCategory::Set(element) => {
            let element = transform(element, field);
            decoder(move |tree, options| {
                unpack_items(tree, &element, options, &expected).map(Value::set)
            })
        }

        TypeCategory::FrozenSet(element) => {
            let element = transform(element, field);
            decoder(move |tree, options| {
                unpack_items(tree, &element, options, &expected).map(Value::frozen_set)
            })
        }

        TypeCategory::Mapping(key, value) => {
            let key = transform(key, field);
            let value = transform(value, field);
            decoder(move |tree, options| match tree {
                TreeValue::Map(map) => unpack_map(map, &key, &value, options).map(Value::Map),
                other => Err(ValueError::tree_mismatch(&expected, other)),
            })
        }

        TypeCategory::ChainMapping(key, value) => {
            let key = transform(key, field);
            let value = transform(value, field);
            decoder(move |tree, options| match tree {
                TreeValue::Seq(layers) => layers
                    .iter()
                    .map(|layer| match layer {
                        TreeValue::Map(map) => unpack_map(map, &key, &value, options),
                        other => Err(ValueError::tree_mismatch("mapping", other)),
                    })
                    .collect::<Result<_, _>>()
                    .map(Value::ChainMap),
                other => Err(ValueError::tree_mismatch(&expected, other)),
            })
        }

        TypeCategory::Bytes => decoder(move |tree, options| match tree {
            TreeValue::Bytes(bytes) => Ok(Value::Bytes(bytes.clone())),
            TreeValue::Text(text) if !options.raw_bytes => {
                format::decode_bytes(text).map(Value::Bytes)
            }
            other => Err(ValueError::tree_mismatch(&expected, other)),
        }),

        TypeCategory::PathLike => decoder(move |tree, _| match tree {
            TreeValue::Text(text) => Ok(Value::Path(PathBuf::from(text))),
            other => Err(ValueError::tree_mismatch(&expected, other)),
        }),

        TypeCategory::Enum(decl) => {
            let decl = decl.clone();
            decoder(move |tree, _| match tree {
                TreeValue::Native(native) => match native.as_ref() {
                    Value::Enum(member) if decl.contains(member) => Ok(Value::Enum(member.clone())),
                    other => Err(ValueError::type_mismatch(decl.name(), other)),
                },
                tree => decl.member_for_value(tree).map(Value::Enum),
            })
        }

        TypeCategory::DateTime(kind) => {
            let kind = *kind;
            decoder(move |tree, _| match tree {
                TreeValue::Native(native) => match (kind, native.as_ref()) {
                    (TemporalKind::DateTime, Value::DateTime(_))
                    | (TemporalKind::Date, Value::Date(_))
                    | (TemporalKind::Time, Value::Time(_)) => Ok(native.as_ref().clone()),
                    (_, other) => Err(ValueError::type_mismatch(&expected, other)),
                },
                TreeValue::Text(text) => match kind {
                    TemporalKind::DateTime => format::parse_datetime(text).map(Value::DateTime),
                    TemporalKind::Date => format::parse_date(text).map(Value::Date),
                    TemporalKind::Time => format::parse_time(text).map(Value::Time),
                },
                other => Err(ValueError::tree_mismatch(&expected, other)),
            })
        }

        TypeCategory::Duration => decoder(move |tree, _| match tree {
            TreeValue::Native(native) => match native.as_ref() {
                Value::Duration(delta) => Ok(Value::Duration(*delta)),
                other => Err(ValueError::type_mismatch(&expected, other)),
            },
            TreeValue::Int(seconds) => format::duration_from_seconds(*seconds as f64).map(Value::Duration),
            TreeValue::Float(seconds) => format::duration_from_seconds(*seconds).map(Value::Duration),
            other => Err(ValueError::tree_mismatch(&expected, other)),
        }),

        TypeCategory::TimeZone => decoder(move |tree, _| match tree {
            TreeValue::Text(text) => format::parse_timezone(text).map(Value::TimeZone),
            other => Err(ValueError::tree_mismatch(&expected, other)),
        }),

        TypeCategory::Uuid => decoder(move |tree, _| match tree {
            TreeValue::Text(text) => text
                .parse()
                .map(Value::Uuid)
                .map_err(|err| ValueError::invalid("uuid", err)),
            other => Err(ValueError::tree_mismatch(&expected, other)),
        }),

        TypeCategory::Decimal => decoder(move |tree, _| match tree {
            TreeValue::Text(text) => text
                .trim()
                .parse()
                .map(Value::Decimal)
                .map_err(|err| ValueError::invalid("decimal", err)),
            TreeValue::Int(number) => Ok(Value::Decimal((*number).into())),
            TreeValue::Float(number) => Decimal::try_from(*number)
                .map(Value::Decimal)
                .map_err(|err| ValueError::invalid("decimal", err)),
            other => Err(ValueError::tree_mismatch(&expected, other)),
        }),

        TypeCategory::Fraction => decoder(move |tree, _| match tree {
            TreeValue::Text(text) => text
                .trim()
                .parse()
                .map(Value::Fraction)
                .map_err(|err| ValueError::invalid("fraction", err)),
            TreeValue::Int(number) => Ok(Value::Fraction((*number).into())),
            TreeValue::Float(number) => Rational64::approximate_float(*number)
                .map(Value::Fraction)
                .ok_or_else(|| ValueError::out_of_range("fraction", number)),
            other => Err(ValueError::tree_mismatch(&expected, other)),
        }),
    }
}

fn unpack_items(
    tree: &TreeValue,
    element: &DecodeFn,
    options: &Options,
    expected: &str,
) -> Result<Vec<Value>, ValueError> {
    match tree {
        TreeValue::Seq(items) => items.iter().map(|item| element(item, options)).collect(),
        other => Err(ValueError::tree_mismatch(expected, other)),
    }
}

/// Keys arrive as text and are fed to the key transform as text.
fn unpack_map(
    map: &TreeMap,
    key: &DecodeFn,
    value: &DecodeFn,
    options: &Options,
) -> Result<ValueMap, ValueError> {
    map.iter()
        .map(|(k, v)| Ok((key(&TreeValue::Text(k.clone()), options)?, value(v, options)?)))
        .collect()
}

fn unpack_int(tree: &TreeValue) -> Result<i64, ValueError> {
    match tree {
        TreeValue::Int(number) => Ok(*number),
        TreeValue::Float(number) => {
            let truncated = number.trunc();
            if truncated.is_finite() && truncated.abs() < i64::MAX as f64 {
                Ok(truncated as i64)
            } else {
                Err(ValueError::out_of_range("int", number))
            }
        }
        TreeValue::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| ValueError::invalid("int", format!("'{text}' is not an integer"))),
        other => Err(ValueError::tree_mismatch("int", other)),
    }
}

fn unpack_float(tree: &TreeValue) -> Result<f64, ValueError> {
    match tree {
        TreeValue::Float(number) => Ok(*number),
        TreeValue::Int(number) => Ok(*number as f64),
        TreeValue::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| ValueError::invalid("float", format!("'{text}' is not a number"))),
        other => Err(ValueError::tree_mismatch("float", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{extract, FieldDecl, RecordDecl};
    use crate::types::{EnumDecl, EnumRef, RecordRef, TypeExpr};
    use chrono::{FixedOffset, NaiveDate};
    use serde_json::json;

    fn holder(ty: TypeExpr) -> (RecordRef, RecordDecoder) {
        let record = RecordRef::from(RecordDecl::new("Holder").field(FieldDecl::new("v", ty)));
        let decoder = build_decoder(Arc::new(extract(&record).unwrap()));
        (record, decoder)
    }

    fn decode_one(ty: TypeExpr, raw: TreeValue) -> Result<Value, ConversionError> {
        let (_, decoder) = holder(ty);
        let mut record = decoder.decode(TreeValue::map([("v", raw)]), &Options::default())?;
        Ok(record.take("v").unwrap_or_default())
    }

    #[test]
    fn test_missing_required_field() {
        let (_, decoder) = holder(TypeExpr::Str);
        let err = decoder
            .decode(TreeValue::map([("other", 1)]), &Options::default())
            .unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"field 'v' of type str is missing in Holder");
    }

    #[test]
    fn test_invalid_value_names_field_and_raw_value() {
        let err = decode_one(TypeExpr::Int, TreeValue::from("four")).unwrap_err();
        match err {
            ConversionError::InvalidFieldValue { field, raw, type_name, .. } => {
                assert_eq!(field, "v");
                assert_eq!(type_name, "int");
                assert_eq!(raw, TreeValue::from("four"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_null_decodes_to_null_for_any_category() {
        for ty in [TypeExpr::Int, TypeExpr::Uuid, TypeExpr::list(TypeExpr::Str)] {
            assert_eq!(decode_one(ty, TreeValue::Null).unwrap(), Value::Null);
        }
    }

    #[test]
    fn test_non_mapping_input() {
        let (_, decoder) = holder(TypeExpr::Str);
        let err = decoder
            .decode(TreeValue::Seq(vec![]), &Options::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ConversionError::ExpectedMapping { found: "sequence", .. }
        ));
    }

    #[test]
    fn test_defaults_fill_absent_fields() {
        let record = RecordRef::from(
            RecordDecl::new("Defaults")
                .field(FieldDecl::new("a", TypeExpr::Int).with_default(4))
                .field(
                    FieldDecl::new("b", TypeExpr::list(TypeExpr::Int))
                        .with_default_factory(|| Value::list([])),
                ),
        );
        let decoder = build_decoder(Arc::new(extract(&record).unwrap()));
        let value = decoder
            .decode(TreeValue::map::<&str, TreeValue, _>([]), &Options::default())
            .unwrap();
        assert_eq!(value.get("a"), Some(&Value::Int(4)));
        assert_eq!(value.get("b"), Some(&Value::List(vec![])));
    }

    #[test]
    fn test_integer_keys_decode_from_text() {
        let value = decode_one(
            TypeExpr::dict(TypeExpr::Int, TypeExpr::Str),
            TreeValue::from(json!({"1": "one", "2": "two"})),
        )
        .unwrap();
        assert_eq!(value, Value::map([(2, "two"), (1, "one")]));
    }

    #[test]
    fn test_enum_by_value() {
        let color = EnumRef::new(EnumDecl::new("Color").member("RED", 1).member("BLUE", 3));
        assert_eq!(
            decode_one(TypeExpr::Enum(color.clone()), TreeValue::Int(3)).unwrap(),
            Value::Enum(color.member_named("BLUE").unwrap())
        );
        assert!(decode_one(TypeExpr::Enum(color), TreeValue::Int(2)).is_err());
    }

    #[test]
    fn test_temporal_and_timezone_text() {
        let date = NaiveDate::from_ymd_opt(2021, 7, 1).unwrap();
        assert_eq!(
            decode_one(TypeExpr::Date, TreeValue::from("2021-07-01")).unwrap(),
            Value::Date(date)
        );
        assert_eq!(
            decode_one(TypeExpr::TimeZone, TreeValue::from("UTC+02:00")).unwrap(),
            Value::TimeZone(FixedOffset::east_opt(7200).unwrap())
        );
        assert!(decode_one(TypeExpr::DateTime, TreeValue::from("yesterday")).is_err());
    }

    #[test]
    fn test_bytes_require_text_unless_raw() {
        assert_eq!(
            decode_one(TypeExpr::Bytes, TreeValue::from("MTIz")).unwrap(),
            Value::Bytes(b"123".to_vec())
        );

        let (_, decoder) = holder(TypeExpr::Bytes);
        let raw = Options::new().with_raw_bytes(true);
        assert!(decoder
            .decode(TreeValue::map([("v", "MTIz")]), &raw)
            .is_err());
        assert!(decoder
            .decode(TreeValue::map([("v", TreeValue::Bytes(b"123".to_vec()))]), &raw)
            .is_ok());
    }

    #[test]
    fn test_set_decoding_drops_duplicates() {
        assert_eq!(
            decode_one(TypeExpr::set(TypeExpr::Int), TreeValue::from(json!([1, 2, 1]))).unwrap(),
            Value::Set(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_oversized_timezone_offset_is_an_invalid_value() {
        let err = decode_one(TypeExpr::TimeZone, TreeValue::from("UTC+9999999")).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidFieldValue { ref field, .. } if field == "v"));
        insta::assert_snapshot!(
            err.to_string(),
            @"field 'v' of type timezone in Holder has invalid value \"UTC+9999999\": invalid timezone value: 'UTC+9999999' is not a timezone name"
        );
    }

    #[test]
    fn test_decimal_and_fraction_accept_floats() {
        assert_eq!(
            decode_one(TypeExpr::Decimal, TreeValue::Float(1.25)).unwrap(),
            Value::Decimal(Decimal::new(125, 2))
        );
        assert_eq!(
            decode_one(TypeExpr::Fraction, TreeValue::Float(0.75)).unwrap(),
            Value::Fraction(Rational64::new(3, 4))
        );
        assert!(decode_one(TypeExpr::Decimal, TreeValue::Float(f64::NAN)).is_err());
        assert!(decode_one(TypeExpr::Fraction, TreeValue::Float(f64::INFINITY)).is_err());
    }
}
