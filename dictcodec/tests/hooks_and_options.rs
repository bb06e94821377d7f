//! Hooks, inheritance, strategies and conversion options.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use dictcodec::{
    default_post_encode, from_json, from_tree, serializable_field, to_json, to_tree, ByteString,
    ConversionError, Enumeration, Options, Record, RecordHooks, RecordValue, SerializableType,
    SerializationStrategy, TreeMap, TreeValue, Value, ValueError,
};
use serde_json::json;

// =============================================================================
// Hooks
// =============================================================================

#[derive(Record, Debug, PartialEq)]
#[record(hooks)]
struct Animal {
    name: String,
    legs: i64,
}

impl RecordHooks for Animal {
    fn pre_decode(tree: TreeValue) -> TreeValue {
        let TreeValue::Map(mut map) = tree else {
            return tree;
        };
        if let Some(name) = map.shift_remove("fullName") {
            map.insert("name".into(), name);
        }
        TreeValue::Map(map)
    }

    fn post_encode(mut map: TreeMap, omit_null_fields: bool) -> TreeMap {
        map.insert("kind".into(), TreeValue::from("animal"));
        default_post_encode(map, omit_null_fields)
    }
}

#[derive(Record, Debug, PartialEq)]
#[record(extends = "Animal")]
struct Dog {
    breed: String,
    name: String,
    legs: i64,
}

#[derive(Record, Debug, PartialEq)]
struct Kennel {
    resident: Animal,
}

#[test]
fn test_pre_decode_hook_rewrites_input() {
    let animal: Animal =
        from_json(json!({"fullName": "Rex", "legs": 4}), &Options::default()).unwrap();
    assert_eq!(
        animal,
        Animal {
            name: "Rex".into(),
            legs: 4
        }
    );
}

#[test]
fn test_post_encode_hook_rewrites_output() {
    let animal = Animal {
        name: "Rex".into(),
        legs: 4,
    };
    assert_eq!(
        to_json(&animal, &Options::default()).unwrap(),
        json!({"name": "Rex", "legs": 4, "kind": "animal"})
    );
}

#[test]
fn test_derived_record_keeps_base_order_and_hooks() {
    let codec = Dog::codec().unwrap();
    let names: Vec<_> = codec.schema().fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["name", "legs", "breed"]);

    let dog = Dog {
        breed: "collie".into(),
        name: "Lassie".into(),
        legs: 4,
    };
    assert_eq!(
        to_json(&dog, &Options::default()).unwrap(),
        json!({"name": "Lassie", "legs": 4, "breed": "collie", "kind": "animal"})
    );
}

#[test]
fn test_nested_value_encodes_with_its_runtime_record() {
    let dog = Dog {
        breed: "collie".into(),
        name: "Lassie".into(),
        legs: 4,
    };
    let kennel = RecordValue::new(Kennel::record_ref()).with("resident", Value::Record(dog.to_record()));
    let tree = Kennel::codec()
        .unwrap()
        .encode(&kennel, &Options::default())
        .unwrap();
    assert_eq!(
        tree.get("resident").and_then(|r| r.get("breed")),
        Some(&TreeValue::from("collie"))
    );
}

// =============================================================================
// Pass-through fields
// =============================================================================

#[derive(Record, Debug, PartialEq)]
#[record(hooks)]
struct Flexible {
    name: String,
    #[record(default)]
    _extra: Option<HashMap<String, Value>>,
    _cache: Vec<u8>,
}

impl RecordHooks for Flexible {
    fn pre_decode(tree: TreeValue) -> TreeValue {
        let TreeValue::Map(map) = tree else {
            return tree;
        };
        let (mut known, extra): (TreeMap, TreeMap) =
            map.into_iter().partition(|(key, _)| key == "name");
        known.insert("_extra".into(), TreeValue::Map(extra));
        TreeValue::Map(known)
    }

    fn post_encode(mut map: TreeMap, omit_null_fields: bool) -> TreeMap {
        if let Some(TreeValue::Map(extra)) = map.shift_remove("_extra") {
            map.extend(extra);
        }
        default_post_encode(map, omit_null_fields)
    }
}

#[test]
fn test_extra_field_carries_unknown_keys() {
    let input = json!({"name": "box", "color": "red", "size": 3});
    let flexible: Flexible = from_json(input.clone(), &Options::default()).unwrap();
    assert_eq!(flexible._cache, Vec::<u8>::new());
    let extra = flexible._extra.as_ref().unwrap();
    assert_eq!(extra.get("color"), Some(&Value::Text("red".into())));
    assert_eq!(extra.get("size"), Some(&Value::Int(3)));

    assert_eq!(to_json(&flexible, &Options::default()).unwrap(), input);
}

#[test]
fn test_private_fields_are_not_part_of_the_schema() {
    let codec = Flexible::codec().unwrap();
    assert!(codec.schema().field("_cache").is_none());
    assert!(codec.schema().field("_extra").is_some());
}

// =============================================================================
// Strategies and self-serializing types
// =============================================================================

struct HexStrategy;

impl SerializationStrategy for HexStrategy {
    fn name(&self) -> &str {
        "hex"
    }

    fn serialize(&self, value: &Value) -> Result<TreeValue, ValueError> {
        match value {
            Value::Int(number) => Ok(TreeValue::Text(format!("{number:#x}"))),
            other => Err(ValueError::type_mismatch("int", other)),
        }
    }

    fn deserialize(&self, tree: &TreeValue) -> Result<Value, ValueError> {
        let digits = tree
            .as_str()
            .and_then(|text| text.strip_prefix("0x"))
            .ok_or_else(|| ValueError::tree_mismatch("hex text", tree))?;
        i64::from_str_radix(digits, 16)
            .map(Value::Int)
            .map_err(|err| ValueError::invalid("hex", err))
    }
}

#[derive(Record, Debug, PartialEq)]
struct Register {
    #[record(with = "HexStrategy")]
    value: i64,
}

#[derive(Debug, Clone, PartialEq)]
struct Celsius(f64);

impl SerializableType for Celsius {
    const NAME: &'static str = "Celsius";

    fn serialize(&self) -> Result<TreeValue, ValueError> {
        Ok(TreeValue::Text(format!("{}C", self.0)))
    }

    fn deserialize(tree: &TreeValue) -> Result<Self, ValueError> {
        tree.as_str()
            .and_then(|text| text.strip_suffix('C'))
            .and_then(|number| number.parse().ok())
            .map(Celsius)
            .ok_or_else(|| ValueError::invalid("Celsius", tree))
    }
}

serializable_field!(Celsius);

#[derive(Record, Debug, PartialEq)]
struct Reading {
    temperature: Celsius,
    history: Vec<Celsius>,
}

#[test]
fn test_strategy_bound_field() {
    let register = Register { value: 255 };
    let json = to_json(&register, &Options::default()).unwrap();
    assert_eq!(json, json!({"value": "0xff"}));
    assert_eq!(from_json::<Register>(json, &Options::default()).unwrap(), register);
}

#[test]
fn test_strategy_errors_are_field_attributed() {
    let err = from_json::<Register>(json!({"value": 255}), &Options::default()).unwrap_err();
    assert_eq!(err.field(), Some("value"));
    assert!(matches!(err, ConversionError::InvalidFieldValue { .. }));
}

#[test]
fn test_self_serializing_field() {
    let reading = Reading {
        temperature: Celsius(21.5),
        history: vec![Celsius(19.0), Celsius(20.25)],
    };
    let json = to_json(&reading, &Options::default()).unwrap();
    assert_eq!(
        json,
        json!({"temperature": "21.5C", "history": ["19C", "20.25C"]})
    );
    assert_eq!(from_json::<Reading>(json, &Options::default()).unwrap(), reading);
}

// =============================================================================
// Options
// =============================================================================

#[derive(Enumeration, Debug, Clone, Copy, PartialEq)]
enum Color {
    #[enumeration(value = "red")]
    Red,
    #[enumeration(value = "blue")]
    Blue,
}

#[derive(Record, Debug, PartialEq)]
struct Snapshot {
    color: Color,
    payload: ByteString,
    taken_at: NaiveDateTime,
    elapsed: TimeDelta,
    note: Option<String>,
}

fn snapshot() -> Snapshot {
    Snapshot {
        color: Color::Blue,
        payload: ByteString(b"hi".to_vec()),
        taken_at: NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap(),
        elapsed: TimeDelta::milliseconds(1500),
        note: None,
    }
}

#[test]
fn test_default_options_produce_plain_values() {
    assert_eq!(
        to_json(&snapshot(), &Options::default()).unwrap(),
        json!({
            "color": "blue",
            "payload": "aGk=",
            "taken_at": "2024-01-02T03:04:05",
            "elapsed": 1.5,
            "note": null,
        })
    );
}

#[test]
fn test_omit_null_fields() {
    let options = Options::default().with_omit_null_fields(true);
    let json = to_json(&snapshot(), &options).unwrap();
    assert!(json.get("note").is_none());
    assert_eq!(from_json::<Snapshot>(json, &Options::default()).unwrap_err().field(), Some("note"));
}

#[test]
fn test_raw_options_keep_native_values() {
    let options = Options::default()
        .with_raw_bytes(true)
        .with_raw_enum(true)
        .with_raw_datetime(true);
    let tree = to_tree(&snapshot(), &options).unwrap();

    assert_eq!(tree.get("payload"), Some(&TreeValue::Bytes(b"hi".to_vec())));
    assert_eq!(tree.get("color").map(TreeValue::kind), Some("enum"));
    assert_eq!(tree.get("taken_at").map(TreeValue::kind), Some("datetime"));
    assert_eq!(tree.get("elapsed").map(TreeValue::kind), Some("duration"));

    assert_eq!(from_tree::<Snapshot>(tree, &options).unwrap(), snapshot());
}

#[test]
fn test_raw_bytes_decode_rejects_text() {
    let json = to_json(&snapshot(), &Options::default()).unwrap();
    let err = from_json::<Snapshot>(json, &Options::default().with_raw_bytes(true)).unwrap_err();
    assert_eq!(err.field(), Some("payload"));
}

#[test]
fn test_native_enum_decodes_in_any_mode() {
    let raw = to_tree(&snapshot(), &Options::default().with_raw_enum(true)).unwrap();
    let decoded: Snapshot = from_tree(raw, &Options::default()).unwrap();
    assert_eq!(decoded.color, Color::Blue);
}
