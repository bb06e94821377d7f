//! Property tests: typed records survive encode → JSON → decode.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use dictcodec::{
    from_json, from_tree, to_json, to_tree, ByteString, ChainMap, Enumeration, FrozenSet, OneOf2,
    Options, Record,
};
use indexmap::IndexMap;
use num_rational::Rational64;
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Enumeration, Debug, Clone, Copy, PartialEq)]
#[enumeration(rename_all = "lowercase")]
enum Priority {
    Low,
    #[enumeration(value = 5)]
    High,
}

#[derive(Record, Debug, Clone, PartialEq)]
#[record(rename_all = "camelCase")]
struct Inventory {
    item_name: String,
    in_stock: bool,
    count: u32,
    delta: i64,
    weight: f64,
    tags: BTreeSet<i64>,
    prices: HashMap<String, i64>,
    sizes: Vec<i32>,
    note: Option<String>,
    priority: Priority,
    id: Uuid,
    amount: Decimal,
    share: Rational64,
    sku: OneOf2<i64, String>,
}

#[derive(Record, Debug, Clone, PartialEq)]
struct Schedule {
    day: NaiveDate,
    at: NaiveTime,
    starts: DateTime<FixedOffset>,
    zone: FixedOffset,
    window: TimeDelta,
    blob: ByteString,
    location: PathBuf,
}

#[derive(Record, Debug, Clone, PartialEq)]
struct Layered {
    settings: ChainMap<String, i64>,
    flags: FrozenSet<i64>,
    labels: FrozenSet<String>,
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::Low), Just(Priority::High)]
}

fn arb_sku() -> impl Strategy<Value = OneOf2<i64, String>> {
    prop_oneof![
        any::<i64>().prop_map(OneOf2::A),
        "[A-Z]{2}-[0-9]{3}".prop_map(OneOf2::B),
    ]
}

prop_compose! {
    fn arb_inventory()(
        item_name in "[a-zA-Z ]{0,16}",
        in_stock in any::<bool>(),
        count in any::<u32>(),
        delta in any::<i64>(),
        weight in -1.0e12f64..1.0e12,
        tags in proptest::collection::btree_set(any::<i64>(), 0..6),
        prices in proptest::collection::hash_map("[a-z]{1,8}", any::<i64>(), 0..4),
        sizes in proptest::collection::vec(any::<i32>(), 0..6),
        note in proptest::option::of("[a-z]{0,10}"),
        priority in arb_priority(),
        id in any::<u128>(),
        (mantissa, scale) in (any::<i64>(), 0u32..10),
        (numer, denom) in (-10_000i64..10_000, 1i64..10_000),
        sku in arb_sku(),
    ) -> Inventory {
        Inventory {
            item_name,
            in_stock,
            count,
            delta,
            weight,
            tags,
            prices,
            sizes,
            note,
            priority,
            id: Uuid::from_u128(id),
            amount: Decimal::new(mantissa, scale),
            share: Rational64::new(numer, denom),
            sku,
        }
    }
}

prop_compose! {
    fn arb_schedule()(
        days in 0i64..60_000,
        micros_of_day in 0i64..86_400_000_000,
        offset_minutes in -1439i32..1439,
        window_micros in -1_000_000_000_000i64..1_000_000_000_000,
        blob in proptest::collection::vec(any::<u8>(), 0..32),
        location in "[a-z]{1,8}(/[a-z]{1,8}){0,3}",
    ) -> Schedule {
        let day = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap() + TimeDelta::days(days);
        let at = NaiveTime::from_hms_opt(0, 0, 0).unwrap() + TimeDelta::microseconds(micros_of_day);
        let zone = FixedOffset::east_opt(offset_minutes * 60).unwrap();
        let starts = day.and_time(at).and_local_timezone(zone).single().unwrap();
        Schedule {
            day,
            at,
            starts,
            zone,
            window: TimeDelta::microseconds(window_micros),
            blob: ByteString(blob),
            location: PathBuf::from(location),
        }
    }
}

prop_compose! {
    fn arb_layered()(
        layers in proptest::collection::vec(
            proptest::collection::vec(("[a-z]{1,6}", any::<i64>()), 0..4),
            0..4,
        ),
        flags in proptest::collection::btree_set(any::<i64>(), 0..6),
        labels in proptest::collection::btree_set("[a-z]{0,6}", 0..4),
    ) -> Layered {
        Layered {
            settings: ChainMap::new(
                layers.into_iter().map(|layer| layer.into_iter().collect()).collect(),
            ),
            flags: FrozenSet(flags),
            labels: FrozenSet(labels),
        }
    }
}

proptest! {
    #[test]
    fn prop_layered_round_trips_through_json(layered in arb_layered()) {
        let json = to_json(&layered, &Options::default()).unwrap();
        let decoded: Layered = from_json(json, &Options::default()).unwrap();
        prop_assert_eq!(decoded, layered);
    }

    #[test]
    fn prop_inventory_round_trips_through_json(inventory in arb_inventory()) {
        let json = to_json(&inventory, &Options::default()).unwrap();
        let decoded: Inventory = from_json(json, &Options::default()).unwrap();
        prop_assert_eq!(decoded, inventory);
    }

    #[test]
    fn prop_schedule_round_trips_through_json(schedule in arb_schedule()) {
        let json = to_json(&schedule, &Options::default()).unwrap();
        let decoded: Schedule = from_json(json, &Options::default()).unwrap();
        prop_assert_eq!(decoded, schedule);
    }

    #[test]
    fn prop_schedule_round_trips_raw(schedule in arb_schedule()) {
        let options = Options::default()
            .with_raw_bytes(true)
            .with_raw_datetime(true);
        let tree = to_tree(&schedule, &options).unwrap();
        let decoded: Schedule = from_tree(tree, &options).unwrap();
        prop_assert_eq!(decoded, schedule);
    }

    /// Encoding is deterministic and idempotent through a decode.
    #[test]
    fn prop_encode_is_stable(inventory in arb_inventory()) {
        let first = to_json(&inventory, &Options::default()).unwrap();
        let again: Inventory = from_json(first.clone(), &Options::default()).unwrap();
        prop_assert_eq!(to_json(&again, &Options::default()).unwrap(), first);
    }
}

#[test]
fn test_wire_keys_follow_rename_all() {
    let codec = Inventory::codec().unwrap();
    let keys: Vec<_> = codec.schema().fields.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(
        keys,
        [
            "itemName", "inStock", "count", "delta", "weight", "tags", "prices", "sizes", "note",
            "priority", "id", "amount", "share", "sku"
        ]
    );
}

#[test]
fn test_enum_values_on_the_wire() {
    let json = serde_json::to_value(
        to_tree(
            &Inventory {
                item_name: "bolt".into(),
                in_stock: true,
                count: 3,
                delta: -1,
                weight: 0.5,
                tags: BTreeSet::new(),
                prices: HashMap::new(),
                sizes: vec![],
                note: None,
                priority: Priority::High,
                id: Uuid::nil(),
                amount: Decimal::new(150, 2),
                share: Rational64::new(2, 4),
                sku: OneOf2::B("AB-123".into()),
            },
            &Options::default(),
        )
        .unwrap(),
    )
    .unwrap();
    assert_eq!(json["priority"], 5);
    assert_eq!(json["amount"], "1.50");
    assert_eq!(json["share"], "1/2");
    assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
    assert_eq!(json["sku"], "AB-123");
}

#[test]
fn test_chain_map_and_frozen_set_on_the_wire() {
    let layered = Layered {
        settings: ChainMap::new(vec![
            IndexMap::from([("port".to_string(), 8080)]),
            IndexMap::from([("port".to_string(), 80), ("workers".to_string(), 4)]),
        ]),
        flags: [2, 1].into_iter().collect(),
        labels: FrozenSet::default(),
    };
    let json = to_json(&layered, &Options::default()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "settings": [{"port": 8080}, {"port": 80, "workers": 4}],
            "flags": [1, 2],
            "labels": [],
        })
    );

    let decoded: Layered = from_json(
        serde_json::json!({
            "settings": [{"port": 8080}, {"port": 80, "workers": 4}],
            "flags": [2, 1, 2],
            "labels": ["x"],
        }),
        &Options::default(),
    )
    .unwrap();
    assert_eq!(decoded.settings.get(&"port".to_string()), Some(&8080));
    assert_eq!(decoded.settings.get(&"workers".to_string()), Some(&4));
    assert_eq!(decoded.flags, FrozenSet::from_iter([1, 2]));
    assert!(decoded.labels.contains("x"));

    let err = from_json::<Layered>(
        serde_json::json!({"settings": [{"port": 1}, 7], "flags": [], "labels": []}),
        &Options::default(),
    )
    .unwrap_err();
    assert_eq!(err.field(), Some("settings"));
}
