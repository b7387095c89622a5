//! Property-based round-trip scenarios (spec §8): for arbitrary values,
//! `from_bytes(to_bytes(v)) == v` and `from_json_code(to_json_code(v)) == v`.

use proptest::prelude::*;
use soia::list::{keyed_list_serializer, list_serializer, List, ListKey};
use soia::optional::optional_serializer;
use soia::serializer::{int32_serializer, int64_serializer, string_serializer, uint64_serializer};
use soia::struct_ser::StructBuilder;
use soia::{Serializer, UnrecognizedFields};

proptest! {
    #[test]
    fn int32_round_trips_through_bytes_and_json(v in any::<i32>()) {
        let s = int32_serializer();
        prop_assert_eq!(s.from_bytes(&s.to_bytes(&v), true).unwrap(), v);
        prop_assert_eq!(s.from_json_code(&s.to_json_code(&v, false), true).unwrap(), v);
        prop_assert_eq!(s.from_json_code(&s.to_json_code(&v, true), true).unwrap(), v);
    }

    #[test]
    fn int64_round_trips(v in any::<i64>()) {
        let s = int64_serializer();
        prop_assert_eq!(s.from_bytes(&s.to_bytes(&v), true).unwrap(), v);
    }

    #[test]
    fn uint64_round_trips(v in any::<u64>()) {
        let s = uint64_serializer();
        prop_assert_eq!(s.from_bytes(&s.to_bytes(&v), true).unwrap(), v);
    }

    #[test]
    fn string_round_trips(v in ".*") {
        let s = string_serializer();
        prop_assert_eq!(s.from_bytes(&s.to_bytes(&v), true).unwrap(), v.clone());
        prop_assert_eq!(s.from_json_code(&s.to_json_code(&v, false), true).unwrap(), v);
    }

    #[test]
    fn optional_string_round_trips(v in proptest::option::of(".*")) {
        let s = optional_serializer(string_serializer());
        prop_assert_eq!(s.from_bytes(&s.to_bytes(&v), true).unwrap(), v);
    }

    #[test]
    fn plain_list_round_trips(items in proptest::collection::vec(any::<i32>(), 0..20)) {
        let s = list_serializer(int32_serializer());
        let list = List::plain(items.clone());
        let decoded = s.from_bytes(&s.to_bytes(&list), true).unwrap();
        prop_assert_eq!(decoded.items().to_vec(), items);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Tagged {
    id: String,
    value: i32,
    unrecognized: UnrecognizedFields,
}

#[derive(Default)]
struct TaggedBuilder {
    id: String,
    value: i32,
    unrecognized: UnrecognizedFields,
}

fn tagged_serializer() -> Serializer<Tagged> {
    StructBuilder::new(
        "test.soia:Tagged",
        TaggedBuilder::default,
        |b: TaggedBuilder| Tagged {
            id: b.id,
            value: b.value,
            unrecognized: b.unrecognized,
        },
        |t: &Tagged| &t.unrecognized,
        |b: &mut TaggedBuilder, u| b.unrecognized = u,
    )
    .add_field(0, "id", string_serializer(), |t: &Tagged| t.id.clone(), |b: &mut TaggedBuilder, v| b.id = v)
    .add_field(1, "value", int32_serializer(), |t: &Tagged| t.value, |b: &mut TaggedBuilder, v| b.value = v)
    .finalize()
}

proptest! {
    #[test]
    fn struct_round_trips(id in "[a-z]{0,8}", value in any::<i32>()) {
        let s = tagged_serializer();
        let t = Tagged { id, value, unrecognized: UnrecognizedFields::new() };
        prop_assert_eq!(s.from_bytes(&s.to_bytes(&t), true).unwrap(), t.clone());
        prop_assert_eq!(s.from_json_code(&s.to_json_code(&t, true), true).unwrap(), t);
    }
}

#[test]
fn keyed_list_indexes_survive_a_round_trip() {
    fn key_of(t: &Tagged) -> ListKey {
        ListKey::from(t.id.clone())
    }
    let s = keyed_list_serializer(tagged_serializer(), "id", key_of);
    let list = List::keyed(
        vec![
            Tagged { id: "a".into(), value: 1, unrecognized: UnrecognizedFields::new() },
            Tagged { id: "b".into(), value: 2, unrecognized: UnrecognizedFields::new() },
        ],
        "id",
        key_of,
    );
    let decoded = s.from_bytes(&s.to_bytes(&list), true).unwrap();
    assert_eq!(decoded.get(&ListKey::from("b")).unwrap().value, 2);
}
