//! Forward/backward compatibility scenarios (spec §8): a struct decoded by
//! an older or newer schema than the one that encoded it must not lose the
//! fields it doesn't recognize.

use soia::serializer::{int32_serializer, string_serializer};
use soia::struct_ser::StructBuilder;
use soia::{Serializer, UnrecognizedFields};

#[derive(Debug, Clone, Default, PartialEq)]
struct RecordV1 {
    id: String,
    value: i32,
    unrecognized: UnrecognizedFields,
}

#[derive(Default)]
struct RecordV1Builder {
    id: String,
    value: i32,
    unrecognized: UnrecognizedFields,
}

fn v1_serializer() -> Serializer<RecordV1> {
    StructBuilder::new(
        "evolution.soia:Record",
        RecordV1Builder::default,
        |b: RecordV1Builder| RecordV1 {
            id: b.id,
            value: b.value,
            unrecognized: b.unrecognized,
        },
        |r: &RecordV1| &r.unrecognized,
        |b: &mut RecordV1Builder, u| b.unrecognized = u,
    )
    .add_field(0, "id", string_serializer(), |r: &RecordV1| r.id.clone(), |b, v| b.id = v)
    .add_field(1, "value", int32_serializer(), |r: &RecordV1| r.value, |b, v| b.value = v)
    .finalize()
}

#[derive(Debug, Clone, Default, PartialEq)]
struct RecordV2 {
    id: String,
    value: i32,
    note: String,
    unrecognized: UnrecognizedFields,
}

#[derive(Default)]
struct RecordV2Builder {
    id: String,
    value: i32,
    note: String,
    unrecognized: UnrecognizedFields,
}

fn v2_serializer() -> Serializer<RecordV2> {
    StructBuilder::new(
        "evolution.soia:Record",
        RecordV2Builder::default,
        |b: RecordV2Builder| RecordV2 {
            id: b.id,
            value: b.value,
            note: b.note,
            unrecognized: b.unrecognized,
        },
        |r: &RecordV2| &r.unrecognized,
        |b: &mut RecordV2Builder, u| b.unrecognized = u,
    )
    .add_field(0, "id", string_serializer(), |r: &RecordV2| r.id.clone(), |b, v| b.id = v)
    .add_field(1, "value", int32_serializer(), |r: &RecordV2| r.value, |b, v| b.value = v)
    .add_field(2, "note", string_serializer(), |r: &RecordV2| r.note.clone(), |b, v| b.note = v)
    .finalize()
}

#[test]
fn an_older_reader_preserves_a_newer_writers_extra_field() {
    let writer = v2_serializer();
    let reader = v1_serializer();

    let written = RecordV2 {
        id: "x".to_string(),
        value: 7,
        note: "from the future".to_string(),
        unrecognized: UnrecognizedFields::new(),
    };
    let bytes = writer.to_bytes(&written);

    let seen_by_v1 = reader.from_bytes(&bytes, true).unwrap();
    assert_eq!(seen_by_v1.id, "x");
    assert_eq!(seen_by_v1.value, 7);
    assert_eq!(seen_by_v1.unrecognized.len(), 1);

    // Round-tripping through the older reader reproduces the exact bytes
    // the newer writer produced — the field the reader doesn't know about
    // is carried through unchanged.
    let re_encoded = reader.to_bytes(&seen_by_v1);
    assert_eq!(re_encoded, bytes);
}

#[test]
fn a_newer_reader_defaults_a_field_an_older_writer_never_sent() {
    let writer = v1_serializer();
    let reader = v2_serializer();

    let written = RecordV1 {
        id: "y".to_string(),
        value: 3,
        unrecognized: UnrecognizedFields::new(),
    };
    let bytes = writer.to_bytes(&written);

    let seen_by_v2 = reader.from_bytes(&bytes, true).unwrap();
    assert_eq!(seen_by_v2.id, "y");
    assert_eq!(seen_by_v2.value, 3);
    assert_eq!(seen_by_v2.note, "");
    assert!(seen_by_v2.unrecognized.is_empty());
}

#[test]
fn removed_field_number_is_dropped_not_preserved() {
    // A build that has removed field number 1 (formerly "value"). A removed
    // number is a permanent tombstone, so its slot is discarded on decode
    // rather than carried through as unrecognized data.
    let writer = v1_serializer();
    let reader_without_value = StructBuilder::new(
        "evolution.soia:Record",
        RecordV1Builder::default,
        |b: RecordV1Builder| RecordV1 {
            id: b.id,
            value: 0,
            unrecognized: b.unrecognized,
        },
        |r: &RecordV1| &r.unrecognized,
        |b: &mut RecordV1Builder, u| b.unrecognized = u,
    )
    .removed_numbers([1])
    .add_field(0, "id", string_serializer(), |r: &RecordV1| r.id.clone(), |b, v| b.id = v)
    .finalize();

    let written = RecordV1 {
        id: "z".to_string(),
        value: 99,
        unrecognized: UnrecognizedFields::new(),
    };
    let bytes = writer.to_bytes(&written);
    let decoded = reader_without_value.from_bytes(&bytes, true).unwrap();
    assert_eq!(decoded.id, "z");
    assert!(decoded.unrecognized.is_empty());

    // The removed slot's value (99) is gone for good; re-encoding produces a
    // shorter array than what the writer originally sent.
    let re_encoded = reader_without_value.to_bytes(&decoded);
    assert_ne!(re_encoded, bytes);
}

#[test]
fn tail_beyond_slot_count_is_still_preserved_alongside_a_removed_gap() {
    // Reader has removed number 1 and doesn't know field number 2 either;
    // its slot_count is max(0, 1, -1) + 1 = 2, so a writer's field at
    // number 2 lands beyond slot_count and is captured as unrecognized,
    // while the in-range removed slot 1 is simply dropped.
    let writer = v2_serializer();
    let reader_without_value = StructBuilder::new(
        "evolution.soia:Record",
        RecordV1Builder::default,
        |b: RecordV1Builder| RecordV1 {
            id: b.id,
            value: 0,
            unrecognized: b.unrecognized,
        },
        |r: &RecordV1| &r.unrecognized,
        |b: &mut RecordV1Builder, u| b.unrecognized = u,
    )
    .removed_numbers([1])
    .add_field(0, "id", string_serializer(), |r: &RecordV1| r.id.clone(), |b, v| b.id = v)
    .finalize();

    let written = RecordV2 {
        id: "z".to_string(),
        value: 99,
        note: "kept".to_string(),
        unrecognized: UnrecognizedFields::new(),
    };
    let bytes = writer.to_bytes(&written);
    let decoded = reader_without_value.from_bytes(&bytes, true).unwrap();
    assert_eq!(decoded.id, "z");
    assert_eq!(decoded.unrecognized.len(), 1);
}
