//! Exact-byte scenarios for the wire format (spec §8).

use soia::serializer::{bool_serializer, int32_serializer, string_serializer, uint64_serializer};
use soia::Serializer;

fn bytes_after_magic<T>(serializer: &Serializer<T>, value: &T) -> Vec<u8> {
    let framed = serializer.to_bytes(value);
    assert_eq!(&framed[..4], b"soia");
    framed[4..].to_vec()
}

#[test]
fn bool_false_is_a_single_zero_byte() {
    let s = bool_serializer();
    assert_eq!(bytes_after_magic(&s, &false), vec![0x00]);
    assert_eq!(bytes_after_magic(&s, &true), vec![0x01]);
}

#[test]
fn int32_immediate_range_is_the_tag_itself() {
    let s = int32_serializer();
    assert_eq!(bytes_after_magic(&s, &0), vec![0x00]);
    assert_eq!(bytes_after_magic(&s, &231), vec![0xE7]);
}

#[test]
fn int32_above_immediate_range_uses_u16_tag() {
    let s = int32_serializer();
    assert_eq!(bytes_after_magic(&s, &232), vec![0xE8, 0xE8, 0x00]);
}

#[test]
fn uint64_large_value_uses_u64_tag() {
    let s = uint64_serializer();
    let bytes = bytes_after_magic(&s, &10_000_000_000u64);
    assert_eq!(bytes[0], 0xEA);
    assert_eq!(bytes.len(), 9);
}

#[test]
fn empty_string_is_its_own_tag() {
    let s = string_serializer();
    assert_eq!(bytes_after_magic(&s, &String::new()), vec![0xF2]);
}

#[test]
fn string_carries_a_length_prefix_and_utf8_bytes() {
    let s = string_serializer();
    assert_eq!(bytes_after_magic(&s, &"AB".to_string()), vec![0xF3, 0x02, 0x41, 0x42]);
}

#[test]
fn from_bytes_without_magic_falls_back_to_json() {
    let s = int32_serializer();
    assert_eq!(s.from_bytes(b"42", true).unwrap(), 42);
}

#[test]
fn from_bytes_rejects_invalid_utf8_without_magic() {
    let s = int32_serializer();
    assert!(s.from_bytes(&[0xFF, 0xFE], true).is_err());
}

#[test]
fn from_bytes_rejects_trailing_bytes() {
    let s = int32_serializer();
    let mut bytes = s.to_bytes(&1);
    bytes.push(0xFF);
    assert!(s.from_bytes(&bytes, true).is_err());
}
