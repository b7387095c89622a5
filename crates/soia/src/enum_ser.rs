//! Enum serializer (spec §4.5): tagged variants, either bare constants or
//! value-carrying wrappers, plus the distinguished "unknown" variant
//! (number 0) every soia enum starts with.
//!
//! Wrapper variants numbered 1-4 fold their number into the wire tag itself
//! (251-254); any other wrapper number falls back to a length-prefixed
//! number after tag 248. Constants are encoded as a bare number. A value
//! whose number isn't registered here (from a future schema version) is
//! preserved via [`UnrecognizedEnum`] when decoding with `keep_unrecognized`;
//! otherwise it resolves to variant 0, the "unknown" default every soia enum
//! starts with.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{Map as JsonMap, Value as Json};

use crate::error::Error;
use crate::serializer::{CodecImpl, Serializer};
use crate::unrecognized::{RawValue, UnrecognizedEnum};
use crate::varint::{self, Cursor};

type EncodeValueFn<T> = Arc<dyn Fn(&T, &mut Vec<u8>) + Send + Sync>;
type ToJsonValueFn<T> = Arc<dyn Fn(&T, bool) -> Json + Send + Sync>;
type DecodeValueFn<T> = Arc<dyn Fn(&mut Cursor, bool) -> Result<T, Error> + Send + Sync>;
type FromJsonValueFn<T> = Arc<dyn Fn(&Json, bool) -> Result<T, Error> + Send + Sync>;

enum VariantEntry<T> {
    Constant {
        number: u32,
        name: &'static str,
        make: fn() -> T,
    },
    Wrapper {
        number: u32,
        name: &'static str,
        encode_value: EncodeValueFn<T>,
        to_json_value: ToJsonValueFn<T>,
        decode_value: DecodeValueFn<T>,
        from_json_value: FromJsonValueFn<T>,
    },
}

impl<T> VariantEntry<T> {
    fn number(&self) -> u32 {
        match self {
            VariantEntry::Constant { number, .. } => *number,
            VariantEntry::Wrapper { number, .. } => *number,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            VariantEntry::Constant { name, .. } => *name,
            VariantEntry::Wrapper { name, .. } => *name,
        }
    }
}

/// Accumulates variant registrations for a generated enum type, then
/// produces the `Serializer<T>` generated code stores as `T::SERIALIZER`.
pub struct EnumBuilder<T> {
    record_id: String,
    removed_numbers: BTreeSet<u32>,
    variants: Vec<VariantEntry<T>>,
    variant_number: fn(&T) -> Option<u32>,
    get_unrecognized: Arc<dyn Fn(&T) -> Option<&UnrecognizedEnum> + Send + Sync>,
    make_unrecognized: fn(UnrecognizedEnum) -> T,
}

impl<T: 'static> EnumBuilder<T> {
    /// `variant_number` returns `None` when `value` doesn't correspond to any
    /// variant registered on this build (it's an [`UnrecognizedEnum`]
    /// payload); `get_unrecognized` then extracts that payload.
    pub fn new(
        record_id: impl Into<String>,
        variant_number: fn(&T) -> Option<u32>,
        get_unrecognized: impl Fn(&T) -> Option<&UnrecognizedEnum> + Send + Sync + 'static,
        make_unrecognized: fn(UnrecognizedEnum) -> T,
    ) -> Self {
        EnumBuilder {
            record_id: record_id.into(),
            removed_numbers: BTreeSet::new(),
            variants: Vec::new(),
            variant_number,
            get_unrecognized: Arc::new(get_unrecognized),
            make_unrecognized,
        }
    }

    #[must_use]
    pub fn removed_numbers(mut self, numbers: impl IntoIterator<Item = u32>) -> Self {
        self.removed_numbers.extend(numbers);
        self
    }

    #[must_use]
    pub fn add_constant(mut self, number: u32, name: &'static str, make: fn() -> T) -> Self {
        self.variants.push(VariantEntry::Constant {
            number,
            name,
            make,
        });
        self
    }

    /// `unwrap` is only ever called on a value this enum's `variant_number`
    /// has already identified as belonging to `number` — it doesn't need to
    /// handle other variants.
    #[must_use]
    pub fn add_variant<F: 'static>(
        mut self,
        number: u32,
        name: &'static str,
        serializer: Serializer<F>,
        wrap: fn(F) -> T,
        unwrap: impl Fn(&T) -> F + Send + Sync + 'static,
    ) -> Self {
        let unwrap = Arc::new(unwrap);

        let (u, ser) = (unwrap.clone(), serializer.clone());
        let encode_value: EncodeValueFn<T> = Arc::new(move |t, out| ser.encode_unframed(&u(t), out));

        let (u, ser) = (unwrap.clone(), serializer.clone());
        let to_json_value: ToJsonValueFn<T> =
            Arc::new(move |t, readable| ser.to_json_unframed(&u(t), readable));

        let ser = serializer.clone();
        let decode_value: DecodeValueFn<T> = Arc::new(move |cursor, keep_unrecognized| {
            Ok(wrap(ser.decode_unframed(cursor, keep_unrecognized)?))
        });

        let ser = serializer;
        let from_json_value: FromJsonValueFn<T> = Arc::new(move |json, keep_unrecognized| {
            Ok(wrap(ser.from_json_unframed(json, keep_unrecognized)?))
        });

        self.variants.push(VariantEntry::Wrapper {
            number,
            name,
            encode_value,
            to_json_value,
            decode_value,
            from_json_value,
        });
        self
    }

    pub fn finalize(self) -> Serializer<T> {
        crate::trace_finalize("enum", &self.record_id, self.variants.len());
        Serializer::new(EnumCodec {
            removed_numbers: self.removed_numbers,
            variants: self.variants,
            variant_number: self.variant_number,
            get_unrecognized: self.get_unrecognized,
            make_unrecognized: self.make_unrecognized,
        })
    }
}

struct EnumCodec<T> {
    #[allow(dead_code)]
    removed_numbers: BTreeSet<u32>,
    variants: Vec<VariantEntry<T>>,
    variant_number: fn(&T) -> Option<u32>,
    get_unrecognized: Arc<dyn Fn(&T) -> Option<&UnrecognizedEnum> + Send + Sync>,
    make_unrecognized: fn(UnrecognizedEnum) -> T,
}

impl<T> EnumCodec<T> {
    fn find(&self, number: u32) -> Option<&VariantEntry<T>> {
        self.variants.iter().find(|v| v.number() == number)
    }

    fn find_by_name(&self, name: &str) -> Option<&VariantEntry<T>> {
        self.variants.iter().find(|v| v.name() == name)
    }

    /// The value an unrecognized number resolves to when the caller declined
    /// to preserve unrecognized payloads: variant 0 if this build registers
    /// one, otherwise a numberless [`UnrecognizedEnum`].
    fn unknown_default(&self) -> T {
        match self.find(0) {
            Some(VariantEntry::Constant { make, .. }) => make(),
            _ => (self.make_unrecognized)(UnrecognizedEnum::new(0, None)),
        }
    }

    fn encode_number_and_tag(number: u32, out: &mut Vec<u8>, has_payload: bool) {
        if !has_payload {
            varint::encode_length_prefix(number as u64, out);
        } else if (1..=4).contains(&number) {
            out.push(varint::TAG_ENUM_WRAPPER_1 + (number as u8 - 1));
        } else {
            out.push(varint::TAG_ENUM_WRAPPER_N);
            varint::encode_length_prefix(number as u64, out);
        }
    }

    fn encode_unrecognized(&self, value: &T, out: &mut Vec<u8>) {
        match (self.get_unrecognized)(value) {
            Some(UnrecognizedEnum {
                number,
                value: Some(RawValue::Binary(bytes)),
            }) => {
                Self::encode_number_and_tag(*number, out, true);
                out.extend_from_slice(bytes);
            }
            Some(UnrecognizedEnum { number, value: None }) => {
                Self::encode_number_and_tag(*number, out, false);
            }
            // A JSON-captured unrecognized payload has no binary form to
            // splice; fall back to the zero/unknown sentinel rather than
            // fabricate bytes.
            _ => Self::encode_number_and_tag(0, out, false),
        }
    }
}

impl<T> CodecImpl<T> for EnumCodec<T> {
    fn encode(&self, value: &T, out: &mut Vec<u8>) {
        match (self.variant_number)(value).and_then(|n| self.find(n)) {
            Some(VariantEntry::Constant { number, .. }) => {
                Self::encode_number_and_tag(*number, out, false);
            }
            Some(VariantEntry::Wrapper {
                number,
                encode_value,
                ..
            }) => {
                Self::encode_number_and_tag(*number, out, true);
                encode_value(value, out);
            }
            None => self.encode_unrecognized(value, out),
        }
    }

    fn decode(&self, cursor: &mut Cursor, keep_unrecognized: bool) -> Result<T, Error> {
        let start = cursor.position();
        let tag = cursor.peek_u8()?;
        if (varint::TAG_ENUM_WRAPPER_1..=varint::TAG_ENUM_WRAPPER_4).contains(&tag) {
            cursor.read_u8()?;
            let number = (tag - varint::TAG_ENUM_WRAPPER_1) as u32 + 1;
            self.decode_wrapper(number, cursor, start, keep_unrecognized)
        } else if tag == varint::TAG_ENUM_WRAPPER_N {
            cursor.read_u8()?;
            let number = varint::decode_number(cursor)?
                .as_u64()
                .ok_or_else(|| Error::invalid_wire(start, "bad enum variant number"))?
                as u32;
            self.decode_wrapper(number, cursor, start, keep_unrecognized)
        } else {
            let number = varint::decode_number(cursor)?
                .as_u64()
                .ok_or_else(|| Error::invalid_wire(start, "bad enum variant number"))?
                as u32;
            match self.find(number) {
                Some(VariantEntry::Constant { make, .. }) => Ok(make()),
                Some(VariantEntry::Wrapper { .. }) => {
                    Err(Error::invalid_wire(start, "wrapper variant encoded as a bare number"))
                }
                None if keep_unrecognized => {
                    Ok((self.make_unrecognized)(UnrecognizedEnum::new(number, None)))
                }
                None => Ok(self.unknown_default()),
            }
        }
    }

    fn to_json(&self, value: &T, readable: bool) -> Json {
        match (self.variant_number)(value).and_then(|n| self.find(n)) {
            Some(VariantEntry::Constant { name, number, .. }) => {
                if readable {
                    Json::String(name.to_string())
                } else {
                    Json::Number((*number).into())
                }
            }
            Some(VariantEntry::Wrapper {
                name,
                number,
                to_json_value,
                ..
            }) => {
                let inner = to_json_value(value, readable);
                if readable {
                    let mut obj = JsonMap::new();
                    obj.insert("kind".to_string(), Json::String(name.to_string()));
                    obj.insert("value".to_string(), inner);
                    Json::Object(obj)
                } else {
                    Json::Array(vec![Json::Number((*number).into()), inner])
                }
            }
            None => self.unrecognized_to_json(value, readable),
        }
    }

    fn from_json(&self, json: &Json, keep_unrecognized: bool) -> Result<T, Error> {
        match json {
            Json::Number(n) => {
                let number = n
                    .as_u64()
                    .ok_or_else(|| Error::invalid_argument("enum number out of range"))?
                    as u32;
                match self.find(number) {
                    Some(VariantEntry::Constant { make, .. }) => Ok(make()),
                    Some(VariantEntry::Wrapper { .. }) => Err(Error::invalid_argument(format!(
                        "enum number {number} is a wrapper variant, not a bare constant"
                    ))),
                    None if keep_unrecognized => {
                        Ok((self.make_unrecognized)(UnrecognizedEnum::new(number, None)))
                    }
                    None => Ok(self.unknown_default()),
                }
            }
            Json::String(name) => match self.find_by_name(name) {
                Some(VariantEntry::Constant { make, .. }) => Ok(make()),
                _ => Err(Error::invalid_argument(format!("unknown enum constant: {name}"))),
            },
            Json::Array(items) => {
                let number = items
                    .first()
                    .and_then(Json::as_u64)
                    .ok_or_else(|| Error::invalid_argument("expected [number, value]"))?
                    as u32;
                let payload = items
                    .get(1)
                    .ok_or_else(|| Error::invalid_argument("expected [number, value]"))?;
                match self.find(number) {
                    Some(VariantEntry::Wrapper { from_json_value, .. }) => {
                        from_json_value(payload, keep_unrecognized)
                    }
                    Some(VariantEntry::Constant { .. }) => Err(Error::invalid_argument(format!(
                        "enum number {number} is a constant, not a wrapper variant"
                    ))),
                    None if keep_unrecognized => Ok((self.make_unrecognized)(UnrecognizedEnum::new(
                        number,
                        Some(RawValue::Json(payload.clone())),
                    ))),
                    None => Ok(self.unknown_default()),
                }
            }
            Json::Object(obj) => {
                let kind = obj
                    .get("kind")
                    .and_then(Json::as_str)
                    .ok_or_else(|| Error::invalid_argument("expected {\"kind\": ..., \"value\": ...}"))?;
                let value = obj
                    .get("value")
                    .ok_or_else(|| Error::invalid_argument("missing \"value\""))?;
                match self.find_by_name(kind) {
                    Some(VariantEntry::Wrapper { from_json_value, .. }) => {
                        from_json_value(value, keep_unrecognized)
                    }
                    _ => Err(Error::invalid_argument(format!("unknown enum variant: {kind}"))),
                }
            }
            _ => Err(Error::invalid_argument("unrecognized enum JSON shape")),
        }
    }

    fn is_default(&self, value: &T) -> bool {
        (self.variant_number)(value) == Some(0)
    }
}

impl<T> EnumCodec<T> {
    fn decode_wrapper(
        &self,
        number: u32,
        cursor: &mut Cursor,
        start: usize,
        keep_unrecognized: bool,
    ) -> Result<T, Error> {
        match self.find(number) {
            Some(VariantEntry::Wrapper { decode_value, .. }) => {
                decode_value(cursor, keep_unrecognized)
            }
            Some(VariantEntry::Constant { .. }) => {
                Err(Error::invalid_wire(start, "constant variant encoded as a wrapper"))
            }
            None if keep_unrecognized => {
                let payload_start = cursor.position();
                varint::decode_unused(cursor, false)?;
                let bytes = cursor.consumed_since(payload_start).to_vec();
                crate::trace_unrecognized("enum variant", number);
                Ok((self.make_unrecognized)(UnrecognizedEnum::new(
                    number,
                    Some(RawValue::Binary(bytes)),
                )))
            }
            None => {
                varint::decode_unused(cursor, false)?;
                Ok(self.unknown_default())
            }
        }
    }

    fn unrecognized_to_json(&self, value: &T, readable: bool) -> Json {
        match (self.get_unrecognized)(value) {
            Some(UnrecognizedEnum { number, value: None }) => {
                if readable {
                    Json::String(number.to_string())
                } else {
                    Json::Number((*number).into())
                }
            }
            Some(UnrecognizedEnum {
                number,
                value: Some(raw),
            }) => {
                let payload = match raw {
                    RawValue::Json(json) => json.clone(),
                    RawValue::Binary(_) => Json::Null,
                };
                if readable {
                    let mut obj = JsonMap::new();
                    obj.insert("kind".to_string(), Json::String(number.to_string()));
                    obj.insert("value".to_string(), payload);
                    Json::Object(obj)
                } else {
                    Json::Array(vec![Json::Number((*number).into()), payload])
                }
            }
            None => Json::Number(0.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::string_serializer;

    #[derive(Debug, Clone, PartialEq)]
    enum Color {
        Unknown,
        Red,
        Named(String),
        Other(UnrecognizedEnum),
    }

    fn color_serializer() -> Serializer<Color> {
        EnumBuilder::new(
            "test.soia:Color",
            |c: &Color| match c {
                Color::Unknown => Some(0),
                Color::Red => Some(1),
                Color::Named(_) => Some(2),
                Color::Other(_) => None,
            },
            |c: &Color| match c {
                Color::Other(u) => Some(u),
                _ => None,
            },
            Color::Other,
        )
        .add_constant(0, "unknown", || Color::Unknown)
        .add_constant(1, "red", || Color::Red)
        .add_variant(
            2,
            "named",
            string_serializer(),
            Color::Named,
            |c: &Color| match c {
                Color::Named(s) => s.clone(),
                _ => unreachable!(),
            },
        )
        .finalize()
    }

    #[test]
    fn constants_round_trip() {
        let s = color_serializer();
        assert_eq!(s.from_bytes(&s.to_bytes(&Color::Unknown), true).unwrap(), Color::Unknown);
        assert_eq!(s.from_bytes(&s.to_bytes(&Color::Red), true).unwrap(), Color::Red);
    }

    #[test]
    fn wrapper_variant_round_trips() {
        let s = color_serializer();
        let v = Color::Named("teal".to_string());
        assert_eq!(s.from_bytes(&s.to_bytes(&v), true).unwrap(), v);
    }

    #[test]
    fn unrecognized_constant_preserved() {
        let s = color_serializer();
        // variant number 9 isn't registered.
        let bytes = s.to_bytes(&Color::Other(UnrecognizedEnum::new(9, None)));
        let decoded = s.from_bytes(&bytes, true).unwrap();
        assert_eq!(decoded, Color::Other(UnrecognizedEnum::new(9, None)));
    }

    #[test]
    fn unrecognized_constant_resolves_to_unknown_when_not_kept() {
        let s = color_serializer();
        let bytes = s.to_bytes(&Color::Other(UnrecognizedEnum::new(9, None)));
        let decoded = s.from_bytes(&bytes, false).unwrap();
        assert_eq!(decoded, Color::Unknown);
    }

    #[test]
    fn default_is_the_unknown_variant() {
        let s = color_serializer();
        assert!(s.is_default(&Color::Unknown));
        assert!(!s.is_default(&Color::Red));
    }

    #[test]
    fn readable_json_uses_kind_value_shape() {
        let s = color_serializer();
        let json = s.to_json_unframed(&Color::Named("teal".into()), true);
        assert_eq!(json, serde_json::json!({"kind": "named", "value": "teal"}));
    }
}
