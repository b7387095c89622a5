//! The consumer-facing façade generated code is built around (spec §6).
//!
//! [`Serializer<T>`] is what a generated `Foo` type exposes as `Foo::SERIALIZER`
//! (or similar): a thread-shareable, cheaply-cloned handle over whichever
//! [`CodecImpl`] actually knows how to encode/decode `T`. Struct and enum
//! codecs are built up through [`crate::struct_ser::StructBuilder`] and
//! [`crate::enum_ser::EnumBuilder`]; this module only owns the type-erased
//! wrapper and the handful of constructors (`primitive`, `optional`, `array`,
//! `recursive`) that don't need their own file.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::Value as Json;

use crate::error::Error;
use crate::framing;
use crate::primitive;
use crate::varint::Cursor;

/// The operations every wire/JSON representation for `T` must support.
/// Implemented by primitives (inline in this module), [`crate::optional`],
/// [`crate::list`], [`crate::struct_ser`], and [`crate::enum_ser`].
pub trait CodecImpl<T> {
    fn encode(&self, value: &T, out: &mut Vec<u8>);
    fn decode(&self, cursor: &mut Cursor, keep_unrecognized: bool) -> Result<T, Error>;
    fn to_json(&self, value: &T, readable: bool) -> Json;
    fn from_json(&self, json: &Json, keep_unrecognized: bool) -> Result<T, Error>;
    fn is_default(&self, value: &T) -> bool;
}

/// A reference-counted, type-erased codec for `T`. Cloning is an `Arc` bump;
/// generated code stores one of these per field/type and shares it freely
/// across threads.
pub struct Serializer<T>(Arc<dyn CodecImpl<T> + Send + Sync>);

impl<T> Clone for Serializer<T> {
    fn clone(&self) -> Self {
        Serializer(self.0.clone())
    }
}

impl<T> fmt::Debug for Serializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer").finish_non_exhaustive()
    }
}

impl<T> Serializer<T> {
    pub fn new(codec: impl CodecImpl<T> + Send + Sync + 'static) -> Self {
        Serializer(Arc::new(codec))
    }

    pub fn is_default(&self, value: &T) -> bool {
        self.0.is_default(value)
    }

    /// Encodes `value` into the struct/array-slot wire form, with no
    /// top-level framing. Used by struct/enum/list serializers composing a
    /// field's bytes into their own payload.
    pub fn encode_unframed(&self, value: &T, out: &mut Vec<u8>) {
        self.0.encode(value, out)
    }

    /// Decodes one unframed value. `keep_unrecognized` controls whether a
    /// struct/enum field or variant this build doesn't recognize is
    /// preserved for re-encoding or silently dropped to its default.
    pub fn decode_unframed(&self, cursor: &mut Cursor, keep_unrecognized: bool) -> Result<T, Error> {
        self.0.decode(cursor, keep_unrecognized)
    }

    pub fn to_json_unframed(&self, value: &T, readable: bool) -> Json {
        self.0.to_json(value, readable)
    }

    pub fn from_json_unframed(&self, json: &Json, keep_unrecognized: bool) -> Result<T, Error> {
        self.0.from_json(json, keep_unrecognized)
    }

    /// `to_bytes(value)`: the 4-byte `"soia"` magic followed by `value`'s
    /// unframed binary encoding (spec §4.6).
    pub fn to_bytes(&self, value: &T) -> Vec<u8> {
        framing::frame(|out| self.0.encode(value, out))
    }

    /// `from_bytes(bytes)`: strips and checks the magic, decodes exactly one
    /// value, and rejects trailing bytes. If `bytes` doesn't start with the
    /// `"soia"` magic, the whole buffer is treated as UTF-8 JSON and
    /// dispatched to [`Self::from_json_code`] instead (spec §4.6).
    pub fn from_bytes(&self, bytes: &[u8], keep_unrecognized: bool) -> Result<T, Error> {
        if framing::has_magic(bytes) {
            framing::unframe(bytes, |cursor| self.0.decode(cursor, keep_unrecognized))
        } else {
            let code = std::str::from_utf8(bytes)
                .map_err(|_| Error::invalid_argument("not valid UTF-8 JSON"))?;
            self.from_json_code(code, keep_unrecognized)
        }
    }

    pub fn to_json_code(&self, value: &T, readable: bool) -> String {
        self.0.to_json(value, readable).to_string()
    }

    pub fn from_json_code(&self, code: &str, keep_unrecognized: bool) -> Result<T, Error> {
        let json: Json = serde_json::from_str(code)
            .map_err(|e| Error::invalid_argument(format!("invalid JSON: {e}")))?;
        self.0.from_json(&json, keep_unrecognized)
    }
}

/// Builds a `Serializer<T>` that may need to decode/encode itself — e.g. a
/// struct with an `Optional<Self>` field. `T`'s own `Serializer` can't be
/// constructed before `T`'s codec exists, so `recursive` hands back a handle
/// backed by a [`OnceLock`] that's filled in the first time it's actually
/// used, by calling `build` exactly once.
///
/// This mirrors how reflection libraries resolve self-referential type
/// descriptions: publish a lazily-filled indirection first, recurse into it
/// freely, and only force it open once the rest of the graph exists.
pub fn recursive<T: 'static>(build: fn() -> Serializer<T>) -> Serializer<T> {
    Serializer::new(RecursiveCodec {
        build,
        inner: OnceLock::new(),
    })
}

struct RecursiveCodec<T: 'static> {
    build: fn() -> Serializer<T>,
    inner: OnceLock<Serializer<T>>,
}

impl<T> RecursiveCodec<T> {
    fn inner(&self) -> &Serializer<T> {
        self.inner.get_or_init(|| (self.build)())
    }
}

impl<T> CodecImpl<T> for RecursiveCodec<T> {
    fn encode(&self, value: &T, out: &mut Vec<u8>) {
        self.inner().encode_unframed(value, out)
    }

    fn decode(&self, cursor: &mut Cursor, keep_unrecognized: bool) -> Result<T, Error> {
        self.inner().decode_unframed(cursor, keep_unrecognized)
    }

    fn to_json(&self, value: &T, readable: bool) -> Json {
        self.inner().to_json_unframed(value, readable)
    }

    fn from_json(&self, json: &Json, keep_unrecognized: bool) -> Result<T, Error> {
        self.inner().from_json_unframed(json, keep_unrecognized)
    }

    fn is_default(&self, value: &T) -> bool {
        self.inner().is_default(value)
    }
}

macro_rules! primitive_codec {
    ($name:ident, $ty:ty, $encode:path, $decode:path, $to_json:path, $from_json:path, $is_default:path) => {
        struct $name;

        impl CodecImpl<$ty> for $name {
            fn encode(&self, value: &$ty, out: &mut Vec<u8>) {
                $encode(value.clone(), out)
            }

            fn decode(&self, cursor: &mut Cursor, _keep_unrecognized: bool) -> Result<$ty, Error> {
                $decode(cursor)
            }

            fn to_json(&self, value: &$ty, readable: bool) -> Json {
                $to_json(value.clone(), readable)
            }

            fn from_json(&self, json: &Json, _keep_unrecognized: bool) -> Result<$ty, Error> {
                $from_json(json)
            }

            fn is_default(&self, value: &$ty) -> bool {
                $is_default(value.clone())
            }
        }
    };
}

// bool/int32/int64/uint64/float32/float64/timestamp don't take a `readable`
// flag in their JSON form, except timestamp; wrap the ones that don't with a
// 2-arg shim so the macro above can treat every kind uniformly.
fn bool_to_json_shim(v: bool, _readable: bool) -> Json {
    primitive::bool_to_json(v)
}
fn bool_from_json_shim(json: &Json) -> Result<bool, Error> {
    Ok(primitive::bool_from_json(json))
}
fn int32_to_json_shim(v: i32, _readable: bool) -> Json {
    primitive::int32_to_json(v)
}
fn int64_to_json_shim(v: i64, _readable: bool) -> Json {
    primitive::int64_to_json(v)
}
fn uint64_to_json_shim(v: u64, _readable: bool) -> Json {
    primitive::uint64_to_json(v)
}
fn encode_bool_shim(v: bool, out: &mut Vec<u8>) {
    primitive::encode_bool(v, out)
}
fn encode_int32_shim(v: i32, out: &mut Vec<u8>) {
    primitive::encode_int32(v, out)
}
fn encode_int64_shim(v: i64, out: &mut Vec<u8>) {
    primitive::encode_int64(v, out)
}
fn encode_uint64_shim(v: u64, out: &mut Vec<u8>) {
    primitive::encode_uint64(v, out)
}
fn encode_float32_shim(v: f32, out: &mut Vec<u8>) {
    primitive::encode_float32(v, out)
}
fn encode_float64_shim(v: f64, out: &mut Vec<u8>) {
    primitive::encode_float64(v, out)
}
fn encode_timestamp_shim(v: i64, out: &mut Vec<u8>) {
    primitive::encode_timestamp(v, out)
}
fn float32_to_json_shim(v: f32, _readable: bool) -> Json {
    primitive::float32_to_json(v)
}
fn float64_to_json_shim(v: f64, _readable: bool) -> Json {
    primitive::float64_to_json(v)
}

primitive_codec!(
    BoolCodec,
    bool,
    encode_bool_shim,
    primitive::decode_bool,
    bool_to_json_shim,
    bool_from_json_shim,
    primitive::is_default_bool
);
primitive_codec!(
    Int32Codec,
    i32,
    encode_int32_shim,
    primitive::decode_int32,
    int32_to_json_shim,
    primitive::int32_from_json,
    primitive::is_default_int32
);
primitive_codec!(
    Int64Codec,
    i64,
    encode_int64_shim,
    primitive::decode_int64,
    int64_to_json_shim,
    primitive::int64_from_json,
    primitive::is_default_int64
);
primitive_codec!(
    Uint64Codec,
    u64,
    encode_uint64_shim,
    primitive::decode_uint64,
    uint64_to_json_shim,
    primitive::uint64_from_json,
    primitive::is_default_uint64
);
primitive_codec!(
    Float32Codec,
    f32,
    encode_float32_shim,
    primitive::decode_float32,
    float32_to_json_shim,
    primitive::float32_from_json,
    primitive::is_default_float32
);
primitive_codec!(
    Float64Codec,
    f64,
    encode_float64_shim,
    primitive::decode_float64,
    float64_to_json_shim,
    primitive::float64_from_json,
    primitive::is_default_float64
);
primitive_codec!(
    TimestampCodec,
    i64,
    encode_timestamp_shim,
    primitive::decode_timestamp,
    primitive::timestamp_to_json,
    primitive::timestamp_from_json,
    primitive::is_default_timestamp_millis
);

struct StringCodec;

impl CodecImpl<String> for StringCodec {
    fn encode(&self, value: &String, out: &mut Vec<u8>) {
        primitive::encode_string(value, out)
    }

    fn decode(&self, cursor: &mut Cursor, _keep_unrecognized: bool) -> Result<String, Error> {
        primitive::decode_string(cursor)
    }

    fn to_json(&self, value: &String, _readable: bool) -> Json {
        primitive::string_to_json(value)
    }

    fn from_json(&self, json: &Json, _keep_unrecognized: bool) -> Result<String, Error> {
        primitive::string_from_json(json)
    }

    fn is_default(&self, value: &String) -> bool {
        primitive::is_default_string(value)
    }
}

struct BytesCodec;

impl CodecImpl<Vec<u8>> for BytesCodec {
    fn encode(&self, value: &Vec<u8>, out: &mut Vec<u8>) {
        primitive::encode_bytes(value, out)
    }

    fn decode(&self, cursor: &mut Cursor, _keep_unrecognized: bool) -> Result<Vec<u8>, Error> {
        primitive::decode_bytes(cursor)
    }

    fn to_json(&self, value: &Vec<u8>, readable: bool) -> Json {
        primitive::bytes_to_json(value, readable)
    }

    fn from_json(&self, json: &Json, _keep_unrecognized: bool) -> Result<Vec<u8>, Error> {
        primitive::bytes_from_json(json)
    }

    fn is_default(&self, value: &Vec<u8>) -> bool {
        primitive::is_default_bytes(value)
    }
}

pub fn bool_serializer() -> Serializer<bool> {
    Serializer::new(BoolCodec)
}
pub fn int32_serializer() -> Serializer<i32> {
    Serializer::new(Int32Codec)
}
pub fn int64_serializer() -> Serializer<i64> {
    Serializer::new(Int64Codec)
}
pub fn uint64_serializer() -> Serializer<u64> {
    Serializer::new(Uint64Codec)
}
pub fn float32_serializer() -> Serializer<f32> {
    Serializer::new(Float32Codec)
}
pub fn float64_serializer() -> Serializer<f64> {
    Serializer::new(Float64Codec)
}
pub fn timestamp_millis_serializer() -> Serializer<i64> {
    Serializer::new(TimestampCodec)
}
pub fn string_serializer() -> Serializer<String> {
    Serializer::new(StringCodec)
}
pub fn bytes_serializer() -> Serializer<Vec<u8>> {
    Serializer::new(BytesCodec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_serializer_round_trips_bytes_and_json() {
        let s = int32_serializer();
        let bytes = s.to_bytes(&-12345);
        assert_eq!(s.from_bytes(&bytes, true).unwrap(), -12345);
        let code = s.to_json_code(&-12345, false);
        assert_eq!(s.from_json_code(&code, true).unwrap(), -12345);
    }

    #[test]
    fn recursive_resolves_lazily() {
        fn build() -> Serializer<i32> {
            int32_serializer()
        }
        let s = recursive(build);
        assert_eq!(s.from_bytes(&s.to_bytes(&42), true).unwrap(), 42);
    }
}
