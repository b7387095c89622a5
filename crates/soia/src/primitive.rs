//! Encoders/decoders for the nine scalar kinds (spec §4.1): `bool`, `int32`,
//! `int64`, `uint64`, `float32`, `float64`, `string`, `bytes`, `timestamp`.
//!
//! Each kind gets a free-function encode/decode/JSON/`is_default` quartet;
//! [`crate::serializer::primitive_serializer`] wires these into the
//! `Serializer<T>` façade generated code actually calls.

use serde_json::Value as Json;

use crate::error::Error;
use crate::varint::{self, Cursor};

/// Clamp bounds for timestamps, in unix milliseconds (spec §4.1).
pub const MIN_TIMESTAMP_MILLIS: i64 = -8_640_000_000_000_000;
pub const MAX_TIMESTAMP_MILLIS: i64 = 8_640_000_000_000_000;

/// int64/uint64 values outside this range round-trip through JSON as
/// strings rather than number literals (spec §9, "64-bit integers on JSON").
const MAX_SAFE_INTEGER: i64 = (1i64 << 53) - 1;

pub fn clamp_timestamp_millis(millis: i64) -> i64 {
    millis.clamp(MIN_TIMESTAMP_MILLIS, MAX_TIMESTAMP_MILLIS)
}

// ---------------------------------------------------------------- bool ----

pub fn is_default_bool(v: bool) -> bool {
    !v
}

pub fn encode_bool(v: bool, out: &mut Vec<u8>) {
    out.push(v as u8);
}

pub fn decode_bool(cursor: &mut Cursor) -> Result<bool, Error> {
    let start = cursor.position();
    let tag = cursor.read_u8()?;
    match tag {
        0..=varint::MAX_IMMEDIATE => Ok(tag != 0),
        _ => Err(Error::invalid_wire(start, "expected a bool tag")),
    }
}

pub fn bool_to_json(v: bool) -> Json {
    Json::Bool(v)
}

/// `"0"`, `"0.0"`, `"-0.0"`, `"false"` all map to `false`; every other JSON
/// shape (including any other string) maps to `true`.
pub fn bool_from_json(json: &Json) -> bool {
    match json {
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_f64() != Some(0.0),
        Json::String(s) => !matches!(s.as_str(), "0" | "0.0" | "-0.0" | "false"),
        _ => true,
    }
}

// --------------------------------------------------------------- int32 ----

pub fn is_default_int32(v: i32) -> bool {
    v == 0
}

pub fn encode_int32(v: i32, out: &mut Vec<u8>) {
    if v >= 0 {
        let u = v as u32;
        if u <= varint::MAX_IMMEDIATE as u32 {
            out.push(u as u8);
        } else if u < (1 << 16) {
            out.push(varint::TAG_U16);
            out.extend_from_slice(&(u as u16).to_le_bytes());
        } else {
            out.push(varint::TAG_U32);
            out.extend_from_slice(&u.to_le_bytes());
        }
    } else if v >= -256 {
        out.push(varint::TAG_NEG_I8);
        out.push(v as i8 as u8);
    } else if v >= -65536 {
        out.push(varint::TAG_NEG_I16);
        out.extend_from_slice(&(v as i16).to_le_bytes());
    } else {
        out.push(varint::TAG_NEG_I32);
        out.extend_from_slice(&v.to_le_bytes());
    }
}

pub fn decode_int32(cursor: &mut Cursor) -> Result<i32, Error> {
    let start = cursor.position();
    let tag = cursor.read_u8()?;
    match tag {
        0..=varint::MAX_IMMEDIATE => Ok(tag as i32),
        varint::TAG_U16 => Ok(cursor.read_u16_le()? as i32),
        varint::TAG_U32 => Ok(cursor.read_u32_le()? as i32),
        varint::TAG_NEG_I8 => Ok(cursor.read_u8()? as i32 - 256),
        varint::TAG_NEG_I16 => Ok(cursor.read_u16_le()? as i32 - 65536),
        varint::TAG_NEG_I32 => Ok(cursor.read_u32_le()? as i32),
        _ => Err(Error::invalid_wire(start, "expected an int32 tag")),
    }
}

pub fn int32_to_json(v: i32) -> Json {
    Json::Number(v.into())
}

pub fn int32_from_json(json: &Json) -> Result<i32, Error> {
    match json {
        Json::Number(n) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| Error::invalid_argument("int32 out of range")),
        Json::String(s) => s
            .parse::<i32>()
            .map_err(|_| Error::invalid_argument(format!("not an int32: {s}"))),
        _ => Err(Error::invalid_argument("expected a number for int32")),
    }
}

// --------------------------------------------------------------- int64 ----

pub fn is_default_int64(v: i64) -> bool {
    v == 0
}

pub fn encode_int64(v: i64, out: &mut Vec<u8>) {
    if (i32::MIN as i64..=i32::MAX as i64).contains(&v) {
        encode_int32(v as i32, out);
    } else {
        out.push(varint::TAG_I64);
        out.extend_from_slice(&v.to_le_bytes());
    }
}

pub fn decode_int64(cursor: &mut Cursor) -> Result<i64, Error> {
    let start = cursor.position();
    let tag = cursor.peek_u8()?;
    if tag == varint::TAG_I64 {
        cursor.read_u8()?;
        cursor.read_i64_le()
    } else {
        decode_int32(cursor)
            .map(i64::from)
            .map_err(|_| Error::invalid_wire(start, "expected an int64 tag"))
    }
}

pub fn int64_to_json(v: i64) -> Json {
    if v.abs() <= MAX_SAFE_INTEGER {
        Json::Number(v.into())
    } else {
        Json::String(v.to_string())
    }
}

pub fn int64_from_json(json: &Json) -> Result<i64, Error> {
    match json {
        Json::Number(n) => n
            .as_i64()
            .ok_or_else(|| Error::invalid_argument("int64 out of range")),
        Json::String(s) => s
            .parse::<i64>()
            .map_err(|_| Error::invalid_argument(format!("not an int64: {s}"))),
        _ => Err(Error::invalid_argument("expected a number for int64")),
    }
}

// -------------------------------------------------------------- uint64 ----

pub fn is_default_uint64(v: u64) -> bool {
    v == 0
}

pub fn encode_uint64(v: u64, out: &mut Vec<u8>) {
    varint::encode_length_prefix(v, out);
}

pub fn decode_uint64(cursor: &mut Cursor) -> Result<u64, Error> {
    let start = cursor.position();
    match varint::decode_number(cursor)? {
        varint::Number::Unsigned(n) => Ok(n),
        _ => Err(Error::invalid_wire(start, "expected a uint64 tag")),
    }
}

pub fn uint64_to_json(v: u64) -> Json {
    if v <= MAX_SAFE_INTEGER as u64 {
        Json::Number(v.into())
    } else {
        Json::String(v.to_string())
    }
}

pub fn uint64_from_json(json: &Json) -> Result<u64, Error> {
    match json {
        Json::Number(n) => n
            .as_u64()
            .ok_or_else(|| Error::invalid_argument("uint64 out of range")),
        Json::String(s) => s
            .parse::<u64>()
            .map_err(|_| Error::invalid_argument(format!("not a uint64: {s}"))),
        _ => Err(Error::invalid_argument("expected a number for uint64")),
    }
}

// ------------------------------------------------------------- float32 ----

pub fn is_default_float32(v: f32) -> bool {
    v.to_bits() == 0
}

pub fn encode_float32(v: f32, out: &mut Vec<u8>) {
    if v.to_bits() == 0 {
        out.push(0);
    } else {
        out.push(varint::TAG_F32);
        out.extend_from_slice(&v.to_bits().to_le_bytes());
    }
}

pub fn decode_float32(cursor: &mut Cursor) -> Result<f32, Error> {
    let start = cursor.position();
    let tag = cursor.read_u8()?;
    match tag {
        0 => Ok(0.0),
        varint::TAG_F32 => Ok(f32::from_bits(cursor.read_u32_le()?)),
        _ => Err(Error::invalid_wire(start, "expected a float32 tag")),
    }
}

pub fn float32_to_json(v: f32) -> Json {
    float_to_json(v as f64, |s| serde_json::Number::from_f64(s as f64))
}

pub fn float32_from_json(json: &Json) -> Result<f32, Error> {
    float_from_json(json).map(|v| v as f32)
}

// ------------------------------------------------------------- float64 ----

pub fn is_default_float64(v: f64) -> bool {
    v.to_bits() == 0
}

pub fn encode_float64(v: f64, out: &mut Vec<u8>) {
    if v.to_bits() == 0 {
        out.push(0);
    } else {
        out.push(varint::TAG_F64);
        out.extend_from_slice(&v.to_bits().to_le_bytes());
    }
}

pub fn decode_float64(cursor: &mut Cursor) -> Result<f64, Error> {
    let start = cursor.position();
    let tag = cursor.read_u8()?;
    match tag {
        0 => Ok(0.0),
        varint::TAG_F64 => Ok(f64::from_bits(cursor.read_u64_le()?)),
        _ => Err(Error::invalid_wire(start, "expected a float64 tag")),
    }
}

pub fn float64_to_json(v: f64) -> Json {
    float_to_json(v, serde_json::Number::from_f64)
}

pub fn float64_from_json(json: &Json) -> Result<f64, Error> {
    float_from_json(json)
}

fn float_to_json(v: f64, make_number: impl Fn(f64) -> Option<serde_json::Number>) -> Json {
    if v.is_finite() {
        make_number(v).map(Json::Number).unwrap_or(Json::Null)
    } else if v.is_nan() {
        Json::String("NaN".to_string())
    } else if v > 0.0 {
        Json::String("Infinity".to_string())
    } else {
        Json::String("-Infinity".to_string())
    }
}

fn float_from_json(json: &Json) -> Result<f64, Error> {
    match json {
        Json::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::invalid_argument("not a finite float")),
        Json::String(s) => match s.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => other
                .parse::<f64>()
                .map_err(|_| Error::invalid_argument(format!("not a float: {other}"))),
        },
        _ => Err(Error::invalid_argument("expected a number for float")),
    }
}

// -------------------------------------------------------------- string ----

pub fn is_default_string(v: &str) -> bool {
    v.is_empty()
}

pub fn encode_string(v: &str, out: &mut Vec<u8>) {
    if v.is_empty() {
        out.push(varint::TAG_EMPTY_STRING);
    } else {
        out.push(varint::TAG_STRING);
        varint::encode_length_prefix(v.len() as u64, out);
        out.extend_from_slice(v.as_bytes());
    }
}

pub fn decode_string(cursor: &mut Cursor) -> Result<String, Error> {
    let start = cursor.position();
    let tag = cursor.read_u8()?;
    match tag {
        0 | varint::TAG_EMPTY_STRING => Ok(String::new()),
        varint::TAG_STRING => {
            let len = decode_len_prefix(cursor)?;
            let bytes = cursor.read_bytes(len)?;
            String::from_utf8(bytes.to_vec())
                .map_err(|_| Error::invalid_wire(start, "string is not valid UTF-8"))
        }
        _ => Err(Error::invalid_wire(start, "expected a string tag")),
    }
}

pub fn string_to_json(v: &str) -> Json {
    Json::String(v.to_string())
}

pub fn string_from_json(json: &Json) -> Result<String, Error> {
    match json {
        Json::String(s) => Ok(s.clone()),
        _ => Err(Error::invalid_argument("expected a string")),
    }
}

// --------------------------------------------------------------- bytes ----

pub fn is_default_bytes(v: &[u8]) -> bool {
    v.is_empty()
}

pub fn encode_bytes(v: &[u8], out: &mut Vec<u8>) {
    if v.is_empty() {
        out.push(varint::TAG_EMPTY_BYTES);
    } else {
        out.push(varint::TAG_BYTES);
        varint::encode_length_prefix(v.len() as u64, out);
        out.extend_from_slice(v);
    }
}

pub fn decode_bytes(cursor: &mut Cursor) -> Result<Vec<u8>, Error> {
    let start = cursor.position();
    let tag = cursor.read_u8()?;
    match tag {
        0 | varint::TAG_EMPTY_BYTES => Ok(Vec::new()),
        varint::TAG_BYTES => {
            let len = decode_len_prefix(cursor)?;
            Ok(cursor.read_bytes(len)?.to_vec())
        }
        _ => Err(Error::invalid_wire(start, "expected a bytes tag")),
    }
}

/// Dense JSON: base64. Readable JSON: `"hex:<hex>"`. Decoders accept either.
pub fn bytes_to_json(v: &[u8], readable: bool) -> Json {
    use base64::Engine;
    if readable {
        Json::String(format!("hex:{}", hex::encode(v)))
    } else {
        Json::String(base64::engine::general_purpose::STANDARD.encode(v))
    }
}

pub fn bytes_from_json(json: &Json) -> Result<Vec<u8>, Error> {
    use base64::Engine;
    let s = match json {
        Json::String(s) => s,
        _ => return Err(Error::invalid_argument("expected a string for bytes")),
    };
    if let Some(hex_digits) = s.strip_prefix("hex:") {
        hex::decode(hex_digits)
            .map_err(|e| Error::invalid_argument(format!("invalid hex bytes: {e}")))
    } else {
        base64::engine::general_purpose::STANDARD
            .decode(s.as_bytes())
            .map_err(|e| Error::invalid_argument(format!("invalid base64 bytes: {e}")))
    }
}

// ----------------------------------------------------------- timestamp ----

pub fn is_default_timestamp_millis(millis: i64) -> bool {
    millis == 0
}

pub fn encode_timestamp(millis: i64, out: &mut Vec<u8>) {
    let clamped = clamp_timestamp_millis(millis);
    if clamped == 0 {
        out.push(0);
    } else {
        out.push(varint::TAG_TIMESTAMP);
        out.extend_from_slice(&clamped.to_le_bytes());
    }
}

pub fn decode_timestamp(cursor: &mut Cursor) -> Result<i64, Error> {
    let start = cursor.position();
    let tag = cursor.read_u8()?;
    match tag {
        0 => Ok(0),
        varint::TAG_TIMESTAMP => Ok(clamp_timestamp_millis(cursor.read_i64_le()?)),
        _ => Err(Error::invalid_wire(start, "expected a timestamp tag")),
    }
}

pub fn timestamp_to_json(millis: i64, readable: bool) -> Json {
    let clamped = clamp_timestamp_millis(millis);
    if readable {
        let mut obj = serde_json::Map::new();
        obj.insert("unix_millis".to_string(), Json::Number(clamped.into()));
        obj.insert(
            "formatted".to_string(),
            Json::String(format_timestamp_iso8601(clamped)),
        );
        Json::Object(obj)
    } else {
        Json::Number(clamped.into())
    }
}

pub fn timestamp_from_json(json: &Json) -> Result<i64, Error> {
    let millis = match json {
        Json::Number(n) => n
            .as_i64()
            .ok_or_else(|| Error::invalid_argument("timestamp out of range"))?,
        Json::String(s) => s
            .parse::<i64>()
            .map_err(|_| Error::invalid_argument(format!("not a timestamp: {s}")))?,
        Json::Object(obj) => obj
            .get("unix_millis")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| Error::invalid_argument("missing unix_millis"))?,
        _ => return Err(Error::invalid_argument("expected a timestamp")),
    };
    Ok(clamp_timestamp_millis(millis))
}

#[cfg(feature = "chrono")]
fn format_timestamp_iso8601(millis: i64) -> String {
    use chrono::TimeZone;
    chrono::Utc
        .timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .unwrap_or_else(|| millis.to_string())
}

#[cfg(not(feature = "chrono"))]
fn format_timestamp_iso8601(millis: i64) -> String {
    millis.to_string()
}

fn decode_len_prefix(cursor: &mut Cursor) -> Result<usize, Error> {
    let start = cursor.position();
    varint::decode_number(cursor)?
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| Error::invalid_wire(start, "bad length prefix"))
}
