//! Wire tag table and the shared varint/length-prefix primitives every
//! higher-level serializer in this crate is built on (spec §4.1).
//!
//! The first byte of any encoded value is a *wire tag* in `0..=255` that
//! selects the decoding rule. Composite serializers ([`crate::struct_ser`],
//! [`crate::enum_ser`]) reuse tags 246..250 for array/struct framing and
//! 251..254/248 for enum-wrapper framing; the meaning of a tag is always
//! resolved by the calling serializer's context, never by the byte alone.

use crate::error::Error;

/// Tags 0..=231 are an immediate unsigned integer equal to the tag value.
pub const MAX_IMMEDIATE: u8 = 231;
pub const TAG_U16: u8 = 232;
pub const TAG_U32: u8 = 233;
pub const TAG_U64: u8 = 234;
// 235, 236, 237 are int32's negative-range tags (see primitive.rs); they are
// "reserved" from decode_unused's point of view in the sense that a decoder
// not specifically handling int32 should skip them like any other 1/2/4-byte
// payload, never dispatch.
pub const TAG_NEG_I8: u8 = 235;
pub const TAG_NEG_I16: u8 = 236;
pub const TAG_NEG_I32: u8 = 237;
pub const TAG_I64: u8 = 238;
pub const TAG_TIMESTAMP: u8 = 239;
pub const TAG_F32: u8 = 240;
pub const TAG_F64: u8 = 241;
pub const TAG_EMPTY_STRING: u8 = 242;
pub const TAG_STRING: u8 = 243;
pub const TAG_EMPTY_BYTES: u8 = 244;
pub const TAG_BYTES: u8 = 245;
pub const TAG_ARRAY_EMPTY: u8 = 246;
pub const TAG_ARRAY_1: u8 = 247;
pub const TAG_ARRAY_2: u8 = 248;
pub const TAG_ARRAY_3: u8 = 249;
pub const TAG_ARRAY_N: u8 = 250;
/// In enum context, 251..254 carry a wrapper variant's number directly and
/// 248 means "length-prefixed number follows" rather than "array of 2".
pub const TAG_ENUM_WRAPPER_1: u8 = 251;
pub const TAG_ENUM_WRAPPER_4: u8 = 254;
pub const TAG_ENUM_WRAPPER_N: u8 = 248;
pub const TAG_ABSENT: u8 = 255;

/// A read-only cursor over a byte slice, shared by every decoder in this
/// crate. Never allocates; `decode_unused` uses it to skip values without
/// materializing them.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Bytes consumed so far, for capturing verbatim unrecognized payloads.
    pub fn consumed_since(&self, start: usize) -> &'a [u8] {
        &self.data[start..self.pos]
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| Error::invalid_wire(self.pos, "unexpected end of input"))?;
        self.pos += 1;
        Ok(b)
    }

    pub fn peek_u8(&self) -> Result<u8, Error> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| Error::invalid_wire(self.pos, "unexpected end of input"))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| Error::invalid_wire(self.pos, "unexpected end of input"))?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(N)?);
        Ok(buf)
    }

    pub fn read_u16_le(&mut self) -> Result<u16, Error> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, Error> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, Error> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64_le(&mut self) -> Result<i64, Error> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32_le(&mut self) -> Result<f32, Error> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64_le(&mut self) -> Result<f64, Error> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }
}

/// Writes `n` using the unsigned-integer tag rules: a single byte if
/// `n < 232`, else `232`+2B, `233`+4B, or `234`+8B little-endian.
pub fn encode_length_prefix(n: u64, out: &mut Vec<u8>) {
    if n <= MAX_IMMEDIATE as u64 {
        out.push(n as u8);
    } else if n < (1 << 16) {
        out.push(TAG_U16);
        out.extend_from_slice(&(n as u16).to_le_bytes());
    } else if n < (1u64 << 32) {
        out.push(TAG_U32);
        out.extend_from_slice(&(n as u32).to_le_bytes());
    } else {
        out.push(TAG_U64);
        out.extend_from_slice(&n.to_le_bytes());
    }
}

/// The value of a decoded number, preserving signedness for the tags that
/// carry it (int64/timestamp) and float bit patterns for 240/241.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Unsigned(u64),
    Signed(i64),
    F32(f32),
    F64(f64),
}

impl Number {
    pub fn as_u64(self) -> Option<u64> {
        match self {
            Number::Unsigned(n) => Some(n),
            Number::Signed(n) if n >= 0 => Some(n as u64),
            _ => None,
        }
    }
}

/// Reads a tag and returns the integer/float it denotes. Tags 238/239 return
/// signed 64-bit values, 240/241 return float bit patterns. Any other tag is
/// `InvalidWire`.
pub fn decode_number(cursor: &mut Cursor) -> Result<Number, Error> {
    let start = cursor.position();
    let tag = cursor.read_u8()?;
    match tag {
        0..=MAX_IMMEDIATE => Ok(Number::Unsigned(tag as u64)),
        TAG_U16 => Ok(Number::Unsigned(cursor.read_u16_le()? as u64)),
        TAG_U32 => Ok(Number::Unsigned(cursor.read_u32_le()? as u64)),
        TAG_U64 => Ok(Number::Unsigned(cursor.read_u64_le()?)),
        TAG_I64 | TAG_TIMESTAMP => Ok(Number::Signed(cursor.read_i64_le()?)),
        TAG_F32 => Ok(Number::F32(f32::from_bits(cursor.read_u32_le()?))),
        TAG_F64 => Ok(Number::F64(f64::from_bits(cursor.read_u64_le()?))),
        _ => Err(Error::invalid_wire(start, "tag is not a number")),
    }
}

/// Advances past one logically-complete value without allocating. Used to
/// skip removed slots and to measure unrecognized payloads.
///
/// Tag 248 is the only byte whose meaning depends on context: outside an
/// enum it is "array/struct with 2 elements" (two nested values follow);
/// inside an enum it is "wrapper variant with a length-prefixed number"
/// (a number, then exactly one nested value, follows). Every other tag's
/// meaning is unambiguous regardless of `in_enum_context` — tags 251..254
/// only ever denote enum wrapper variants since plain arrays/structs never
/// use them, so they recurse into exactly one nested value either way.
pub fn decode_unused(cursor: &mut Cursor, in_enum_context: bool) -> Result<(), Error> {
    let start = cursor.position();
    let tag = cursor.read_u8()?;
    match tag {
        0..=MAX_IMMEDIATE | TAG_ABSENT | TAG_ARRAY_EMPTY | TAG_EMPTY_STRING | TAG_EMPTY_BYTES => {
            Ok(())
        }
        TAG_U16 | TAG_NEG_I16 => {
            cursor.read_bytes(2)?;
            Ok(())
        }
        TAG_U32 | TAG_NEG_I32 => {
            cursor.read_bytes(4)?;
            Ok(())
        }
        TAG_U64 | TAG_I64 | TAG_TIMESTAMP | TAG_F64 => {
            cursor.read_bytes(8)?;
            Ok(())
        }
        TAG_NEG_I8 => {
            cursor.read_bytes(1)?;
            Ok(())
        }
        TAG_F32 => {
            cursor.read_bytes(4)?;
            Ok(())
        }
        TAG_STRING | TAG_BYTES => {
            let len = decode_number(cursor)?
                .as_u64()
                .ok_or_else(|| Error::invalid_wire(start, "bad length prefix"))?;
            cursor.read_bytes(len as usize)?;
            Ok(())
        }
        TAG_ARRAY_1 => decode_unused(cursor, false),
        TAG_ARRAY_2 if in_enum_context => {
            // wrapper variant with length-prefixed number
            decode_number(cursor)?;
            decode_unused(cursor, false)
        }
        TAG_ARRAY_2 => {
            decode_unused(cursor, false)?;
            decode_unused(cursor, false)
        }
        TAG_ARRAY_3 => {
            for _ in 0..3 {
                decode_unused(cursor, false)?;
            }
            Ok(())
        }
        TAG_ARRAY_N => {
            let count = decode_number(cursor)?
                .as_u64()
                .ok_or_else(|| Error::invalid_wire(start, "bad length prefix"))?;
            for _ in 0..count {
                decode_unused(cursor, false)?;
            }
            Ok(())
        }
        TAG_ENUM_WRAPPER_1..=TAG_ENUM_WRAPPER_4 => decode_unused(cursor, false),
        _ => Err(Error::invalid_wire(start, "unrecognized wire tag")),
    }
}
