//! The top-level framed binary codec (spec §4.6): every `to_bytes`/`from_bytes`
//! pair agrees on a 4-byte `"soia"` magic prefix so a misrouted payload (e.g.
//! accidentally handed plain JSON, or a value of the wrong type in a system
//! that multiplexes byte streams) fails fast instead of silently decoding
//! garbage.

use crate::error::Error;
use crate::varint::Cursor;

pub const MAGIC: [u8; 4] = *b"soia";

/// Whether `bytes` starts with the `"soia"` magic. The top-level
/// `Serializer::from_bytes` uses this to decide whether to treat its input as
/// framed binary or fall back to parsing it as UTF-8 JSON (spec §4.6).
pub fn has_magic(bytes: &[u8]) -> bool {
    bytes.len() >= MAGIC.len() && bytes[..MAGIC.len()] == MAGIC
}

/// Writes the magic, then whatever `write_value` appends.
pub fn frame(write_value: impl FnOnce(&mut Vec<u8>)) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAGIC.len() + 16);
    out.extend_from_slice(&MAGIC);
    write_value(&mut out);
    out
}

/// Checks the magic, decodes exactly one value with `read_value`, and
/// rejects any bytes left over afterward.
pub fn unframe<T>(
    bytes: &[u8],
    read_value: impl FnOnce(&mut Cursor) -> Result<T, Error>,
) -> Result<T, Error> {
    if bytes.len() < MAGIC.len() || bytes[..MAGIC.len()] != MAGIC {
        return Err(Error::invalid_wire(0, "missing \"soia\" magic"));
    }
    let mut cursor = Cursor::new(&bytes[MAGIC.len()..]);
    let value = read_value(&mut cursor)?;
    if !cursor.is_empty() {
        return Err(Error::TrailingBytes {
            remaining: cursor.remaining(),
        });
    }
    Ok(value)
}
