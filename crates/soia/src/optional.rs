//! `Optional<T>` serializer (spec §4.2).
//!
//! Absence is its own wire tag (255) rather than a flag bit, so it never
//! collides with a present-but-default value — `None` and `Some(0)` encode
//! to different bytes, and readers can tell them apart.

use serde_json::Value as Json;

use crate::error::Error;
use crate::serializer::{CodecImpl, Serializer};
use crate::varint::{Cursor, TAG_ABSENT};

struct OptionalCodec<T> {
    item: Serializer<T>,
}

impl<T> CodecImpl<Option<T>> for OptionalCodec<T> {
    fn encode(&self, value: &Option<T>, out: &mut Vec<u8>) {
        match value {
            None => out.push(TAG_ABSENT),
            Some(v) => self.item.encode_unframed(v, out),
        }
    }

    fn decode(&self, cursor: &mut Cursor, keep_unrecognized: bool) -> Result<Option<T>, Error> {
        if cursor.peek_u8()? == TAG_ABSENT {
            cursor.read_u8()?;
            Ok(None)
        } else {
            Ok(Some(self.item.decode_unframed(cursor, keep_unrecognized)?))
        }
    }

    fn to_json(&self, value: &Option<T>, readable: bool) -> Json {
        match value {
            None => Json::Null,
            Some(v) => self.item.to_json_unframed(v, readable),
        }
    }

    fn from_json(&self, json: &Json, keep_unrecognized: bool) -> Result<Option<T>, Error> {
        if json.is_null() {
            Ok(None)
        } else {
            Ok(Some(self.item.from_json_unframed(json, keep_unrecognized)?))
        }
    }

    fn is_default(&self, value: &Option<T>) -> bool {
        value.is_none()
    }
}

/// Builds a `Serializer<Option<T>>` from an item serializer.
pub fn optional_serializer<T: 'static>(item: Serializer<T>) -> Serializer<Option<T>> {
    Serializer::new(OptionalCodec { item })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::string_serializer;

    #[test]
    fn none_and_some_round_trip_distinctly() {
        let s = optional_serializer(string_serializer());
        let none_bytes = s.to_bytes(&None);
        let some_empty_bytes = s.to_bytes(&Some(String::new()));
        assert_ne!(none_bytes, some_empty_bytes);
        assert_eq!(s.from_bytes(&none_bytes, true).unwrap(), None);
        assert_eq!(
            s.from_bytes(&some_empty_bytes, true).unwrap(),
            Some(String::new())
        );
    }

    #[test]
    fn json_uses_null_for_absence() {
        let s = optional_serializer(string_serializer());
        assert_eq!(s.to_json_unframed(&None, false), Json::Null);
        assert_eq!(s.from_json_unframed(&Json::Null, true).unwrap(), None);
    }
}
