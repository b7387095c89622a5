//! Opaque payloads preserved for forward compatibility (spec §3).
//!
//! When a struct or enum decoder encounters a field/variant number it
//! doesn't recognize, it doesn't discard the payload — it captures enough to
//! reproduce it verbatim on the next encode, so a reader built against an
//! older schema can still round-trip data a newer writer attached.

use serde_json::Value as Json;

/// The captured payload for one unrecognized slot. Which variant shows up
/// depends on which codec did the capturing: binary decode keeps the exact
/// bytes it skipped, JSON decode keeps the parsed element.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Binary(Vec<u8>),
    Json(Json),
}

impl RawValue {
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            RawValue::Binary(b) => Some(b),
            RawValue::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Json> {
        match self {
            RawValue::Json(j) => Some(j),
            RawValue::Binary(_) => None,
        }
    }
}

/// Struct fields present on the wire whose number isn't in the current
/// slot table, keyed by field number and kept in encounter order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnrecognizedFields {
    entries: Vec<(u32, RawValue)>,
}

impl UnrecognizedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn push(&mut self, number: u32, value: RawValue) {
        self.entries.push((number, value));
    }

    pub fn iter(&self) -> impl Iterator<Item = &(u32, RawValue)> {
        self.entries.iter()
    }

    /// The number of the last recognized-or-unrecognized slot on the wire,
    /// used by struct decoding to size its slot scan.
    pub fn max_number(&self) -> Option<u32> {
        self.entries.iter().map(|(n, _)| *n).max()
    }
}

/// An enum value whose variant number isn't in the known variant table.
/// `value` is `None` for a bare (constant-shaped) unrecognized variant and
/// `Some` for a wrapper-shaped one.
#[derive(Debug, Clone, PartialEq)]
pub struct UnrecognizedEnum {
    pub number: u32,
    pub value: Option<RawValue>,
}

impl UnrecognizedEnum {
    pub fn new(number: u32, value: Option<RawValue>) -> Self {
        UnrecognizedEnum { number, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_max_number_and_order() {
        let mut fields = UnrecognizedFields::new();
        assert!(fields.is_empty());
        fields.push(5, RawValue::Binary(vec![1, 2, 3]));
        fields.push(2, RawValue::Json(Json::Bool(true)));
        assert_eq!(fields.max_number(), Some(5));
        assert_eq!(fields.len(), 2);
        let collected: Vec<u32> = fields.iter().map(|(n, _)| *n).collect();
        assert_eq!(collected, vec![5, 2]);
    }

    #[test]
    fn raw_value_accessors() {
        let binary = RawValue::Binary(vec![9]);
        assert_eq!(binary.as_binary(), Some(&[9][..]));
        assert!(binary.as_json().is_none());

        let json = RawValue::Json(Json::Null);
        assert!(json.as_binary().is_none());
        assert_eq!(json.as_json(), Some(&Json::Null));
    }
}
