//! Array/list serializer and the keyed-list value type (spec §4.3, §4.9).
//!
//! The wire and JSON shapes of a list never depend on whether it's keyed —
//! keying is a consumer-side indexing convenience layered on top of the same
//! array-of-items encoding. [`List::get`] builds its lookup table lazily and
//! once, behind a [`OnceLock`], the first time it's actually queried.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::Value as Json;

use crate::error::Error;
use crate::serializer::{CodecImpl, Serializer};
use crate::varint::{self, Cursor};

/// The hashable projection of whatever field a keyed list indexes by.
/// Covers every scalar kind a generated key extractor would plausibly
/// return; composite keys aren't supported.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListKey {
    String(String),
    Int64(i64),
    Uint64(u64),
    Bool(bool),
}

impl From<&str> for ListKey {
    fn from(v: &str) -> Self {
        ListKey::String(v.to_string())
    }
}
impl From<String> for ListKey {
    fn from(v: String) -> Self {
        ListKey::String(v)
    }
}
impl From<i64> for ListKey {
    fn from(v: i64) -> Self {
        ListKey::Int64(v)
    }
}
impl From<u64> for ListKey {
    fn from(v: u64) -> Self {
        ListKey::Uint64(v)
    }
}
impl From<bool> for ListKey {
    fn from(v: bool) -> Self {
        ListKey::Bool(v)
    }
}

/// A soia array value. `Keyed` additionally remembers which field the
/// generated code derives keys from and lazily indexes items by it.
pub enum List<T> {
    Plain(Vec<T>),
    Keyed {
        items: Vec<T>,
        key_property: String,
        key_of: fn(&T) -> ListKey,
        index: OnceLock<HashMap<ListKey, usize>>,
    },
}

impl<T: Clone> Clone for List<T> {
    fn clone(&self) -> Self {
        match self {
            List::Plain(items) => List::Plain(items.clone()),
            List::Keyed {
                items,
                key_property,
                key_of,
                ..
            } => List::Keyed {
                items: items.clone(),
                key_property: key_property.clone(),
                key_of: *key_of,
                index: OnceLock::new(),
            },
        }
    }
}

impl<T> List<T> {
    pub fn plain(items: Vec<T>) -> Self {
        List::Plain(items)
    }

    pub fn keyed(items: Vec<T>, key_property: impl Into<String>, key_of: fn(&T) -> ListKey) -> Self {
        List::Keyed {
            items,
            key_property: key_property.into(),
            key_of,
            index: OnceLock::new(),
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            List::Plain(items) => items,
            List::Keyed { items, .. } => items,
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn key_property(&self) -> Option<&str> {
        match self {
            List::Plain(_) => None,
            List::Keyed { key_property, .. } => Some(key_property),
        }
    }

    /// Looks up an item by key. Builds the index on first call; `None` on a
    /// plain (unkeyed) list.
    pub fn get(&self, key: &ListKey) -> Option<&T> {
        match self {
            List::Plain(_) => None,
            List::Keyed {
                items,
                key_of,
                index,
                ..
            } => {
                let map = index.get_or_init(|| {
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| (key_of(item), i))
                        .collect()
                });
                map.get(key).map(|&i| &items[i])
            }
        }
    }
}

struct ListCodec<T> {
    item: Serializer<T>,
    keyed: Option<(String, fn(&T) -> ListKey)>,
}

impl<T> ListCodec<T> {
    fn build(&self, items: Vec<T>) -> List<T> {
        match &self.keyed {
            Some((key_property, key_of)) => List::keyed(items, key_property.clone(), *key_of),
            None => List::plain(items),
        }
    }
}

impl<T> CodecImpl<List<T>> for ListCodec<T> {
    fn encode(&self, value: &List<T>, out: &mut Vec<u8>) {
        let items = value.items();
        match items.len() {
            0 => out.push(varint::TAG_ARRAY_EMPTY),
            1 => out.push(varint::TAG_ARRAY_1),
            2 => out.push(varint::TAG_ARRAY_2),
            3 => out.push(varint::TAG_ARRAY_3),
            n => {
                out.push(varint::TAG_ARRAY_N);
                varint::encode_length_prefix(n as u64, out);
            }
        }
        for item in items {
            self.item.encode_unframed(item, out);
        }
    }

    fn decode(&self, cursor: &mut Cursor, keep_unrecognized: bool) -> Result<List<T>, Error> {
        let start = cursor.position();
        let tag = cursor.read_u8()?;
        let count = match tag {
            varint::TAG_ARRAY_EMPTY => 0,
            varint::TAG_ARRAY_1 => 1,
            varint::TAG_ARRAY_2 => 2,
            varint::TAG_ARRAY_3 => 3,
            varint::TAG_ARRAY_N => varint::decode_number(cursor)?
                .as_u64()
                .ok_or_else(|| Error::invalid_wire(start, "bad array length prefix"))?
                as usize,
            _ => return Err(Error::invalid_wire(start, "expected an array tag")),
        };
        let mut items = Vec::with_capacity(count.min(1 << 20));
        for _ in 0..count {
            items.push(self.item.decode_unframed(cursor, keep_unrecognized)?);
        }
        Ok(self.build(items))
    }

    fn to_json(&self, value: &List<T>, readable: bool) -> Json {
        Json::Array(
            value
                .items()
                .iter()
                .map(|item| self.item.to_json_unframed(item, readable))
                .collect(),
        )
    }

    fn from_json(&self, json: &Json, keep_unrecognized: bool) -> Result<List<T>, Error> {
        if let Json::Number(n) = json {
            return if n.as_u64() == Some(0) {
                Ok(self.build(Vec::new()))
            } else {
                Err(Error::invalid_argument("expected an array or 0 for a list"))
            };
        }
        let array = json
            .as_array()
            .ok_or_else(|| Error::invalid_argument("expected an array or 0 for a list"))?;
        let items = array
            .iter()
            .map(|element| self.item.from_json_unframed(element, keep_unrecognized))
            .collect::<Result<Vec<T>, Error>>()?;
        Ok(self.build(items))
    }

    fn is_default(&self, value: &List<T>) -> bool {
        value.is_empty()
    }
}

pub fn list_serializer<T: 'static>(item: Serializer<T>) -> Serializer<List<T>> {
    Serializer::new(ListCodec { item, keyed: None })
}

pub fn keyed_list_serializer<T: 'static>(
    item: Serializer<T>,
    key_property: impl Into<String>,
    key_of: fn(&T) -> ListKey,
) -> Serializer<List<T>> {
    Serializer::new(ListCodec {
        item,
        keyed: Some((key_property.into(), key_of)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::{int32_serializer, string_serializer};

    #[test]
    fn plain_list_round_trips_every_length_tag() {
        let s = list_serializer(int32_serializer());
        for n in [0usize, 1, 2, 3, 4, 300] {
            let items: Vec<i32> = (0..n as i32).collect();
            let list = List::plain(items.clone());
            let bytes = s.to_bytes(&list);
            let decoded = s.from_bytes(&bytes, true).unwrap();
            assert_eq!(decoded.items(), items.as_slice());
        }
    }

    #[test]
    fn keyed_list_indexes_after_decode() {
        fn key_of(s: &String) -> ListKey {
            ListKey::from(s.clone())
        }
        let s = keyed_list_serializer(string_serializer(), "name", key_of);
        let list = List::keyed(
            vec!["a".to_string(), "b".to_string()],
            "name",
            key_of,
        );
        let bytes = s.to_bytes(&list);
        let decoded = s.from_bytes(&bytes, true).unwrap();
        assert_eq!(decoded.get(&ListKey::from("b")), Some(&"b".to_string()));
        assert_eq!(decoded.get(&ListKey::from("z")), None);
    }
}
