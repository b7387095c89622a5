//! Struct serializer (spec §4.4): an ordered slot table addressed by field
//! number, built through a builder/finalize pair generic over the frozen
//! type `T` and its mutable builder `M`.
//!
//! A struct's wire and dense-JSON encodings are positional — slot `i` is
//! field number `i`'s value, and trailing default slots are trimmed. Slots
//! beyond this build's `slot_count` (fields a newer writer added) are
//! spliced back out verbatim from [`UnrecognizedFields`] when decoding with
//! `keep_unrecognized`, so round-tripping through an older schema never
//! loses data it doesn't understand. A removed number inside `slot_count`
//! is a permanent tombstone instead: its slot is always dropped, never
//! captured.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::{Map as JsonMap, Value as Json};

use crate::error::Error;
use crate::serializer::{CodecImpl, Serializer};
use crate::unrecognized::{RawValue, UnrecognizedFields};
use crate::varint::{self, Cursor};

type EncodeFn<T> = Arc<dyn Fn(&T, &mut Vec<u8>) + Send + Sync>;
type IsDefaultFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
type ToJsonFn<T> = Arc<dyn Fn(&T, bool) -> Json + Send + Sync>;
type DecodeIntoFn<M> =
    Arc<dyn Fn(&mut M, &mut Cursor, bool) -> Result<(), Error> + Send + Sync>;
type FromJsonIntoFn<M> = Arc<dyn Fn(&mut M, &Json, bool) -> Result<(), Error> + Send + Sync>;
type GetUnrecognizedFn<T> = Arc<dyn Fn(&T) -> &UnrecognizedFields + Send + Sync>;
type SetUnrecognizedFn<M> = Arc<dyn Fn(&mut M, UnrecognizedFields) + Send + Sync>;

struct FieldEntry<T, M> {
    number: u32,
    name: &'static str,
    encode: EncodeFn<T>,
    is_default: IsDefaultFn<T>,
    to_json: ToJsonFn<T>,
    decode_into: DecodeIntoFn<M>,
    from_json_into: FromJsonIntoFn<M>,
}

/// Accumulates field registrations for a generated struct type, then
/// produces the `Serializer<T>` generated code stores as `T::SERIALIZER`.
pub struct StructBuilder<T, M> {
    record_id: String,
    removed_numbers: BTreeSet<u32>,
    fields: Vec<FieldEntry<T, M>>,
    new_builder: fn() -> M,
    build: fn(M) -> T,
    get_unrecognized: GetUnrecognizedFn<T>,
    set_unrecognized: SetUnrecognizedFn<M>,
}

impl<T: 'static, M: 'static> StructBuilder<T, M> {
    pub fn new(
        record_id: impl Into<String>,
        new_builder: fn() -> M,
        build: fn(M) -> T,
        get_unrecognized: impl Fn(&T) -> &UnrecognizedFields + Send + Sync + 'static,
        set_unrecognized: impl Fn(&mut M, UnrecognizedFields) + Send + Sync + 'static,
    ) -> Self {
        StructBuilder {
            record_id: record_id.into(),
            removed_numbers: BTreeSet::new(),
            fields: Vec::new(),
            new_builder,
            build,
            get_unrecognized: Arc::new(get_unrecognized),
            set_unrecognized: Arc::new(set_unrecognized),
        }
    }

    #[must_use]
    pub fn removed_numbers(mut self, numbers: impl IntoIterator<Item = u32>) -> Self {
        self.removed_numbers.extend(numbers);
        self
    }

    #[must_use]
    pub fn add_field<F: 'static>(
        mut self,
        number: u32,
        name: &'static str,
        serializer: Serializer<F>,
        get: impl Fn(&T) -> F + Send + Sync + 'static,
        set: impl Fn(&mut M, F) + Send + Sync + 'static,
    ) -> Self {
        let get = Arc::new(get);
        let set = Arc::new(set);

        let (get_e, ser_e) = (get.clone(), serializer.clone());
        let encode: EncodeFn<T> = Arc::new(move |t, out| ser_e.encode_unframed(&get_e(t), out));

        let (get_d, ser_d) = (get.clone(), serializer.clone());
        let is_default: IsDefaultFn<T> = Arc::new(move |t| ser_d.is_default(&get_d(t)));

        let (get_j, ser_j) = (get.clone(), serializer.clone());
        let to_json: ToJsonFn<T> =
            Arc::new(move |t, readable| ser_j.to_json_unframed(&get_j(t), readable));

        let (set_dec, ser_dec) = (set.clone(), serializer.clone());
        let decode_into: DecodeIntoFn<M> = Arc::new(move |m, cursor, keep_unrecognized| {
            let v = ser_dec.decode_unframed(cursor, keep_unrecognized)?;
            set_dec(m, v);
            Ok(())
        });

        let (set_j, ser_fj) = (set.clone(), serializer);
        let from_json_into: FromJsonIntoFn<M> = Arc::new(move |m, json, keep_unrecognized| {
            let v = ser_fj.from_json_unframed(json, keep_unrecognized)?;
            set_j(m, v);
            Ok(())
        });

        self.fields.push(FieldEntry {
            number,
            name,
            encode,
            is_default,
            to_json,
            decode_into,
            from_json_into,
        });
        self
    }

    pub fn finalize(self) -> Serializer<T> {
        let mut fields = self.fields;
        fields.sort_by_key(|f| f.number);
        let max_field_number = fields.last().map(|f| f.number as i64).unwrap_or(-1);
        let max_removed_number = self
            .removed_numbers
            .iter()
            .next_back()
            .map(|&n| n as i64)
            .unwrap_or(-1);
        let slot_count = (max_field_number.max(max_removed_number).max(-1) + 1) as usize;
        let mut slots = vec![None; slot_count];
        for (idx, field) in fields.iter().enumerate() {
            slots[field.number as usize] = Some(idx);
        }
        crate::trace_finalize("struct", &self.record_id, slot_count);
        Serializer::new(StructCodec {
            removed_numbers: self.removed_numbers,
            fields,
            slots,
            new_builder: self.new_builder,
            build: self.build,
            get_unrecognized: self.get_unrecognized,
            set_unrecognized: self.set_unrecognized,
        })
    }
}

struct StructCodec<T, M> {
    #[allow(dead_code)]
    removed_numbers: BTreeSet<u32>,
    fields: Vec<FieldEntry<T, M>>,
    slots: Vec<Option<usize>>,
    new_builder: fn() -> M,
    build: fn(M) -> T,
    get_unrecognized: GetUnrecognizedFn<T>,
    set_unrecognized: SetUnrecognizedFn<M>,
}

impl<T, M> StructCodec<T, M> {
    fn slot(&self, number: usize) -> Option<usize> {
        self.slots.get(number).copied().flatten()
    }
}

impl<T, M> CodecImpl<T> for StructCodec<T, M> {
    fn encode(&self, value: &T, out: &mut Vec<u8>) {
        let unrecognized = (self.get_unrecognized)(value);
        let last_field_slot = self
            .fields
            .iter()
            .rev()
            .find(|f| !(f.is_default)(value))
            .map(|f| f.number);
        let count = [last_field_slot, unrecognized.max_number()]
            .into_iter()
            .flatten()
            .max()
            .map(|n| n + 1)
            .unwrap_or(0);

        match count {
            0 => out.push(varint::TAG_ARRAY_EMPTY),
            1 => out.push(varint::TAG_ARRAY_1),
            2 => out.push(varint::TAG_ARRAY_2),
            3 => out.push(varint::TAG_ARRAY_3),
            n => {
                out.push(varint::TAG_ARRAY_N);
                varint::encode_length_prefix(n as u64, out);
            }
        }

        let unrecognized_by_number: HashMap<u32, &RawValue> =
            unrecognized.iter().map(|(n, v)| (*n, v)).collect();
        for number in 0..count {
            if let Some(idx) = self.slot(number as usize) {
                (self.fields[idx].encode)(value, out);
            } else if let Some(RawValue::Binary(bytes)) = unrecognized_by_number.get(&number) {
                out.extend_from_slice(bytes);
            } else {
                out.push(0);
            }
        }
    }

    fn decode(&self, cursor: &mut Cursor, keep_unrecognized: bool) -> Result<T, Error> {
        let start = cursor.position();
        let tag = cursor.read_u8()?;
        let count: u64 = match tag {
            varint::TAG_ARRAY_EMPTY => 0,
            varint::TAG_ARRAY_1 => 1,
            varint::TAG_ARRAY_2 => 2,
            varint::TAG_ARRAY_3 => 3,
            varint::TAG_ARRAY_N => varint::decode_number(cursor)?
                .as_u64()
                .ok_or_else(|| Error::invalid_wire(start, "bad struct slot count"))?,
            _ => return Err(Error::invalid_wire(start, "expected a struct tag")),
        };

        let mut builder = (self.new_builder)();
        let mut unrecognized = UnrecognizedFields::new();
        for number in 0..count {
            if let Some(idx) = self.slot(number as usize) {
                (self.fields[idx].decode_into)(&mut builder, cursor, keep_unrecognized)?;
            } else if (number as usize) < self.slots.len() {
                // A removed field number within this build's slot range: the
                // value is discarded, never captured as unrecognized.
                varint::decode_unused(cursor, false)?;
            } else if keep_unrecognized {
                let slot_start = cursor.position();
                varint::decode_unused(cursor, false)?;
                let bytes = cursor.consumed_since(slot_start).to_vec();
                crate::trace_unrecognized("field", number as u32);
                unrecognized.push(number as u32, RawValue::Binary(bytes));
            } else {
                varint::decode_unused(cursor, false)?;
            }
        }
        (self.set_unrecognized)(&mut builder, unrecognized);
        Ok((self.build)(builder))
    }

    /// Dense JSON is positional, mirroring the binary layout: an array whose
    /// index is the field number. Readable JSON is an object keyed by field
    /// name with default fields omitted; it never preserves unrecognized
    /// fields, since their original name (if any) isn't known to this build.
    fn to_json(&self, value: &T, readable: bool) -> Json {
        let unrecognized = (self.get_unrecognized)(value);
        if readable {
            let mut obj = JsonMap::new();
            for field in &self.fields {
                if !(field.is_default)(value) {
                    obj.insert(field.name.to_string(), (field.to_json)(value, true));
                }
            }
            Json::Object(obj)
        } else {
            let last_field_slot = self
                .fields
                .iter()
                .rev()
                .find(|f| !(f.is_default)(value))
                .map(|f| f.number);
            let count = [last_field_slot, unrecognized.max_number()]
                .into_iter()
                .flatten()
                .max()
                .map(|n| n + 1)
                .unwrap_or(0);
            let unrecognized_by_number: HashMap<u32, &RawValue> =
                unrecognized.iter().map(|(n, v)| (*n, v)).collect();
            let mut array = Vec::with_capacity(count as usize);
            for number in 0..count {
                if let Some(idx) = self.slot(number as usize) {
                    array.push((self.fields[idx].to_json)(value, false));
                } else if let Some(RawValue::Json(json)) = unrecognized_by_number.get(&number) {
                    array.push(json.clone());
                } else {
                    array.push(Json::Number(0.into()));
                }
            }
            Json::Array(array)
        }
    }

    fn from_json(&self, json: &Json, keep_unrecognized: bool) -> Result<T, Error> {
        let mut builder = (self.new_builder)();
        let mut unrecognized = UnrecognizedFields::new();
        match json {
            Json::Number(n) if n.as_u64() == Some(0) => {}
            Json::Array(array) => {
                for (number, element) in array.iter().enumerate() {
                    if let Some(idx) = self.slot(number) {
                        (self.fields[idx].from_json_into)(&mut builder, element, keep_unrecognized)?;
                    } else if number < self.slots.len() || element.is_null() {
                        // Removed-number gap within range, or an explicit
                        // null sentinel: nothing to preserve.
                    } else if keep_unrecognized {
                        unrecognized.push(number as u32, RawValue::Json(element.clone()));
                    }
                }
            }
            Json::Object(obj) => {
                let by_name: HashMap<&str, &FieldEntry<T, M>> =
                    self.fields.iter().map(|f| (f.name, f)).collect();
                for (key, element) in obj {
                    if let Some(field) = by_name.get(key.as_str()) {
                        (field.from_json_into)(&mut builder, element, keep_unrecognized)?;
                    }
                    // Unknown names are ignored: readable JSON never carries
                    // unrecognized fields.
                }
            }
            _ => return Err(Error::invalid_argument("expected an array or object for a struct")),
        }
        (self.set_unrecognized)(&mut builder, unrecognized);
        Ok((self.build)(builder))
    }

    fn is_default(&self, value: &T) -> bool {
        let unrecognized = (self.get_unrecognized)(value);
        unrecognized.is_empty() && self.fields.iter().all(|f| (f.is_default)(value))
    }
}
