//! Reflective type descriptor graph and its JSON projection (spec §4.7).
//!
//! A [`TypeDescriptor`] mirrors the composite grammar structs and enums are
//! built from. Records (structs/enums) can reference themselves or each
//! other transitively, so struct/enum descriptors store their
//! fields/variants behind a [`OnceLock`], filled in once after the shell is
//! installed into a by-id map — the same "allocate the shell, publish it,
//! fill it in" shape `facet-core` uses for its own lazily-resolved shapes.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, OnceLock};

use serde_json::{Map as JsonMap, Value as Json};

use crate::error::Error;

/// The nine scalar kinds (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Int32,
    Int64,
    Uint64,
    Float32,
    Float64,
    Timestamp,
    String,
    Bytes,
}

impl PrimitiveKind {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Int32 => "int32",
            PrimitiveKind::Int64 => "int64",
            PrimitiveKind::Uint64 => "uint64",
            PrimitiveKind::Float32 => "float32",
            PrimitiveKind::Float64 => "float64",
            PrimitiveKind::Timestamp => "timestamp",
            PrimitiveKind::String => "string",
            PrimitiveKind::Bytes => "bytes",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, Error> {
        Ok(match name {
            "bool" => PrimitiveKind::Bool,
            "int32" => PrimitiveKind::Int32,
            "int64" => PrimitiveKind::Int64,
            "uint64" => PrimitiveKind::Uint64,
            "float32" => PrimitiveKind::Float32,
            "float64" => PrimitiveKind::Float64,
            "timestamp" => PrimitiveKind::Timestamp,
            "string" => PrimitiveKind::String,
            "bytes" => PrimitiveKind::Bytes,
            other => return Err(Error::UnknownPrimitive(other.to_string())),
        })
    }
}

/// A type in the descriptor graph. Cheap to clone (records are behind `Arc`).
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    Optional(Arc<TypeDescriptor>),
    Array {
        item: Arc<TypeDescriptor>,
        key_property: Option<String>,
    },
    Struct(Arc<StructDescriptor>),
    Enum(Arc<EnumDescriptor>),
}

impl TypeDescriptor {
    /// The `record_id` this type resolves to, for records only.
    pub fn record_id(&self) -> Option<&str> {
        match self {
            TypeDescriptor::Struct(s) => Some(&s.record_id),
            TypeDescriptor::Enum(e) => Some(&e.record_id),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct StructDescriptor {
    pub record_id: String,
    pub doc: String,
    pub removed_numbers: BTreeSet<u32>,
    fields: OnceLock<Vec<FieldDescriptor>>,
}

impl StructDescriptor {
    pub fn new_shell(record_id: impl Into<String>, doc: impl Into<String>) -> Self {
        StructDescriptor {
            record_id: record_id.into(),
            doc: doc.into(),
            removed_numbers: BTreeSet::new(),
            fields: OnceLock::new(),
        }
    }

    pub fn with_removed(mut self, removed_numbers: BTreeSet<u32>) -> Self {
        self.removed_numbers = removed_numbers;
        self
    }

    /// Installs the field list. Panics if called twice — a shell is filled
    /// in exactly once, immediately after its record definition is read.
    pub fn fill_fields(&self, fields: Vec<FieldDescriptor>) {
        self.fields
            .set(fields)
            .unwrap_or_else(|_| panic!("struct descriptor {} filled twice", self.record_id));
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        self.fields.get().map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub number: u32,
    pub doc: String,
    pub type_descriptor: Arc<TypeDescriptor>,
}

#[derive(Debug)]
pub struct EnumDescriptor {
    pub record_id: String,
    pub doc: String,
    pub removed_numbers: BTreeSet<u32>,
    variants: OnceLock<Vec<VariantDescriptor>>,
}

impl EnumDescriptor {
    pub fn new_shell(record_id: impl Into<String>, doc: impl Into<String>) -> Self {
        EnumDescriptor {
            record_id: record_id.into(),
            doc: doc.into(),
            removed_numbers: BTreeSet::new(),
            variants: OnceLock::new(),
        }
    }

    pub fn with_removed(mut self, removed_numbers: BTreeSet<u32>) -> Self {
        self.removed_numbers = removed_numbers;
        self
    }

    pub fn fill_variants(&self, variants: Vec<VariantDescriptor>) {
        self.variants
            .set(variants)
            .unwrap_or_else(|_| panic!("enum descriptor {} filled twice", self.record_id));
    }

    pub fn variants(&self) -> &[VariantDescriptor] {
        self.variants.get().map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone)]
pub enum VariantDescriptor {
    Constant {
        name: String,
        number: u32,
        doc: String,
    },
    Wrapper {
        name: String,
        number: u32,
        doc: String,
        value_type: Arc<TypeDescriptor>,
    },
}

impl VariantDescriptor {
    pub fn name(&self) -> &str {
        match self {
            VariantDescriptor::Constant { name, .. } => name,
            VariantDescriptor::Wrapper { name, .. } => name,
        }
    }

    pub fn number(&self) -> u32 {
        match self {
            VariantDescriptor::Constant { number, .. } => *number,
            VariantDescriptor::Wrapper { number, .. } => *number,
        }
    }
}

// ------------------------------------------------------------- JSON out ----

/// `as_json(descriptor)`: `{ "type": <signature>, "records": [<record>...] }`.
/// Records are emitted once each, breadth-first from the root, deduped by
/// `record_id`.
pub fn as_json(descriptor: &TypeDescriptor) -> Json {
    let mut seen = std::collections::HashSet::new();
    let mut queue: VecDeque<RecordRef> = VecDeque::new();
    let type_sig = type_signature(descriptor, &mut queue, &mut seen);

    let mut records = Vec::new();
    while let Some(record) = queue.pop_front() {
        records.push(record_definition(&record, &mut queue, &mut seen));
    }

    let mut obj = JsonMap::new();
    obj.insert("type".to_string(), type_sig);
    obj.insert("records".to_string(), Json::Array(records));
    Json::Object(obj)
}

enum RecordRef {
    Struct(Arc<StructDescriptor>),
    Enum(Arc<EnumDescriptor>),
}

impl RecordRef {
    fn record_id(&self) -> &str {
        match self {
            RecordRef::Struct(s) => &s.record_id,
            RecordRef::Enum(e) => &e.record_id,
        }
    }
}

fn type_signature(
    td: &TypeDescriptor,
    queue: &mut VecDeque<RecordRef>,
    seen: &mut std::collections::HashSet<String>,
) -> Json {
    match td {
        TypeDescriptor::Primitive(kind) => kind_value("primitive", Json::String(kind.name().to_string())),
        TypeDescriptor::Optional(inner) => {
            kind_value("optional", type_signature(inner, queue, seen))
        }
        TypeDescriptor::Array { item, key_property } => {
            let mut value = JsonMap::new();
            value.insert("item".to_string(), type_signature(item, queue, seen));
            if let Some(key) = key_property {
                value.insert("key_extractor".to_string(), Json::String(key.clone()));
            }
            kind_value("array", Json::Object(value))
        }
        TypeDescriptor::Struct(s) => {
            enqueue_record(RecordRef::Struct(s.clone()), queue, seen);
            kind_value("record", Json::String(s.record_id.clone()))
        }
        TypeDescriptor::Enum(e) => {
            enqueue_record(RecordRef::Enum(e.clone()), queue, seen);
            kind_value("record", Json::String(e.record_id.clone()))
        }
    }
}

fn enqueue_record(
    record: RecordRef,
    queue: &mut VecDeque<RecordRef>,
    seen: &mut std::collections::HashSet<String>,
) {
    if seen.insert(record.record_id().to_string()) {
        queue.push_back(record);
    }
}

fn kind_value(kind: &str, value: Json) -> Json {
    let mut obj = JsonMap::new();
    obj.insert("kind".to_string(), Json::String(kind.to_string()));
    obj.insert("value".to_string(), value);
    Json::Object(obj)
}

fn record_definition(
    record: &RecordRef,
    queue: &mut VecDeque<RecordRef>,
    seen: &mut std::collections::HashSet<String>,
) -> Json {
    let mut obj = JsonMap::new();
    match record {
        RecordRef::Struct(s) => {
            obj.insert("kind".to_string(), Json::String("struct".to_string()));
            obj.insert("id".to_string(), Json::String(s.record_id.clone()));
            if !s.doc.is_empty() {
                obj.insert("doc".to_string(), Json::String(s.doc.clone()));
            }
            let fields = s
                .fields()
                .iter()
                .map(|f| {
                    let mut field_obj = JsonMap::new();
                    field_obj.insert("name".to_string(), Json::String(f.name.clone()));
                    field_obj.insert("number".to_string(), Json::Number(f.number.into()));
                    field_obj.insert(
                        "type".to_string(),
                        type_signature(&f.type_descriptor, queue, seen),
                    );
                    if !f.doc.is_empty() {
                        field_obj.insert("doc".to_string(), Json::String(f.doc.clone()));
                    }
                    Json::Object(field_obj)
                })
                .collect();
            obj.insert("fields".to_string(), Json::Array(fields));
            if !s.removed_numbers.is_empty() {
                obj.insert(
                    "removed_numbers".to_string(),
                    Json::Array(s.removed_numbers.iter().map(|&n| Json::Number(n.into())).collect()),
                );
            }
        }
        RecordRef::Enum(e) => {
            obj.insert("kind".to_string(), Json::String("enum".to_string()));
            obj.insert("id".to_string(), Json::String(e.record_id.clone()));
            if !e.doc.is_empty() {
                obj.insert("doc".to_string(), Json::String(e.doc.clone()));
            }
            let variants = e
                .variants()
                .iter()
                .map(|v| variant_definition(v, queue, seen))
                .collect();
            obj.insert("variants".to_string(), Json::Array(variants));
            if !e.removed_numbers.is_empty() {
                obj.insert(
                    "removed_numbers".to_string(),
                    Json::Array(e.removed_numbers.iter().map(|&n| Json::Number(n.into())).collect()),
                );
            }
        }
    }
    Json::Object(obj)
}

fn variant_definition(
    variant: &VariantDescriptor,
    queue: &mut VecDeque<RecordRef>,
    seen: &mut std::collections::HashSet<String>,
) -> Json {
    let mut obj = JsonMap::new();
    match variant {
        VariantDescriptor::Constant { name, number, doc } => {
            obj.insert("kind".to_string(), Json::String("constant".to_string()));
            obj.insert("name".to_string(), Json::String(name.clone()));
            obj.insert("number".to_string(), Json::Number((*number).into()));
            if !doc.is_empty() {
                obj.insert("doc".to_string(), Json::String(doc.clone()));
            }
        }
        VariantDescriptor::Wrapper {
            name,
            number,
            doc,
            value_type,
        } => {
            obj.insert("kind".to_string(), Json::String("wrapper".to_string()));
            obj.insert("name".to_string(), Json::String(name.clone()));
            obj.insert("number".to_string(), Json::Number((*number).into()));
            obj.insert(
                "value_type".to_string(),
                type_signature(value_type, queue, seen),
            );
            if !doc.is_empty() {
                obj.insert("doc".to_string(), Json::String(doc.clone()));
            }
        }
    }
    Json::Object(obj)
}

// -------------------------------------------------------------- JSON in ----

/// `parse_from_json(json)`: materializes empty shells for every
/// `records[i]` first, installs them by `record_id`, then resolves
/// field/variant types by recursive descent — giving correct behavior for
/// cyclic graphs since a self-reference resolves to the shell's `Arc`
/// before the shell's own fields are filled in.
pub fn parse_from_json(json: &Json) -> Result<Arc<TypeDescriptor>, Error> {
    let obj = json
        .as_object()
        .ok_or_else(|| Error::invalid_argument("descriptor JSON must be an object"))?;
    let records_json = obj
        .get("records")
        .and_then(Json::as_array)
        .ok_or_else(|| Error::invalid_argument("descriptor JSON missing \"records\""))?;

    let mut shells: HashMap<String, Arc<TypeDescriptor>> = HashMap::new();
    for record_json in records_json {
        let (id, shell) = make_shell(record_json)?;
        shells.insert(id, shell);
    }

    for record_json in records_json {
        fill_shell(record_json, &shells)?;
    }

    let type_json = obj
        .get("type")
        .ok_or_else(|| Error::invalid_argument("descriptor JSON missing \"type\""))?;
    resolve_type(type_json, &shells)
}

fn make_shell(record_json: &Json) -> Result<(String, Arc<TypeDescriptor>), Error> {
    let obj = record_json
        .as_object()
        .ok_or_else(|| Error::invalid_argument("record definition must be an object"))?;
    let kind = json_str(obj, "kind")?;
    let id = json_str(obj, "id")?.to_string();
    let doc = obj
        .get("doc")
        .and_then(Json::as_str)
        .unwrap_or_default()
        .to_string();
    let removed = parse_removed_numbers(obj);

    let descriptor = match kind {
        "struct" => {
            TypeDescriptor::Struct(Arc::new(StructDescriptor::new_shell(id.clone(), doc).with_removed(removed)))
        }
        "enum" => {
            TypeDescriptor::Enum(Arc::new(EnumDescriptor::new_shell(id.clone(), doc).with_removed(removed)))
        }
        other => return Err(Error::UnknownKind(other.to_string())),
    };
    Ok((id, Arc::new(descriptor)))
}

fn parse_removed_numbers(obj: &JsonMap<String, Json>) -> BTreeSet<u32> {
    obj.get("removed_numbers")
        .and_then(Json::as_array)
        .map(|arr| arr.iter().filter_map(Json::as_u64).map(|n| n as u32).collect())
        .unwrap_or_default()
}

fn fill_shell(record_json: &Json, shells: &HashMap<String, Arc<TypeDescriptor>>) -> Result<(), Error> {
    let obj = record_json.as_object().expect("validated by make_shell");
    let kind = json_str(obj, "kind")?;
    let id = json_str(obj, "id")?;
    let shell = shells.get(id).expect("shell installed in first pass");

    match (kind, shell.as_ref()) {
        ("struct", TypeDescriptor::Struct(s)) => {
            let fields_json = obj
                .get("fields")
                .and_then(Json::as_array)
                .ok_or_else(|| Error::invalid_argument("struct record missing \"fields\""))?;
            let mut fields = Vec::with_capacity(fields_json.len());
            for field_json in fields_json {
                let field_obj = field_json
                    .as_object()
                    .ok_or_else(|| Error::invalid_argument("field definition must be an object"))?;
                let type_descriptor = resolve_type(
                    field_obj
                        .get("type")
                        .ok_or_else(|| Error::invalid_argument("field missing \"type\""))?,
                    shells,
                )?;
                fields.push(FieldDescriptor {
                    name: json_str(field_obj, "name")?.to_string(),
                    number: json_u32(field_obj, "number")?,
                    doc: field_obj
                        .get("doc")
                        .and_then(Json::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    type_descriptor,
                });
            }
            s.fill_fields(fields);
        }
        ("enum", TypeDescriptor::Enum(e)) => {
            let variants_json = obj
                .get("variants")
                .and_then(Json::as_array)
                .ok_or_else(|| Error::invalid_argument("enum record missing \"variants\""))?;
            let mut variants = Vec::with_capacity(variants_json.len());
            for variant_json in variants_json {
                let variant_obj = variant_json
                    .as_object()
                    .ok_or_else(|| Error::invalid_argument("variant definition must be an object"))?;
                let variant_kind = json_str(variant_obj, "kind")?;
                let name = json_str(variant_obj, "name")?.to_string();
                let number = json_u32(variant_obj, "number")?;
                let doc = variant_obj
                    .get("doc")
                    .and_then(Json::as_str)
                    .unwrap_or_default()
                    .to_string();
                let variant = match variant_kind {
                    "constant" => VariantDescriptor::Constant { name, number, doc },
                    "wrapper" => {
                        let value_type = resolve_type(
                            variant_obj
                                .get("value_type")
                                .ok_or_else(|| Error::invalid_argument("wrapper variant missing \"value_type\""))?,
                            shells,
                        )?;
                        VariantDescriptor::Wrapper {
                            name,
                            number,
                            doc,
                            value_type,
                        }
                    }
                    other => return Err(Error::invalid_argument(format!("unknown variant kind: {other}"))),
                };
                variants.push(variant);
            }
            e.fill_variants(variants);
        }
        _ => unreachable!("kind validated in make_shell"),
    }
    Ok(())
}

fn resolve_type(
    json: &Json,
    shells: &HashMap<String, Arc<TypeDescriptor>>,
) -> Result<Arc<TypeDescriptor>, Error> {
    let obj = json
        .as_object()
        .ok_or_else(|| Error::invalid_argument("type signature must be an object"))?;
    let kind = json_str(obj, "kind")?;
    let value = obj
        .get("value")
        .ok_or_else(|| Error::invalid_argument("type signature missing \"value\""))?;
    Ok(match kind {
        "primitive" => Arc::new(TypeDescriptor::Primitive(PrimitiveKind::from_name(
            value.as_str().unwrap_or_default(),
        )?)),
        "optional" => Arc::new(TypeDescriptor::Optional(resolve_type(value, shells)?)),
        "array" => {
            let value_obj = value
                .as_object()
                .ok_or_else(|| Error::invalid_argument("array type value must be an object"))?;
            let item = resolve_type(
                value_obj
                    .get("item")
                    .ok_or_else(|| Error::invalid_argument("array type missing \"item\""))?,
                shells,
            )?;
            let key_property = value_obj
                .get("key_extractor")
                .and_then(Json::as_str)
                .map(str::to_string);
            Arc::new(TypeDescriptor::Array { item, key_property })
        }
        "record" => {
            let id = value
                .as_str()
                .ok_or_else(|| Error::invalid_argument("record type value must be a string"))?;
            shells
                .get(id)
                .cloned()
                .ok_or_else(|| Error::invalid_argument(format!("unknown record id: {id}")))?
        }
        other => return Err(Error::UnknownKind(other.to_string())),
    })
}

fn json_str<'a>(obj: &'a JsonMap<String, Json>, key: &str) -> Result<&'a str, Error> {
    obj.get(key)
        .and_then(Json::as_str)
        .ok_or_else(|| Error::invalid_argument(format!("missing or non-string \"{key}\"")))
}

fn json_u32(obj: &JsonMap<String, Json>, key: &str) -> Result<u32, Error> {
    obj.get(key)
        .and_then(Json::as_u64)
        .map(|n| n as u32)
        .ok_or_else(|| Error::invalid_argument(format!("missing or non-numeric \"{key}\"")))
}

pub fn as_json_code(descriptor: &TypeDescriptor) -> String {
    as_json(descriptor).to_string()
}

pub fn parse_from_json_code(code: &str) -> Result<Arc<TypeDescriptor>, Error> {
    let json: Json = serde_json::from_str(code)
        .map_err(|e| Error::invalid_argument(format!("invalid descriptor JSON: {e}")))?;
    parse_from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_struct() -> Arc<TypeDescriptor> {
        let s = StructDescriptor::new_shell("test.soia:Point", "");
        s.fill_fields(vec![
            FieldDescriptor {
                name: "x".into(),
                number: 0,
                doc: "".into(),
                type_descriptor: Arc::new(TypeDescriptor::Primitive(PrimitiveKind::Int32)),
            },
            FieldDescriptor {
                name: "y".into(),
                number: 1,
                doc: "".into(),
                type_descriptor: Arc::new(TypeDescriptor::Primitive(PrimitiveKind::Int32)),
            },
        ]);
        Arc::new(TypeDescriptor::Struct(Arc::new(s)))
    }

    #[test]
    fn round_trips_through_json() {
        let td = leaf_struct();
        let code = as_json_code(&td);
        let parsed = parse_from_json_code(&code).unwrap();
        let code2 = as_json_code(&parsed);
        assert_eq!(code, code2);
    }

    #[test]
    fn cyclic_struct_round_trips() {
        // A struct with an optional field of its own type.
        let shell = Arc::new(StructDescriptor::new_shell("test.soia:Node", ""));
        let self_type = Arc::new(TypeDescriptor::Struct(shell.clone()));
        shell.fill_fields(vec![FieldDescriptor {
            name: "next".into(),
            number: 0,
            doc: "".into(),
            type_descriptor: Arc::new(TypeDescriptor::Optional(self_type.clone())),
        }]);

        let code = as_json_code(&self_type);
        let parsed = parse_from_json_code(&code).unwrap();
        let code2 = as_json_code(&parsed);
        assert_eq!(code, code2);
    }
}
