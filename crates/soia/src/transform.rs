//! Reflective, shape-preserving value transformation (spec §4.8).
//!
//! [`DynValue`] is a type-erased mirror of any value the [`crate::descriptor`]
//! graph can describe. [`transform`] walks it bottom-up and asks a
//! [`Visitor`] to rewrite each node after its children have already been
//! rewritten — useful for schema-agnostic passes (redaction, key rewriting,
//! auditing) that a generated, concretely-typed struct can't express without
//! one visitor impl per message type.

use crate::list::ListKey;

/// A scalar value detached from its static Rust type.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    Timestamp(i64),
    String(String),
    Bytes(Vec<u8>),
}

/// A type-erased soia value, shaped like [`crate::descriptor::TypeDescriptor`].
#[derive(Debug, Clone, PartialEq)]
pub enum DynValue {
    Primitive(PrimitiveValue),
    Optional(Option<Box<DynValue>>),
    Array {
        items: Vec<DynValue>,
        key_property: Option<String>,
    },
    Struct {
        record_id: String,
        fields: Vec<(String, DynValue)>,
    },
    Enum {
        record_id: String,
        variant: String,
        payload: Option<Box<DynValue>>,
    },
}

/// Callbacks invoked bottom-up by [`transform`]. Every method defaults to
/// the identity transform, so a visitor only needs to override the node
/// kinds it cares about.
pub trait Visitor {
    fn visit_primitive(&mut self, value: PrimitiveValue) -> PrimitiveValue {
        value
    }

    fn visit_optional(&mut self, value: Option<DynValue>) -> Option<DynValue> {
        value
    }

    fn visit_array(&mut self, key_property: Option<&str>, items: Vec<DynValue>) -> Vec<DynValue> {
        let _ = key_property;
        items
    }

    fn visit_struct(&mut self, record_id: &str, fields: Vec<(String, DynValue)>) -> Vec<(String, DynValue)> {
        let _ = record_id;
        fields
    }

    fn visit_enum(
        &mut self,
        record_id: &str,
        variant: String,
        payload: Option<DynValue>,
    ) -> (String, Option<DynValue>) {
        let _ = record_id;
        (variant, payload)
    }
}

/// Recursively rewrites `value`, transforming children before asking
/// `visitor` to rewrite the parent node they belong to.
pub fn transform(value: DynValue, visitor: &mut impl Visitor) -> DynValue {
    match value {
        DynValue::Primitive(p) => DynValue::Primitive(visitor.visit_primitive(p)),
        DynValue::Optional(inner) => {
            let inner = inner.map(|boxed| transform(*boxed, visitor));
            DynValue::Optional(visitor.visit_optional(inner).map(Box::new))
        }
        DynValue::Array { items, key_property } => {
            let items: Vec<DynValue> = items.into_iter().map(|item| transform(item, visitor)).collect();
            DynValue::Array {
                items: visitor.visit_array(key_property.as_deref(), items),
                key_property,
            }
        }
        DynValue::Struct { record_id, fields } => {
            let fields: Vec<(String, DynValue)> = fields
                .into_iter()
                .map(|(name, value)| (name, transform(value, visitor)))
                .collect();
            DynValue::Struct {
                fields: visitor.visit_struct(&record_id, fields),
                record_id,
            }
        }
        DynValue::Enum {
            record_id,
            variant,
            payload,
        } => {
            let payload = payload.map(|boxed| transform(*boxed, visitor));
            let (variant, payload) = visitor.visit_enum(&record_id, variant, payload);
            DynValue::Enum {
                record_id,
                variant,
                payload: payload.map(Box::new),
            }
        }
    }
}

/// A key seen while transforming a keyed array, handed to visitors that need
/// to correlate a rewritten item back to its original key.
pub fn array_item_key(item: &DynValue, key_field: &str) -> Option<ListKey> {
    let DynValue::Struct { fields, .. } = item else {
        return None;
    };
    fields.iter().find(|(name, _)| name == key_field).and_then(|(_, value)| match value {
        DynValue::Primitive(PrimitiveValue::String(s)) => Some(ListKey::String(s.clone())),
        DynValue::Primitive(PrimitiveValue::Int64(n)) => Some(ListKey::Int64(*n)),
        DynValue::Primitive(PrimitiveValue::Uint64(n)) => Some(ListKey::Uint64(*n)),
        DynValue::Primitive(PrimitiveValue::Bool(b)) => Some(ListKey::Bool(*b)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UppercaseStrings;

    impl Visitor for UppercaseStrings {
        fn visit_primitive(&mut self, value: PrimitiveValue) -> PrimitiveValue {
            match value {
                PrimitiveValue::String(s) => PrimitiveValue::String(s.to_uppercase()),
                other => other,
            }
        }
    }

    #[test]
    fn rewrites_nested_strings_bottom_up() {
        let value = DynValue::Struct {
            record_id: "test.soia:Pair".to_string(),
            fields: vec![
                ("a".to_string(), DynValue::Primitive(PrimitiveValue::String("hi".into()))),
                (
                    "b".to_string(),
                    DynValue::Array {
                        items: vec![DynValue::Primitive(PrimitiveValue::String("lo".into()))],
                        key_property: None,
                    },
                ),
            ],
        };
        let result = transform(value, &mut UppercaseStrings);
        let DynValue::Struct { fields, .. } = result else {
            panic!("expected struct");
        };
        assert_eq!(
            fields[0].1,
            DynValue::Primitive(PrimitiveValue::String("HI".into()))
        );
        let DynValue::Array { items, .. } = &fields[1].1 else {
            panic!("expected array");
        };
        assert_eq!(items[0], DynValue::Primitive(PrimitiveValue::String("LO".into())));
    }

    #[test]
    fn struct_visitor_can_drop_fields() {
        struct DropSecret;
        impl Visitor for DropSecret {
            fn visit_struct(
                &mut self,
                _record_id: &str,
                fields: Vec<(String, DynValue)>,
            ) -> Vec<(String, DynValue)> {
                fields.into_iter().filter(|(name, _)| name != "secret").collect()
            }
        }

        let value = DynValue::Struct {
            record_id: "test.soia:Creds".to_string(),
            fields: vec![
                ("user".to_string(), DynValue::Primitive(PrimitiveValue::String("a".into()))),
                ("secret".to_string(), DynValue::Primitive(PrimitiveValue::String("s".into()))),
            ],
        };
        let result = transform(value, &mut DropSecret);
        let DynValue::Struct { fields, .. } = result else {
            panic!("expected struct");
        };
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, "user");
    }

    #[test]
    fn array_item_key_reads_the_named_field() {
        let item = DynValue::Struct {
            record_id: "test.soia:Tagged".to_string(),
            fields: vec![("id".to_string(), DynValue::Primitive(PrimitiveValue::String("k1".into())))],
        };
        assert_eq!(array_item_key(&item, "id"), Some(ListKey::String("k1".into())));
        assert_eq!(array_item_key(&item, "missing"), None);
    }
}
