//! Runtime support for generated soia data-access code.
//!
//! This crate implements the wire codec, JSON codec, and reflective type
//! descriptors that soia-generated structs and enums are built on top of.
//! It is not meant to be used directly against hand-written types — a code
//! generator wires a schema's fields/variants into [`struct_ser::StructBuilder`]
//! or [`enum_ser::EnumBuilder`], producing a [`serializer::Serializer<T>`]
//! that generated code exposes however it likes (commonly a `const`/`static`
//! or an associated function on `T`).
//!
//! # Layout
//!
//! - [`varint`] — the wire tag table and the shared [`varint::Cursor`] byte reader.
//! - [`primitive`] — encode/decode/JSON for the nine scalar kinds.
//! - [`optional`], [`list`] — `Optional<T>` and array/keyed-list serializers.
//! - [`struct_ser`], [`enum_ser`] — the builder/finalize registration API.
//! - [`unrecognized`] — opaque payloads preserved for forward compatibility.
//! - [`descriptor`] — the reflective type descriptor graph and its JSON form.
//! - [`transform`] — schema-agnostic, shape-preserving value rewriting.
//! - [`framing`] — the `"soia"`-magic top-level binary frame.
//! - [`serializer`] — the `Serializer<T>` façade tying all of the above together.
//!
//! # Errors and logging
//!
//! Fallible operations return [`error::Error`]. Building with the `tracing`
//! feature emits a debug event when a struct or enum builder finalizes
//! (naming its record id and slot/variant count) and a trace event whenever
//! a decoder captures an unrecognized field or variant — useful for
//! noticing schema drift between services without failing the decode.

pub mod descriptor;
pub mod enum_ser;
pub mod error;
pub mod framing;
pub mod list;
pub mod optional;
pub mod primitive;
pub mod serializer;
pub mod struct_ser;
pub mod transform;
pub mod unrecognized;
pub mod varint;

pub use error::{Error, Result};
pub use list::{List, ListKey};
pub use serializer::{CodecImpl, Serializer};
pub use unrecognized::{RawValue, UnrecognizedEnum, UnrecognizedFields};

#[cfg(feature = "tracing")]
pub(crate) fn trace_unrecognized(kind: &'static str, number: u32) {
    tracing::trace!(kind, number, "captured unrecognized soia payload");
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn trace_unrecognized(_kind: &'static str, _number: u32) {}

#[cfg(feature = "tracing")]
pub(crate) fn trace_finalize(kind: &'static str, record_id: &str, slot_count: usize) {
    tracing::debug!(kind, record_id, slot_count, "finalized soia serializer");
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn trace_finalize(_kind: &'static str, _record_id: &str, _slot_count: usize) {}
