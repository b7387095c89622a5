//! Error taxonomy for the soia runtime (spec §7).
//!
//! Every decode entry point returns [`Result<T, Error>`](Error); encoding is
//! infallible for well-typed inputs. Decoders never panic on unknown
//! fields/variants/numbers — that path goes through the unrecognized
//! bookkeeping in [`crate::struct_ser`] and [`crate::enum_ser`]. Truncation or
//! structural corruption is the only thing that is fatal.

use std::fmt;

/// Errors surfaced by binary decoding, JSON decoding, descriptor ingestion,
/// and builder misuse.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unexpected wire tag, truncated buffer, or non-UTF-8 bytes in a string
    /// context.
    #[error("invalid wire format at byte {offset}: {reason}")]
    InvalidWire {
        offset: usize,
        reason: &'static str,
    },

    /// A JSON value's shape didn't match the expected variant (e.g. a
    /// wrapper enum variant encountered as a bare primitive number).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The top-level decode consumed fewer bytes than were supplied.
    #[error("trailing bytes after decoded value: {remaining} byte(s) unread")]
    TrailingBytes { remaining: usize },

    /// A registration call arrived after `finalize()`, or `finalize()` was
    /// called twice.
    #[error("serializer already finalized")]
    AlreadyFinalized,

    /// Descriptor-JSON ingestion saw a `kind: "primitive"` value string it
    /// doesn't recognize.
    #[error("unknown primitive kind: {0}")]
    UnknownPrimitive(String),

    /// Descriptor-JSON ingestion saw a top-level `kind` string it doesn't
    /// recognize.
    #[error("unknown descriptor kind: {0}")]
    UnknownKind(String),
}

impl Error {
    pub(crate) fn invalid_wire(offset: usize, reason: &'static str) -> Self {
        Error::InvalidWire { offset, reason }
    }

    pub(crate) fn invalid_argument(reason: impl fmt::Display) -> Self {
        Error::InvalidArgument(reason.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
