//! Decoder error kinds.
//!
//! Setup operations (index build, dispatch) return these as `Err`. Errors
//! found while walking a buffer are delivered once to the error handler
//! wrapped in an [`ErrorEvent`](crate::event::ErrorEvent).

use thiserror::Error;

use crate::token::PrimitiveType;

/// Everything that can go wrong while indexing a schema or walking a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// Token stream is unbalanced or otherwise inconsistent.
    #[error("malformed schema at token {index}: {reason}")]
    MalformedSchema { index: usize, reason: String },

    /// No message is registered under this schema id.
    #[error("unknown schema id {0}")]
    UnknownSchemaId(u64),

    /// The header discriminator is missing, mistyped or unreadable.
    #[error("header decode error: {0}")]
    HeaderDecodeError(String),

    /// A read would run past the end of the supplied buffer.
    #[error("buffer underrun: {needed} bytes at offset {offset} exceed buffer length {length}")]
    BufferUnderrun {
        offset: usize,
        needed: usize,
        length: usize,
    },

    /// The decoder cannot interpret this primitive/size combination.
    #[error("unsupported primitive type {primitive_type} with size {size} at token {index}")]
    UnsupportedPrimitiveType {
        index: usize,
        primitive_type: PrimitiveType,
        size: usize,
    },
}

impl Error {
    pub(crate) fn malformed(index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedSchema {
            index,
            reason: reason.into(),
        }
    }

    /// Short stable name of the error kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::MalformedSchema { .. } => "MalformedSchema",
            Self::UnknownSchemaId(_) => "UnknownSchemaId",
            Self::HeaderDecodeError(_) => "HeaderDecodeError",
            Self::BufferUnderrun { .. } => "BufferUnderrun",
            Self::UnsupportedPrimitiveType { .. } => "UnsupportedPrimitiveType",
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
