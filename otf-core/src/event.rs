//! Callback payloads - transient views handed to handlers.
//!
//! Every view borrows the token stream, the message buffer and the
//! listener's scratch state, so it cannot outlive the callback it was passed
//! to. Values are decoded from the buffer when an accessor asks for them,
//! not when the view is built.
//!
//! For a group with two elements the handlers observe:
//! ```text
//! Group { event: Start, iteration: 0 }
//! Field ...
//! Group { event: End, iteration: 0 }
//! Group { event: Start, iteration: 1 }
//! Field ...
//! Group { event: End, iteration: 1 }
//! ```

use crate::buffer::decode_primitive;
use crate::error::{Error, Result};
use crate::token::Token;
use crate::value::PrimitiveValue;

/// Position of one `Encoding` token inside the buffer, resolved by the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EncodingSlot {
    pub token_index: usize,
    pub offset: usize,
}

// ============================================================================
// Field
// ============================================================================

/// A decoded field (or a standalone header encoding).
#[derive(Debug, Clone, Copy)]
pub struct Field<'a> {
    pub(crate) tokens: &'a [Token],
    pub(crate) token_index: usize,
    pub(crate) composite: Option<&'a str>,
    pub(crate) encodings: &'a [EncodingSlot],
    pub(crate) buffer: &'a [u8],
    pub(crate) offset: usize,
    pub(crate) encoded_len: usize,
    pub(crate) is_header: bool,
}

impl<'a> Field<'a> {
    /// The token that opened this field.
    #[inline]
    pub fn token(&self) -> &'a Token {
        &self.tokens[self.token_index]
    }

    #[inline]
    pub fn name(&self) -> &'a str {
        &self.token().name
    }

    #[inline]
    pub fn schema_id(&self) -> u16 {
        self.token().schema_id
    }

    /// Index of the opening token in its stream (header or message).
    #[inline]
    pub fn token_index(&self) -> usize {
        self.token_index
    }

    /// Buffer offset of the first byte of the field.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of bytes the field occupies.
    #[inline]
    pub fn encoded_len(&self) -> usize {
        self.encoded_len
    }

    /// True for fields belonging to the message header.
    #[inline]
    pub fn is_header(&self) -> bool {
        self.is_header
    }

    /// Name of the composite type, for composite fields.
    #[inline]
    pub fn composite_name(&self) -> Option<&'a str> {
        self.composite
    }

    #[inline]
    pub fn encoding_count(&self) -> usize {
        self.encodings.len()
    }

    /// Decode the `i`th encoding of the field.
    pub fn value_at(&self, i: usize) -> Result<PrimitiveValue<'a>> {
        let slot = self.encodings.get(i).ok_or_else(|| {
            Error::malformed(
                self.token_index,
                format!("field '{}' has no encoding {}", self.name(), i),
            )
        })?;
        decode_primitive(self.buffer, slot.offset, &self.tokens[slot.token_index], slot.token_index)
    }

    /// Decode the first (for simple fields, the only) encoding.
    #[inline]
    pub fn value(&self) -> Result<PrimitiveValue<'a>> {
        self.value_at(0)
    }

    /// Iterate `(encoding token, decoded value)` in declaration order.
    pub fn encodings(&self) -> impl Iterator<Item = (&'a Token, Result<PrimitiveValue<'a>>)> + 'a {
        let tokens = self.tokens;
        let buffer = self.buffer;
        let slots = self.encodings;
        slots.iter().map(move |slot| {
            let token = &tokens[slot.token_index];
            (token, decode_primitive(buffer, slot.offset, token, slot.token_index))
        })
    }

    /// Look up a composite member by encoding name.
    pub fn member(&self, name: &str) -> Option<Result<PrimitiveValue<'a>>> {
        self.encodings().find(|(token, _)| token.name == name).map(|(_, v)| v)
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.value().ok()?.as_u64()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.value().ok()?.as_i64()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value().ok()?.as_f64()
    }

    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        self.value().ok()?.as_bytes()
    }

    pub fn as_str(&self) -> Option<&'a str> {
        self.value().ok()?.as_str()
    }
}

// ============================================================================
// Group
// ============================================================================

/// Which edge of a group iteration is being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupEvent {
    Start,
    End,
}

/// A repeating group boundary.
#[derive(Debug, Clone, Copy)]
pub struct Group<'a> {
    pub(crate) token: &'a Token,
    pub(crate) token_index: usize,
    pub(crate) event: GroupEvent,
    pub(crate) iteration: u64,
    pub(crate) num_in_group: u64,
    pub(crate) block_length: u64,
    pub(crate) depth: usize,
}

impl<'a> Group<'a> {
    #[inline]
    pub fn name(&self) -> &'a str {
        &self.token.name
    }

    #[inline]
    pub fn schema_id(&self) -> u16 {
        self.token.schema_id
    }

    /// Index of the `BeginGroup` token.
    #[inline]
    pub fn token_index(&self) -> usize {
        self.token_index
    }

    #[inline]
    pub fn event(&self) -> GroupEvent {
        self.event
    }

    /// Zero-based element being entered or left.
    #[inline]
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    #[inline]
    pub fn num_in_group(&self) -> u64 {
        self.num_in_group
    }

    #[inline]
    pub fn block_length(&self) -> u64 {
        self.block_length
    }

    /// Nesting level, 1 for a group directly inside the message.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }
}

// ============================================================================
// Error
// ============================================================================

/// A walk-terminating error with the cursor positions where it was found.
#[derive(Debug, Clone, Copy)]
pub struct ErrorEvent<'a> {
    pub(crate) error: &'a Error,
    pub(crate) token_index: usize,
    pub(crate) buffer_offset: usize,
}

impl<'a> ErrorEvent<'a> {
    #[inline]
    pub fn error(&self) -> &'a Error {
        self.error
    }

    /// Human-readable description.
    pub fn message(&self) -> String {
        self.error.to_string()
    }

    #[inline]
    pub fn token_index(&self) -> usize {
        self.token_index
    }

    #[inline]
    pub fn buffer_offset(&self) -> usize {
        self.buffer_offset
    }
}
