//! Token stream (`Ir`).
//!
//! An `Ir` is an ordered run of [`Token`]s holding one or more message
//! schemas back to back, or a header schema on its own. It is append-only
//! while being built and read-only once handed to a
//! [`Listener`](crate::Listener); sharing it between threads needs no locking.

use std::ops::{Index, Range};
use std::slice;

use crate::token::{ByteOrder, PrimitiveType, Signal, Token};

/// Ordered collection of schema tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ir {
    tokens: Vec<Token>,
}

impl Ir {
    pub fn new() -> Self {
        Self { tokens: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tokens: Vec::with_capacity(capacity),
        }
    }

    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Append a token, preserving order.
    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    /// Append a token built from its parts. Argument order follows the
    /// schema compiler's emit order.
    #[allow(clippy::too_many_arguments)]
    pub fn add_token(
        &mut self,
        offset: u32,
        size: u32,
        signal: Signal,
        byte_order: ByteOrder,
        primitive_type: PrimitiveType,
        schema_id: u16,
        name: impl Into<String>,
    ) -> &mut Self {
        self.tokens
            .push(Token::new(offset, size, signal, byte_order, primitive_type, schema_id, name));
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    #[inline]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Tokens in `range`, None if it reaches past the end.
    pub fn slice(&self, range: Range<usize>) -> Option<&[Token]> {
        self.tokens.get(range)
    }

    pub fn iter(&self) -> slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    /// Index of the first field named `name`.
    ///
    /// Matches a `BeginField` token, or an `Encoding` token that is not
    /// enclosed by a field (header composites are flat encodings).
    pub fn find_field(&self, name: &str) -> Option<usize> {
        let mut field_depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate() {
            match token.signal {
                Signal::BeginField => {
                    if token.name == name {
                        return Some(i);
                    }
                    field_depth += 1;
                }
                Signal::EndField => field_depth = field_depth.saturating_sub(1),
                Signal::Encoding if field_depth == 0 && token.name == name => return Some(i),
                _ => {}
            }
        }
        None
    }
}

impl Index<usize> for Ir {
    type Output = Token;

    fn index(&self, index: usize) -> &Token {
        &self.tokens[index]
    }
}

impl<'a> IntoIterator for &'a Ir {
    type Item = &'a Token;
    type IntoIter = slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

impl FromIterator<Token> for Ir {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

impl Extend<Token> for Ir {
    fn extend<I: IntoIterator<Item = Token>>(&mut self, iter: I) {
        self.tokens.extend(iter);
    }
}
