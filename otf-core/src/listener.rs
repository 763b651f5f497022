//! Traversal engine.
//!
//! The listener replays a token range against a byte buffer using two
//! cursors, a token index and a byte offset, and calls handlers as it
//! crosses field and group boundaries. Repeating groups do not recurse: each
//! open group is a [`GroupContext`] on an explicit stack, and looping back for
//! the next element just rewinds the token index.
//!
//! ```text
//!   dispatch_message_by_header ──▶ reset_for_decode ──▶ subscribe
//!            (Idle)                (DecodingHeader)      walks header, resolves body,
//!                                                        walks body ──▶ Completed | Errored | Aborted
//! ```
//!
//! # Layout rules
//!
//! - Fields are laid out one after another from the current byte offset.
//! - A composite outside any field is delivered as a single field when it
//!   closes, so a multi-member header is one event.
//! - An encoding sits at `start of enclosing field/composite + token.offset`;
//!   an encoding whose offset is the sentinel sits at the current offset.
//! - A group begins after the fixed block of its parent (message block length
//!   or the enclosing element's `blockLength`), then a dimension composite,
//!   then `numInGroup` elements of at least `blockLength` bytes each.

use std::ops::ControlFlow;

use log::{debug, trace};

use crate::buffer::decode_primitive;
use crate::dispatch::{BodyRange, DispatchIndex};
use crate::error::{Error, Result};
use crate::event::{EncodingSlot, ErrorEvent, Field, Group, GroupEvent};
use crate::handler::{
    CompletionHandler, DecodeHandler, ErrorHandler, FieldHandler, GroupHandler, Handlers,
    IgnoreCompletion,
};
use crate::ir::Ir;
use crate::token::{Signal, Token};

// ============================================================================
// Public state types
// ============================================================================

/// Where the listener is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Nothing to walk: no dispatch installed or no buffer bound yet.
    Idle,
    /// Bound to a buffer, header not yet decoded.
    DecodingHeader,
    /// Bound to a buffer, walking (or about to walk) the message body.
    DecodingBody,
    Completed,
    Errored,
    /// A handler returned `Break`.
    Aborted,
}

/// How a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Errored,
    Aborted,
    /// `subscribe` was called without a dispatch and a bound buffer.
    NotReady,
}

impl Outcome {
    #[inline]
    pub fn is_completed(self) -> bool {
        self == Outcome::Completed
    }

    /// Number of completion events the walk produced (0 or 1).
    #[inline]
    pub fn completion_count(self) -> usize {
        self.is_completed() as usize
    }
}

/// Tunables for a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Deliver header fields to the field handler before the body.
    pub emit_header_fields: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            emit_header_fields: true,
        }
    }
}

/// Discriminator value and body start learned from a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderInfo {
    pub schema_id: u64,
    pub body_offset: usize,
}

// ============================================================================
// Internal state
// ============================================================================

#[derive(Debug, Clone)]
enum Dispatch<'ir> {
    None,
    Header {
        header: &'ir Ir,
        discriminator: String,
        discriminator_index: usize,
    },
    Body(BodyRange),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header,
    Body,
}

/// One open repeating group.
#[derive(Debug, Clone, Copy)]
struct GroupContext {
    /// `BeginGroup` token.
    token_index: usize,
    /// Matching `EndGroup` token.
    end_index: usize,
    /// First token after the dimension composite; each iteration restarts here.
    body_index: usize,
    block_length: usize,
    num_in_group: u64,
    iteration: u64,
    element_block_start: usize,
}

/// An open field or composite; encodings inside are positioned from `start`.
#[derive(Debug, Clone, Copy)]
struct Scope {
    token_index: usize,
    start: usize,
}

#[derive(Debug, Clone, Copy)]
struct OpenField<'ir> {
    token_index: usize,
    start: usize,
    composite: Option<&'ir str>,
}

struct Discard;

impl DecodeHandler for Discard {}

// ============================================================================
// Listener
// ============================================================================

/// Event-driven decoder for one buffer at a time.
///
/// The token stream and dispatch index are borrowed read-only and may be
/// shared by many listeners on many threads. A listener itself is reused by
/// calling [`reset_for_decode`](Self::reset_for_decode) between buffers.
#[derive(Debug)]
pub struct Listener<'ir, 'buf> {
    ir: &'ir Ir,
    index: &'ir DispatchIndex,
    options: DecodeOptions,
    dispatch: Dispatch<'ir>,
    state: ListenerState,
    phase: Phase,
    header_only: bool,

    buffer: &'buf [u8],
    token_index: usize,
    offset: usize,
    range_end: usize,
    message_block_end: Option<usize>,
    body: Option<BodyRange>,
    body_offset: usize,
    discriminator: Option<u64>,

    groups: Vec<GroupContext>,
    scopes: Vec<Scope>,
    field: Option<OpenField<'ir>>,
    encodings: Vec<EncodingSlot>,
    last_error: Option<Error>,
}

impl<'ir, 'buf> Listener<'ir, 'buf> {
    pub fn new(ir: &'ir Ir, index: &'ir DispatchIndex) -> Self {
        Self::with_options(ir, index, DecodeOptions::default())
    }

    pub fn with_options(ir: &'ir Ir, index: &'ir DispatchIndex, options: DecodeOptions) -> Self {
        Self {
            ir,
            index,
            options,
            dispatch: Dispatch::None,
            state: ListenerState::Idle,
            phase: Phase::Body,
            header_only: false,
            buffer: &[],
            token_index: 0,
            offset: 0,
            range_end: 0,
            message_block_end: None,
            body: None,
            body_offset: 0,
            discriminator: None,
            groups: Vec::with_capacity(8),
            scopes: Vec::with_capacity(8),
            field: None,
            encodings: Vec::with_capacity(8),
            last_error: None,
        }
    }

    // ------------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------------

    /// Decode `header` at the start of every buffer and pick the message body
    /// by the value of its `discriminator` field.
    ///
    /// Fails with `HeaderDecodeError` if the header schema has no such field
    /// or the field is not an integer. Nothing is installed on failure.
    pub fn dispatch_message_by_header(
        &mut self,
        header: &'ir Ir,
        discriminator: &str,
    ) -> Result<&mut Self> {
        let discriminator_index = header.find_field(discriminator).ok_or_else(|| {
            Error::HeaderDecodeError(format!(
                "discriminator field '{discriminator}' not present in header schema"
            ))
        })?;

        let encoding = header.tokens()[discriminator_index..]
            .iter()
            .find(|t| t.signal == Signal::Encoding)
            .ok_or_else(|| {
                Error::HeaderDecodeError(format!(
                    "discriminator field '{discriminator}' has no encoding"
                ))
            })?;
        if !encoding.primitive_type.is_integral() {
            return Err(Error::HeaderDecodeError(format!(
                "discriminator field '{discriminator}' is {}, not an integer",
                encoding.primitive_type
            )));
        }

        debug!("dispatching by header field '{discriminator}' (token {discriminator_index})");
        self.dispatch = Dispatch::Header {
            header,
            discriminator: discriminator.to_owned(),
            discriminator_index,
        };
        self.state = ListenerState::Idle;
        Ok(self)
    }

    /// Decode every buffer as the message registered under `schema_id`.
    pub fn dispatch_message(&mut self, schema_id: u16) -> Result<&mut Self> {
        let range = self.index.prepare_decode(schema_id)?;
        Ok(self.dispatch_range(range))
    }

    /// Decode every buffer against an already resolved body range.
    pub fn dispatch_range(&mut self, range: BodyRange) -> &mut Self {
        debug!("dispatching to template {} (tokens {:?})", range.schema_id, range.tokens);
        self.dispatch = Dispatch::Body(range);
        self.state = ListenerState::Idle;
        self
    }

    /// Bind `buffer[..length]` and re-anchor both cursors at its start.
    ///
    /// May be called any number of times; each call discards the previous
    /// walk's state.
    pub fn reset_for_decode(&mut self, buffer: &'buf [u8], length: usize) -> &mut Self {
        self.reset_for_decode_at(buffer, length, 0)
    }

    /// Like [`reset_for_decode`](Self::reset_for_decode), starting the walk at
    /// `start` (for example the body offset returned by [`decode_header`]).
    pub fn reset_for_decode_at(
        &mut self,
        buffer: &'buf [u8],
        length: usize,
        start: usize,
    ) -> &mut Self {
        self.buffer = &buffer[..length.min(buffer.len())];
        self.offset = start;
        self.body_offset = start;
        self.message_block_end = None;
        self.discriminator = None;
        self.groups.clear();
        self.scopes.clear();
        self.field = None;
        self.encodings.clear();
        self.last_error = None;

        match &self.dispatch {
            Dispatch::None => {
                self.state = ListenerState::Idle;
            }
            Dispatch::Header { header, .. } => {
                self.phase = Phase::Header;
                self.body = None;
                self.token_index = 0;
                self.range_end = header.len();
                self.state = ListenerState::DecodingHeader;
            }
            Dispatch::Body(range) => {
                self.phase = Phase::Body;
                self.body = Some(range.clone());
                self.token_index = range.tokens.start;
                self.range_end = range.tokens.end;
                self.state = ListenerState::DecodingBody;
            }
        }
        self
    }

    // ------------------------------------------------------------------------
    // Walking
    // ------------------------------------------------------------------------

    /// Walk the bound buffer, delivering events to the three handlers.
    pub fn subscribe<F, G, E>(&mut self, field: &mut F, group: &mut G, error: &mut E) -> Outcome
    where
        F: FieldHandler + ?Sized,
        G: GroupHandler + ?Sized,
        E: ErrorHandler + ?Sized,
    {
        self.subscribe_with_completion(field, group, error, &mut IgnoreCompletion)
    }

    /// Walk the bound buffer, also reporting completion.
    pub fn subscribe_with_completion<F, G, E, C>(
        &mut self,
        field: &mut F,
        group: &mut G,
        error: &mut E,
        completion: &mut C,
    ) -> Outcome
    where
        F: FieldHandler + ?Sized,
        G: GroupHandler + ?Sized,
        E: ErrorHandler + ?Sized,
        C: CompletionHandler + ?Sized,
    {
        let mut handlers = Handlers {
            field,
            group,
            error,
            completion,
        };
        self.decode(&mut handlers)
    }

    /// Walk the bound buffer, delivering every event to one handler.
    ///
    /// Returns without emitting anything if the walk for the current buffer
    /// already ended.
    pub fn decode<H: DecodeHandler + ?Sized>(&mut self, handler: &mut H) -> Outcome {
        match self.state {
            ListenerState::Idle => Outcome::NotReady,
            ListenerState::Completed => Outcome::Completed,
            ListenerState::Errored => Outcome::Errored,
            ListenerState::Aborted => Outcome::Aborted,
            ListenerState::DecodingHeader | ListenerState::DecodingBody => self.walk(handler),
        }
    }

    fn walk<H: DecodeHandler + ?Sized>(&mut self, handler: &mut H) -> Outcome {
        loop {
            if self.token_index >= self.range_end {
                let step = match self.phase {
                    Phase::Header => self.finish_header(),
                    Phase::Body => self.check_closed(self.token_index).map(|()| true),
                };
                match step {
                    Ok(true) => return self.complete(handler),
                    Ok(false) => continue,
                    Err(err) => return self.fail(handler, err),
                }
            }

            let tokens = self.tokens();
            let index = self.token_index;
            let Some(token) = tokens.get(index) else {
                let err = Error::malformed(index, "token range extends past the end of the stream");
                return self.fail(handler, err);
            };

            let step = match token.signal {
                Signal::BeginMessage => {
                    self.begin_message(token);
                    Ok(ControlFlow::Continue(()))
                }
                Signal::EndMessage => match self.phase {
                    Phase::Body => match self.check_closed(index) {
                        Ok(()) => return self.complete(handler),
                        Err(err) => Err(err),
                    },
                    Phase::Header => {
                        self.token_index = self.range_end;
                        Ok(ControlFlow::Continue(()))
                    }
                },
                Signal::BeginField => self.begin_field(tokens, index),
                Signal::EndField => self.end_field(tokens, index, handler),
                Signal::BeginComposite => self.begin_composite(tokens, index),
                Signal::EndComposite => self.end_composite(tokens, index, handler),
                Signal::Encoding => self.encoding(tokens, index, handler),
                Signal::BeginGroup => self.begin_group(tokens, index, handler),
                Signal::EndGroup => self.end_group(tokens, index, handler),
                Signal::None => {
                    self.token_index += 1;
                    Ok(ControlFlow::Continue(()))
                }
            };

            match step {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => return self.abort(),
                Err(err) => return self.fail(handler, err),
            }
        }
    }

    /// Tokens of the stream the current phase walks.
    fn tokens(&self) -> &'ir [Token] {
        match (&self.dispatch, self.phase) {
            (Dispatch::Header { header, .. }, Phase::Header) => header.tokens(),
            _ => self.ir.tokens(),
        }
    }

    fn begin_message(&mut self, token: &Token) {
        self.message_block_end = token
            .fixed_size()
            .filter(|&size| size > 0)
            .map(|size| self.offset + size);
        self.token_index += 1;
    }

    fn begin_field(&mut self, tokens: &'ir [Token], index: usize) -> Result<ControlFlow<()>> {
        if let Some(open) = self.field {
            return Err(Error::malformed(
                index,
                format!("field '{}' opened inside field '{}'", tokens[index].name, tokens[open.token_index].name),
            ));
        }
        self.field = Some(OpenField {
            token_index: index,
            start: self.offset,
            composite: None,
        });
        self.scopes.push(Scope {
            token_index: index,
            start: self.offset,
        });
        self.encodings.clear();
        self.token_index += 1;
        Ok(ControlFlow::Continue(()))
    }

    fn end_field<H: DecodeHandler + ?Sized>(
        &mut self,
        tokens: &'ir [Token],
        index: usize,
        handler: &mut H,
    ) -> Result<ControlFlow<()>> {
        let token = &tokens[index];
        let open = match self.field {
            Some(open) if tokens[open.token_index].matches_end(token) => open,
            _ => return Err(Error::malformed(index, format!("unmatched END_FIELD '{}'", token.name))),
        };
        self.close_scope(tokens, index)?;
        self.field = None;
        let flow = self.deliver_field(tokens, open, handler)?;
        self.token_index += 1;
        Ok(flow)
    }

    fn begin_composite(&mut self, tokens: &'ir [Token], index: usize) -> Result<ControlFlow<()>> {
        let token = &tokens[index];
        let start = self.position(token);
        match self.field.as_mut() {
            Some(open) => {
                open.composite.get_or_insert(token.name.as_str());
            }
            // a composite outside any field (a message header) is one field
            None => {
                self.field = Some(OpenField {
                    token_index: index,
                    start,
                    composite: Some(token.name.as_str()),
                });
                self.encodings.clear();
            }
        }
        self.scopes.push(Scope {
            token_index: index,
            start,
        });
        self.offset = self.offset.max(start);
        self.token_index += 1;
        Ok(ControlFlow::Continue(()))
    }

    fn end_composite<H: DecodeHandler + ?Sized>(
        &mut self,
        tokens: &'ir [Token],
        index: usize,
        handler: &mut H,
    ) -> Result<ControlFlow<()>> {
        let closing = self.scopes.last().map(|s| s.token_index);
        self.close_scope(tokens, index)?;
        let flow = match self.field {
            Some(open) if Some(open.token_index) == closing => {
                self.field = None;
                self.deliver_field(tokens, open, handler)?
            }
            _ => ControlFlow::Continue(()),
        };
        self.token_index += 1;
        Ok(flow)
    }

    fn encoding<H: DecodeHandler + ?Sized>(
        &mut self,
        tokens: &'ir [Token],
        index: usize,
        handler: &mut H,
    ) -> Result<ControlFlow<()>> {
        let token = &tokens[index];
        let position = self.position(token);
        decode_primitive(self.buffer, position, token, index)?;
        self.offset = self.offset.max(position + token.size as usize);

        let slot = EncodingSlot {
            token_index: index,
            offset: position,
        };
        if self.field.is_some() {
            self.encodings.push(slot);
            self.token_index += 1;
            return Ok(ControlFlow::Continue(()));
        }

        // an encoding outside any container is reported as a field of its own
        self.encodings.clear();
        self.encodings.push(slot);
        let open = OpenField {
            token_index: index,
            start: position,
            composite: None,
        };
        let flow = self.deliver_field(tokens, open, handler)?;
        self.token_index += 1;
        Ok(flow)
    }

    fn begin_group<H: DecodeHandler + ?Sized>(
        &mut self,
        tokens: &'ir [Token],
        index: usize,
        handler: &mut H,
    ) -> Result<ControlFlow<()>> {
        if self.field.is_some() || !self.scopes.is_empty() {
            return Err(Error::malformed(
                index,
                format!("group '{}' opened inside a field or composite", tokens[index].name),
            ));
        }

        // nested groups follow the fixed block of their parent
        let parent_block_end = match self.groups.last() {
            Some(parent) => Some(parent.element_block_start + parent.block_length),
            None => self.message_block_end,
        };
        if let Some(end) = parent_block_end {
            self.offset = self.offset.max(end);
        }

        let end_index = self.matching_end(tokens, index)?;
        let dim_begin = index + 1;
        if tokens.get(dim_begin).map(|t| t.signal) != Some(Signal::BeginComposite) {
            return Err(Error::malformed(
                dim_begin,
                format!("group '{}' has no dimension composite", tokens[index].name),
            ));
        }
        let dim_end = self.matching_end(tokens, dim_begin)?;
        let (block_length, num_in_group, dim_size) = self.decode_dimension(tokens, dim_begin, dim_end)?;
        self.offset += dim_size;

        if num_in_group == 0 {
            trace!("group '{}' is empty", tokens[index].name);
            self.token_index = end_index + 1;
            return Ok(ControlFlow::Continue(()));
        }

        let fixed = num_in_group
            .checked_mul(block_length as u64)
            .and_then(|n| usize::try_from(n).ok());
        let fits = fixed
            .and_then(|n| self.offset.checked_add(n))
            .is_some_and(|end| end <= self.buffer.len());
        if !fits {
            return Err(Error::BufferUnderrun {
                offset: self.offset,
                needed: fixed.unwrap_or(usize::MAX),
                length: self.buffer.len(),
            });
        }

        let context = GroupContext {
            token_index: index,
            end_index,
            body_index: dim_end + 1,
            block_length,
            num_in_group,
            iteration: 0,
            element_block_start: self.offset,
        };
        self.groups.push(context);
        self.token_index = context.body_index;
        trace!(
            "group '{}' start: {} x {} bytes at offset {}",
            tokens[index].name, num_in_group, block_length, self.offset
        );
        Ok(handler.on_group(&self.group_view(tokens, &context, GroupEvent::Start)))
    }

    fn end_group<H: DecodeHandler + ?Sized>(
        &mut self,
        tokens: &'ir [Token],
        index: usize,
        handler: &mut H,
    ) -> Result<ControlFlow<()>> {
        if self.field.is_some() || !self.scopes.is_empty() {
            return Err(Error::malformed(index, "END_GROUP inside an open field or composite"));
        }
        let context = match self.groups.last() {
            Some(context) if context.end_index == index => *context,
            _ => {
                return Err(Error::malformed(
                    index,
                    format!("unmatched END_GROUP '{}'", tokens[index].name),
                ))
            }
        };

        if handler
            .on_group(&self.group_view(tokens, &context, GroupEvent::End))
            .is_break()
        {
            return Ok(ControlFlow::Break(()));
        }

        let element_end = self.offset.max(context.element_block_start + context.block_length);
        let iteration = context.iteration + 1;
        self.offset = element_end;

        if iteration < context.num_in_group {
            let next = GroupContext {
                iteration,
                element_block_start: element_end,
                ..context
            };
            if let Some(top) = self.groups.last_mut() {
                *top = next;
            }
            self.token_index = next.body_index;
            trace!("group '{}' iteration {} at offset {}", tokens[index].name, iteration, element_end);
            Ok(handler.on_group(&self.group_view(tokens, &next, GroupEvent::Start)))
        } else {
            self.groups.pop();
            self.token_index = index + 1;
            Ok(ControlFlow::Continue(()))
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Buffer position of a token inside the innermost open field/composite.
    fn position(&self, token: &Token) -> usize {
        match (self.scopes.last(), token.fixed_offset()) {
            (Some(scope), Some(offset)) => scope.start + offset,
            _ => self.offset,
        }
    }

    fn close_scope(&mut self, tokens: &'ir [Token], index: usize) -> Result<()> {
        match self.scopes.last() {
            Some(scope) if tokens[scope.token_index].matches_end(&tokens[index]) => {
                self.scopes.pop();
                Ok(())
            }
            _ => Err(Error::malformed(
                index,
                format!("unmatched {} '{}'", tokens[index].signal, tokens[index].name),
            )),
        }
    }

    /// Index of the token closing the container opened at `begin`.
    fn matching_end(&self, tokens: &[Token], begin: usize) -> Result<usize> {
        let opener = &tokens[begin];
        let limit = self.range_end.min(tokens.len());
        let mut depth = 0usize;
        for (j, token) in tokens.iter().enumerate().take(limit).skip(begin + 1) {
            if token.signal.is_begin() {
                depth += 1;
            } else if token.signal.is_end() {
                if depth == 0 {
                    return if opener.matches_end(token) {
                        Ok(j)
                    } else {
                        Err(Error::malformed(
                            j,
                            format!("{} '{}' closes {} '{}'", token.signal, token.name, opener.signal, opener.name),
                        ))
                    };
                }
                depth -= 1;
            }
        }
        Err(Error::malformed(begin, format!("unclosed {} '{}'", opener.signal, opener.name)))
    }

    /// Read `(blockLength, numInGroup, encoded size)` from the dimension
    /// composite spanning `dim_begin..=dim_end`.
    fn decode_dimension(
        &self,
        tokens: &[Token],
        dim_begin: usize,
        dim_end: usize,
    ) -> Result<(usize, u64, usize)> {
        let start = self.offset;
        let mut end = start;
        let mut block_length = None;
        let mut num_in_group = None;
        let mut positional = [None; 2];
        let mut seen = 0;

        for (j, token) in tokens.iter().enumerate().take(dim_end).skip(dim_begin + 1) {
            if token.signal != Signal::Encoding {
                continue;
            }
            let position = token.fixed_offset().map_or(end, |o| start + o);
            let value = decode_primitive(self.buffer, position, token, j)?
                .as_u64()
                .ok_or_else(|| {
                    Error::malformed(
                        j,
                        format!("group dimension '{}' is not an unsigned integer", token.name),
                    )
                })?;
            end = end.max(position + token.size as usize);
            match token.name.as_str() {
                "blockLength" => block_length = Some(value),
                "numInGroup" => num_in_group = Some(value),
                _ => {}
            }
            if seen < positional.len() {
                positional[seen] = Some(value);
            }
            seen += 1;
        }

        let block_length = block_length
            .or(positional[0])
            .ok_or_else(|| Error::malformed(dim_begin, "group dimension has no blockLength"))?;
        let num_in_group = num_in_group
            .or(positional[1])
            .ok_or_else(|| Error::malformed(dim_begin, "group dimension has no numInGroup"))?;
        let block_length = usize::try_from(block_length)
            .map_err(|_| Error::malformed(dim_begin, "group blockLength does not fit in memory"))?;

        Ok((block_length, num_in_group, end - start))
    }

    fn group_view<'a>(&self, tokens: &'a [Token], context: &GroupContext, event: GroupEvent) -> Group<'a> {
        Group {
            token: &tokens[context.token_index],
            token_index: context.token_index,
            event,
            iteration: context.iteration,
            num_in_group: context.num_in_group,
            block_length: context.block_length as u64,
            depth: self.groups.len(),
        }
    }

    fn deliver_field<H: DecodeHandler + ?Sized>(
        &mut self,
        tokens: &'ir [Token],
        open: OpenField<'ir>,
        handler: &mut H,
    ) -> Result<ControlFlow<()>> {
        let is_header = self.phase == Phase::Header;
        if is_header {
            self.capture_discriminator(tokens, open.token_index)?;
            if !self.options.emit_header_fields {
                return Ok(ControlFlow::Continue(()));
            }
        }
        let field = Field {
            tokens,
            token_index: open.token_index,
            composite: open.composite,
            encodings: &self.encodings,
            buffer: self.buffer,
            offset: open.start,
            encoded_len: self.offset.saturating_sub(open.start),
            is_header,
        };
        Ok(handler.on_field(&field))
    }

    fn capture_discriminator(&mut self, tokens: &[Token], token_index: usize) -> Result<()> {
        let Dispatch::Header { discriminator_index, discriminator, .. } = &self.dispatch else {
            return Ok(());
        };
        // the discriminator is either the delivered field itself or one of
        // the members of a delivered composite
        let slot = if *discriminator_index == token_index {
            self.encodings.first().ok_or_else(|| {
                Error::HeaderDecodeError(format!("discriminator '{discriminator}' has no encoding"))
            })?
        } else {
            match self.encodings.iter().find(|s| s.token_index == *discriminator_index) {
                Some(slot) => slot,
                None => return Ok(()),
            }
        };
        let value = decode_primitive(self.buffer, slot.offset, &tokens[slot.token_index], slot.token_index)?
            .as_u64()
            .ok_or_else(|| {
                Error::HeaderDecodeError(format!("discriminator '{discriminator}' is not an unsigned integer"))
            })?;
        self.discriminator = Some(value);
        Ok(())
    }

    /// Header exhausted: resolve the body. Returns true for header-only walks.
    fn finish_header(&mut self) -> Result<bool> {
        self.check_closed(self.token_index)?;
        let Dispatch::Header { discriminator, .. } = &self.dispatch else {
            return Err(Error::HeaderDecodeError("no header dispatch installed".to_owned()));
        };
        let value = self.discriminator.ok_or_else(|| {
            Error::HeaderDecodeError(format!("discriminator '{discriminator}' was not decoded"))
        })?;
        if self.header_only {
            return Ok(true);
        }

        let body = self.index.prepare_decode_raw(value)?;
        debug!(
            "header resolved template {} (tokens {:?}), body at offset {}",
            body.schema_id, body.tokens, self.offset
        );
        self.phase = Phase::Body;
        self.state = ListenerState::DecodingBody;
        self.token_index = body.tokens.start;
        self.range_end = body.tokens.end;
        self.body_offset = self.offset;
        self.message_block_end = None;
        self.body = Some(body);
        Ok(false)
    }

    /// Fail if any container is still open when the walk reaches an end.
    fn check_closed(&self, index: usize) -> Result<()> {
        let tokens = self.tokens();
        if let Some(open) = self.field.map(|f| f.token_index).or(self.scopes.last().map(|s| s.token_index)) {
            return Err(Error::malformed(index, format!("unclosed {} '{}'", tokens[open].signal, tokens[open].name)));
        }
        if let Some(group) = self.groups.last() {
            return Err(Error::malformed(
                index,
                format!("unclosed BEGIN_GROUP '{}'", tokens[group.token_index].name),
            ));
        }
        Ok(())
    }

    fn complete<H: DecodeHandler + ?Sized>(&mut self, handler: &mut H) -> Outcome {
        self.state = ListenerState::Completed;
        if !self.header_only {
            debug!("decode completed at offset {}", self.offset);
            let _ = handler.on_completed();
        }
        Outcome::Completed
    }

    fn fail<H: DecodeHandler + ?Sized>(&mut self, handler: &mut H, error: Error) -> Outcome {
        debug!("decode failed at token {} offset {}: {}", self.token_index, self.offset, error);
        self.state = ListenerState::Errored;
        let event = ErrorEvent {
            error: &error,
            token_index: self.token_index,
            buffer_offset: self.offset,
        };
        let _ = handler.on_error(&event);
        self.last_error = Some(error);
        Outcome::Errored
    }

    fn abort(&mut self) -> Outcome {
        debug!("decode aborted by handler at token {} offset {}", self.token_index, self.offset);
        self.state = ListenerState::Aborted;
        Outcome::Aborted
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    #[inline]
    pub fn state(&self) -> ListenerState {
        self.state
    }

    #[inline]
    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    /// Current token index (into the header or message stream).
    #[inline]
    pub fn token_index(&self) -> usize {
        self.token_index
    }

    /// Current byte offset into the bound buffer.
    #[inline]
    pub fn buffer_offset(&self) -> usize {
        self.offset
    }

    /// Offset at which the message body starts (after the header, if any).
    #[inline]
    pub fn body_offset(&self) -> usize {
        self.body_offset
    }

    /// Body range being walked, once resolved.
    #[inline]
    pub fn body_range(&self) -> Option<&BodyRange> {
        self.body.as_ref()
    }

    /// Discriminator read from the header during the current walk.
    #[inline]
    pub fn discriminator(&self) -> Option<u64> {
        self.discriminator
    }

    /// Number of groups currently open.
    #[inline]
    pub fn group_depth(&self) -> usize {
        self.groups.len()
    }

    /// Error that ended the last walk, if any.
    #[inline]
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }
}

/// Decode just the header of `buffer` and return the discriminator value and
/// the offset where the body starts.
pub fn decode_header(header: &Ir, buffer: &[u8], discriminator: &str) -> Result<HeaderInfo> {
    let empty = Ir::new();
    let index = DispatchIndex::default();
    let mut listener = Listener::new(&empty, &index);
    listener.header_only = true;
    listener
        .dispatch_message_by_header(header, discriminator)?
        .reset_for_decode(buffer, buffer.len());

    match listener.decode(&mut Discard) {
        Outcome::Completed => {
            let schema_id = listener.discriminator.ok_or_else(|| {
                Error::HeaderDecodeError(format!("discriminator '{discriminator}' was not decoded"))
            })?;
            Ok(HeaderInfo {
                schema_id,
                body_offset: listener.offset,
            })
        }
        _ => Err(listener
            .last_error
            .take()
            .unwrap_or_else(|| Error::HeaderDecodeError("header walk did not complete".to_owned()))),
    }
}
