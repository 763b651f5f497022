//! Dispatch index: template id -> token range.
//!
//! Building the index is also where the balance invariant is checked: every
//! BEGIN token needs a later END of the same family and schema id, containers
//! must not interleave, and messages never nest.

use std::collections::HashMap;
use std::ops::Range;

use log::debug;

use crate::error::{Error, Result};
use crate::ir::Ir;
use crate::token::{Family, Signal};

/// Resolved token range of one message body, ready to anchor a decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyRange {
    pub schema_id: u16,
    /// Half-open range, `BeginMessage` at `tokens.start`.
    pub tokens: Range<usize>,
}

/// Read-only map from message schema id to its `[begin, end)` token range.
#[derive(Debug, Clone, Default)]
pub struct DispatchIndex {
    ranges: HashMap<u16, Range<usize>>,
}

impl DispatchIndex {
    /// Index every message in `ir`, validating nesting as we go.
    pub fn build(ir: &Ir) -> Result<Self> {
        let mut ranges = HashMap::new();
        // token indices of open containers
        let mut open: Vec<usize> = Vec::with_capacity(16);

        for (i, token) in ir.iter().enumerate() {
            match token.signal {
                Signal::BeginMessage => {
                    if !open.is_empty() {
                        return Err(Error::malformed(
                            i,
                            format!("message '{}' nested inside another container", token.name),
                        ));
                    }
                    open.push(i);
                }
                signal if signal.is_begin() => {
                    if open.is_empty() {
                        return Err(Error::malformed(
                            i,
                            format!("{} '{}' outside of a message", signal, token.name),
                        ));
                    }
                    open.push(i);
                }
                signal if signal.is_end() => {
                    let begin_index = open.pop().ok_or_else(|| {
                        Error::malformed(i, format!("unmatched {} '{}'", signal, token.name))
                    })?;
                    let begin = &ir[begin_index];
                    if !begin.matches_end(token) {
                        return Err(Error::malformed(
                            i,
                            format!(
                                "{} '{}' (id {}) closes {} '{}' (id {}) opened at token {}",
                                signal, token.name, token.schema_id,
                                begin.signal, begin.name, begin.schema_id, begin_index
                            ),
                        ));
                    }
                    if signal.family() == Some(Family::Message)
                        && ranges.insert(token.schema_id, begin_index..i + 1).is_some()
                    {
                        return Err(Error::malformed(
                            begin_index,
                            format!("duplicate template id {}", token.schema_id),
                        ));
                    }
                }
                Signal::None => {}
                signal => {
                    if open.is_empty() {
                        return Err(Error::malformed(
                            i,
                            format!("{} '{}' outside of a message", signal, token.name),
                        ));
                    }
                }
            }
        }

        if let Some(&index) = open.last() {
            return Err(Error::malformed(
                index,
                format!("unclosed {} '{}'", ir[index].signal, ir[index].name),
            ));
        }

        debug!("dispatch index built: {} message(s) over {} tokens", ranges.len(), ir.len());
        Ok(Self { ranges })
    }

    /// Token range for `schema_id`.
    pub fn range(&self, schema_id: u16) -> Result<Range<usize>> {
        self.ranges
            .get(&schema_id)
            .cloned()
            .ok_or(Error::UnknownSchemaId(schema_id as u64))
    }

    /// Resolve `schema_id` to a body range for a decode.
    pub fn prepare_decode(&self, schema_id: u16) -> Result<BodyRange> {
        let tokens = self.range(schema_id)?;
        Ok(BodyRange { schema_id, tokens })
    }

    /// Resolve a raw discriminator value (as read from a header).
    pub fn prepare_decode_raw(&self, value: u64) -> Result<BodyRange> {
        let schema_id = u16::try_from(value).map_err(|_| Error::UnknownSchemaId(value))?;
        self.prepare_decode(schema_id).map_err(|_| Error::UnknownSchemaId(value))
    }

    pub fn contains(&self, schema_id: u16) -> bool {
        self.ranges.contains_key(&schema_id)
    }

    /// Registered ids in ascending order.
    pub fn schema_ids(&self) -> Vec<u16> {
        let mut ids: Vec<u16> = self.ranges.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
