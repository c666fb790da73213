//! Module: index::key
//! Responsibility: order-preserving field framing for index and HKey bytes.
//! Does not own: which columns a row carries, or row-level comparison.
//! Boundary: every byte written into a physical key goes through here.
//!
//! Invariants:
//! - Every field is `tag, escaped payload, 0x00`; payload bytes never contain 0x00,
//!   so field boundaries are found by scanning for zero bytes.
//! - Byte order of encoded fields matches value order within each tag and
//!   tag order across tags.
//! - `KeyEdge::Before` sorts below and `KeyEdge::After` above every value field.

mod parts;
mod semantics;


use crate::{
    error::InternalError,
    model::Collation,
    value::{Value, ValueTag},
};
use std::ops::Range;
use thiserror::Error as ThisError;

/// Terminates every encoded field.
pub const FIELD_TERMINATOR: u8 = 0x00;

const EDGE_BEFORE: u8 = 0x01;
const EDGE_AFTER: u8 = 0xFF;

///
/// OrderedFieldDecodeError
///
/// Malformed field bytes encountered while decoding a stored key.
///

#[derive(Debug, ThisError)]
pub enum OrderedFieldDecodeError {
    #[error("empty key field")]
    EmptyField,

    #[error("unknown key field tag 0x{tag:02x}")]
    UnknownTag { tag: u8 },

    #[error("invalid escape sequence 0x01 0x{byte:02x}")]
    InvalidEscape { byte: u8 },

    #[error("dangling escape byte at end of field")]
    DanglingEscape,

    #[error("{kind} field has {found} payload bytes (expected {expected})")]
    InvalidWidth {
        kind: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("text field is not valid utf-8")]
    InvalidUtf8,

    #[error("key ends inside an unterminated field")]
    Unterminated,
}

impl From<OrderedFieldDecodeError> for InternalError {
    fn from(err: OrderedFieldDecodeError) -> Self {
        Self::index_corruption(format!("index key field is malformed: {err}"))
    }
}

///
/// KeyEdge
///
/// Open-ended range-scan boundary written in place of a real field.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum KeyEdge {
    Before,
    After,
}

impl KeyEdge {
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Before => EDGE_BEFORE,
            Self::After => EDGE_AFTER,
        }
    }
}

impl TryFrom<u8> for KeyEdge {
    type Error = InternalError;

    fn try_from(marker: u8) -> Result<Self, Self::Error> {
        match marker {
            EDGE_BEFORE => Ok(Self::Before),
            EDGE_AFTER => Ok(Self::After),
            other => Err(InternalError::index_unsupported(format!(
                "unsupported key edge marker 0x{other:02x}"
            ))),
        }
    }
}

///
/// DecodedField
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DecodedField {
    Value(Value),
    Edge(KeyEdge),
}

/// Append one value as a terminated field, applying `collation` to text.
pub fn encode_value_field(out: &mut Vec<u8>, value: &Value, collation: Collation) {
    out.push(value.tag().to_u8());

    match value {
        Value::Null => {}
        Value::Bool(v) => parts::push_escaped(out, &[u8::from(*v)]),
        Value::Int(v) => parts::push_escaped(out, &semantics::ordered_i64_bytes(*v)),
        Value::Uint(v) => parts::push_escaped(out, &v.to_be_bytes()),
        Value::Text(v) => match collation {
            Collation::Binary => parts::push_escaped(out, v.as_bytes()),
            Collation::CaseInsensitive => parts::push_escaped(out, v.to_lowercase().as_bytes()),
        },
        Value::Blob(v) => parts::push_escaped(out, v),
    }

    out.push(FIELD_TERMINATOR);
}

/// Append a range-edge marker as a terminated field.
pub fn encode_edge_field(out: &mut Vec<u8>, edge: KeyEdge) {
    out.push(edge.to_u8());
    out.push(FIELD_TERMINATOR);
}

/// Decode one field (terminator excluded).
pub fn decode_field(field: &[u8]) -> Result<DecodedField, OrderedFieldDecodeError> {
    let (&tag, payload) = field
        .split_first()
        .ok_or(OrderedFieldDecodeError::EmptyField)?;

    if tag == EDGE_BEFORE || tag == EDGE_AFTER {
        if !payload.is_empty() {
            return Err(OrderedFieldDecodeError::InvalidWidth {
                kind: "edge",
                expected: 0,
                found: payload.len(),
            });
        }
        let edge = if tag == EDGE_BEFORE {
            KeyEdge::Before
        } else {
            KeyEdge::After
        };
        return Ok(DecodedField::Edge(edge));
    }

    let tag = ValueTag::from_u8(tag).ok_or(OrderedFieldDecodeError::UnknownTag { tag })?;
    let raw = parts::unescape(payload)?;

    let value = match tag {
        ValueTag::Null => {
            semantics::expect_width("null", &raw, 0)?;
            Value::Null
        }
        ValueTag::Bool => {
            semantics::expect_width("bool", &raw, 1)?;
            Value::Bool(raw[0] != 0)
        }
        ValueTag::Int => Value::Int(semantics::i64_from_ordered(&raw)?),
        ValueTag::Uint => Value::Uint(semantics::u64_from_be(&raw)?),
        ValueTag::Text => {
            Value::Text(String::from_utf8(raw).map_err(|_| OrderedFieldDecodeError::InvalidUtf8)?)
        }
        ValueTag::Blob => Value::Blob(raw),
    };

    Ok(DecodedField::Value(value))
}

/// Decode one field that must hold a value rather than an edge marker.
pub fn decode_value_field(field: &[u8]) -> Result<Value, InternalError> {
    match decode_field(field)? {
        DecodedField::Value(value) => Ok(value),
        DecodedField::Edge(edge) => Err(InternalError::index_invariant(format!(
            "expected a value field, found range edge {edge:?}"
        ))),
    }
}

/// Iterate the fields of an encoded key, terminators excluded.
#[must_use]
pub const fn fields(bytes: &[u8]) -> Fields<'_> {
    Fields { bytes, offset: 0 }
}

/// Number of complete fields in an encoded key.
#[must_use]
pub fn field_count(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&byte| byte == FIELD_TERMINATOR).count()
}

/// Byte range of field `position`, terminator included.
#[must_use]
pub fn field_bounds(bytes: &[u8], position: usize) -> Option<Range<usize>> {
    let mut start = 0;
    let mut current = 0;

    for (offset, &byte) in bytes.iter().enumerate() {
        if byte == FIELD_TERMINATOR {
            if current == position {
                return Some(start..offset + 1);
            }
            current += 1;
            start = offset + 1;
        }
    }

    None
}

///
/// Fields
/// Borrowing iterator over terminated fields of one key.
///

pub struct Fields<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for Fields<'a> {
    type Item = Result<&'a [u8], OrderedFieldDecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.bytes.get(self.offset..).filter(|rest| !rest.is_empty())?;

        match rest.iter().position(|&byte| byte == FIELD_TERMINATOR) {
            Some(end) => {
                self.offset += end + 1;
                Some(Ok(&rest[..end]))
            }
            None => {
                self.offset = self.bytes.len();
                Some(Err(OrderedFieldDecodeError::Unterminated))
            }
        }
    }
}
