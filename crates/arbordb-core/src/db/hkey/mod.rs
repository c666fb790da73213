//! Module: hkey
//! Responsibility: hierarchical row keys and their ordered byte form.
//! Does not own: deriving HKeys from index rows (see `index::row`).
//!
//! Invariants:
//! - Ordinals always come from the table metadata the skeleton was built for;
//!   they are never read back from row bytes.
//! - Value slots are laid out segment by segment, each in primary-key order.


use crate::{
    db::index::key::encode_value_field,
    error::InternalError,
    model::{Collation, HKeySegment, HKeyShape, Ordinal, Schema, TableId},
    value::Value,
};
use std::fmt::{self, Display};

///
/// KeyCreator
///
/// Allocates HKey skeletons for tables. Implemented by the schema; cursors
/// hold one so ancestor derivation never touches the catalog collaborator.
///

pub trait KeyCreator {
    fn new_hkey(&self, table: TableId) -> Result<HKey, InternalError>;
}

impl KeyCreator for Schema {
    fn new_hkey(&self, table: TableId) -> Result<HKey, InternalError> {
        Ok(HKey::new(self.table(table)?.hkey_shape()))
    }
}

///
/// HKey
///
/// Row position in the table hierarchy: one segment per table on the path
/// from the root, each an ordinal followed by that table's key values.
///
/// A skeleton starts with every value slot unset. `use_segments` narrows the
/// visible key to an ancestor without reallocating.
///

#[derive(Clone, Debug)]
pub struct HKey {
    segments: Vec<HKeySegment>,
    values: Vec<Option<Value>>,
    segments_used: usize,
}

impl HKey {
    #[must_use]
    pub fn new(shape: &HKeyShape) -> Self {
        Self {
            segments: shape.segments().to_vec(),
            values: vec![None; shape.value_count()],
            segments_used: shape.segment_count(),
        }
    }

    /// Number of visible segments.
    #[must_use]
    pub const fn segment_count(&self) -> usize {
        self.segments_used
    }

    /// Ordinals of every visible segment, root first.
    pub fn ordinals(&self) -> impl Iterator<Item = Ordinal> + '_ {
        self.segments[..self.segments_used]
            .iter()
            .map(|segment| segment.ordinal)
    }

    #[must_use]
    pub fn ordinal(&self, segment: usize) -> Option<Ordinal> {
        self.segments[..self.segments_used]
            .get(segment)
            .map(|segment| segment.ordinal)
    }

    /// Value slots of every visible segment, flattened.
    #[must_use]
    pub fn values(&self) -> &[Option<Value>] {
        &self.values[..self.visible_value_count()]
    }

    /// Values of one visible segment.
    #[must_use]
    pub fn segment_values(&self, segment: usize) -> Option<&[Option<Value>]> {
        if segment >= self.segments_used {
            return None;
        }
        let start = self.segments[..segment]
            .iter()
            .map(|s| s.width)
            .sum::<usize>();

        Some(&self.values[start..start + self.segments[segment].width])
    }

    /// Store `value` into flat value slot `slot`.
    pub fn copy_value_to(&mut self, value: Value, slot: usize) -> Result<(), InternalError> {
        let capacity = self.values.len();
        let target = self.values.get_mut(slot).ok_or_else(|| {
            InternalError::hkey_invariant(format!(
                "hkey value slot {slot} out of range (capacity {capacity})"
            ))
        })?;
        *target = Some(value);

        Ok(())
    }

    /// Restrict the visible key to its first `segments` segments.
    pub fn use_segments(&mut self, segments: usize) -> Result<(), InternalError> {
        if segments > self.segments.len() {
            return Err(InternalError::hkey_invariant(format!(
                "cannot use {segments} segments of a {}-segment hkey",
                self.segments.len()
            )));
        }
        self.segments_used = segments;

        Ok(())
    }

    /// Copy the visible segments shared with `target` into it.
    ///
    /// Both keys must agree on every shared ordinal.
    pub fn copy_to(&self, target: &mut Self) -> Result<(), InternalError> {
        let shared = self.segments_used.min(target.segments.len());
        for (segment, (mine, theirs)) in self.segments[..shared]
            .iter()
            .zip(&target.segments[..shared])
            .enumerate()
        {
            if mine != theirs {
                return Err(InternalError::hkey_invariant(format!(
                    "hkey segment {segment} mismatch: {} (width {}) vs {} (width {})",
                    mine.ordinal, mine.width, theirs.ordinal, theirs.width
                )));
            }
        }

        let values = self.segments[..shared]
            .iter()
            .map(|s| s.width)
            .sum::<usize>();
        target.values[..values].clone_from_slice(&self.values[..values]);
        for slot in &mut target.values[values..] {
            *slot = None;
        }
        target.segments_used = shared;

        Ok(())
    }

    /// True once every visible value slot is set.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.values().iter().all(Option::is_some)
    }

    /// Append the ordered byte form: per segment an ordinal field, then one
    /// field per value. Unset slots encode as null.
    pub fn encode(&self, out: &mut Vec<u8>) {
        let mut slot = 0;
        for segment in &self.segments[..self.segments_used] {
            encode_value_field(
                out,
                &Value::Uint(u64::from(segment.ordinal.0)),
                Collation::Binary,
            );
            for value in &self.values[slot..slot + segment.width] {
                encode_value_field(out, value.as_ref().unwrap_or(&Value::Null), Collation::Binary);
            }
            slot += segment.width;
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }

    fn visible_value_count(&self) -> usize {
        self.segments[..self.segments_used]
            .iter()
            .map(|segment| segment.width)
            .sum()
    }
}

impl PartialEq for HKey {
    fn eq(&self, other: &Self) -> bool {
        self.segments[..self.segments_used] == other.segments[..other.segments_used]
            && self.values() == other.values()
    }
}

impl Eq for HKey {}

impl Display for HKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        let mut slot = 0;
        for (i, segment) in self.segments[..self.segments_used].iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", segment.ordinal)?;
            for value in &self.values[slot..slot + segment.width] {
                match value {
                    Some(value) => write!(f, ",{value}")?,
                    None => write!(f, ",?")?,
                }
            }
            slot += segment.width;
        }
        write!(f, "}}")
    }
}
