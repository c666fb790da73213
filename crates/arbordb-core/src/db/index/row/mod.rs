//! Module: index::row
//! Responsibility: the reusable cursor row over one physical index entry.
//! Does not own: field framing (see `index::key`) or store I/O.
//!
//! Invariants:
//! - A row is reset and refilled in place for every entry a cursor visits;
//!   nothing borrowed from it survives the next reset.
//! - The cached leaf HKey is dropped by every entry point that mutates the
//!   key or value buffers.
//! - HKey ordinals come from table metadata, never from row bytes.

mod sort_key;


use crate::{
    config::IndexRowOptions,
    db::{
        hkey::{HKey, KeyCreator},
        index::key::{FIELD_TERMINATOR, KeyEdge, decode_value_field, field_bounds},
    },
    error::InternalError,
    model::{IndexId, IndexModel, IndexToHKeyEntry, Schema, TableId, TableModel},
    obs::sink::{self, MetricsEvent},
    value::Value,
};
use sort_key::SortKeyTarget;
use std::cmp::Ordering;

///
/// IndexRow
///
/// One index entry as seen by a scan cursor: key bytes, an optional value
/// payload carrying covering columns, the owning index, and a cached HKey of
/// the index's leaf-most table.
///

#[derive(Debug)]
pub struct IndexRow<'s> {
    schema: &'s Schema,
    index: Option<&'s IndexModel>,
    key: Vec<u8>,
    value: Vec<u8>,
    value_present: bool,
    table_bitmap: u64,
    sort_key_target: Option<SortKeyTarget>,
    key_fields: usize,
    z_position: Option<usize>,
    leaf_table_hkey: Option<HKey>,
    field_ends: Vec<usize>,
}

impl<'s> IndexRow<'s> {
    /// Unattached row; call `reset_for_read` or `reset_for_write` before use.
    #[must_use]
    pub fn new(schema: &'s Schema) -> Self {
        Self::with_options(schema, IndexRowOptions::default())
    }

    #[must_use]
    pub fn with_options(schema: &'s Schema, options: IndexRowOptions) -> Self {
        Self {
            schema,
            index: None,
            key: Vec::with_capacity(options.key_capacity),
            value: Vec::with_capacity(options.value_capacity),
            value_present: false,
            table_bitmap: 0,
            sort_key_target: None,
            key_fields: 0,
            z_position: None,
            leaf_table_hkey: None,
            field_ends: Vec::new(),
        }
    }

    /// Row attached to `index` with an empty key, ready for `append`.
    pub fn for_index(schema: &'s Schema, index: IndexId) -> Result<Self, InternalError> {
        let mut row = Self::new(schema);
        let key = std::mem::take(&mut row.key);
        row.reset_for_write(index, key)?;

        Ok(row)
    }

    ///
    /// ATTACHMENT
    ///

    /// Attach to bytes freshly read from the store.
    pub fn reset_for_read(
        &mut self,
        index: IndexId,
        key: &[u8],
        value: Option<&[u8]>,
    ) -> Result<(), InternalError> {
        let model = self.schema.index(index)?;
        self.attach(model);
        self.sort_key_target = None;

        self.key.clear();
        self.key.extend_from_slice(key);
        self.load_value(value);
        sink::record(MetricsEvent::IndexRowRead);

        Ok(())
    }

    /// Attach to `key`, a buffer about to be filled through `append`.
    pub fn reset_for_write(&mut self, index: IndexId, key: Vec<u8>) -> Result<(), InternalError> {
        let model = self.schema.index(index)?;
        self.attach(model);

        self.key = key;
        self.load_value(None);

        let target = match self.sort_key_target.take() {
            Some(target) if target.index() == index => target,
            _ => SortKeyTarget::for_index(self.schema, model)?,
        };
        let target = self.sort_key_target.insert(target);
        target.attach();
        sink::record(MetricsEvent::IndexRowWrite);

        Ok(())
    }

    /// Bulk-load raw entry bytes and rebuild the cached leaf HKey.
    ///
    /// A non-empty value payload starts with the big-endian table bitmap.
    pub fn copy_from(&mut self, key: &[u8], value: Option<&[u8]>) -> Result<(), InternalError> {
        let index = self.attached_index()?;

        self.key.clear();
        self.key.extend_from_slice(key);
        self.load_value(value);
        if let Some(bytes) = value.filter(|bytes| !bytes.is_empty()) {
            self.table_bitmap = decode_table_bitmap(bytes)?;
        }

        let leaf = self.ancestor_hkey(index.leaf_most_table())?;
        self.leaf_table_hkey = Some(leaf);

        Ok(())
    }

    /// Clear both buffers, keeping the attached index.
    pub fn reset(&mut self) {
        self.key.clear();
        self.value.clear();
        self.leaf_table_hkey = None;
        if let Some(target) = &mut self.sort_key_target {
            target.attach();
        }
    }

    /// Hand the built key buffer to the caller, leaving the row empty.
    pub fn take_key(&mut self) -> Vec<u8> {
        self.leaf_table_hkey = None;
        std::mem::take(&mut self.key)
    }

    ///
    /// WRITING
    ///

    /// Serialize `value` as the next field, using the collation of its column.
    pub fn append(&mut self, value: &Value) -> Result<(), InternalError> {
        let target = self.sort_key_target.as_mut().ok_or_else(|| {
            InternalError::index_invariant("index row is not attached for writing")
        })?;
        target.append(&mut self.key, value)?;
        self.leaf_table_hkey = None;

        Ok(())
    }

    /// Append a range-edge marker in place of a field.
    ///
    /// Like `append`, only a row attached for writing accepts edges.
    pub fn append_edge(&mut self, edge: KeyEdge) -> Result<(), InternalError> {
        let target = self.sort_key_target.as_mut().ok_or_else(|| {
            InternalError::index_invariant("index row is not attached for writing")
        })?;
        target.append_edge(&mut self.key, edge);
        self.leaf_table_hkey = None;

        Ok(())
    }

    ///
    /// HKEYS
    ///

    /// The cached leaf-table HKey.
    pub fn hkey(&self) -> Result<&HKey, InternalError> {
        self.leaf_table_hkey.as_ref().ok_or_else(|| {
            InternalError::hkey_invariant("leaf hkey requested before it was derived")
        })
    }

    /// Rebuild the HKey of `table` from this row's bytes alone.
    ///
    /// `table` must be the index's leaf-most table or one of its ancestors.
    /// An empty key yields the unfilled skeleton.
    pub fn ancestor_hkey(&mut self, table: TableId) -> Result<HKey, InternalError> {
        let index = self.attached_index()?;
        let leaf = index.leaf_most_table();
        if !self.schema.is_ancestor_or_self(table, leaf) {
            return Err(InternalError::index_invariant(format!(
                "{table} is not on the branch of index '{}'",
                index.name()
            )));
        }
        let table_model = self.schema.table(table)?;
        sink::record(MetricsEvent::AncestorHKey);

        if !self.key_empty()
            && let Some(cached) = &self.leaf_table_hkey
        {
            return self.narrow_leaf_hkey(cached, table_model, leaf);
        }

        let (mut hkey, mapping) = if index.is_group_index() {
            (
                self.schema.new_hkey(table)?,
                index.index_to_hkey(table_model.depth())?,
            )
        } else {
            (self.schema.new_hkey(leaf)?, index.index_to_hkey(0)?)
        };

        if self.key_empty() {
            if index.is_table_index() || table == leaf {
                self.leaf_table_hkey = Some(hkey.clone());
            }
            return Ok(hkey);
        }

        fill_field_ends(&self.key, &mut self.field_ends);
        let spatial = index.spatial();
        let mut segment = 0;
        let mut slot = 0;
        for entry in mapping.entries() {
            match *entry {
                IndexToHKeyEntry::Ordinal(ordinal) => {
                    let expected = hkey.ordinal(segment);
                    if expected != Some(ordinal) {
                        return Err(InternalError::hkey_invariant(format!(
                            "index '{}' maps ordinal {ordinal} onto hkey segment {segment} \
                             whose metadata ordinal is {expected:?}",
                            index.name()
                        )));
                    }
                    segment += 1;
                }
                IndexToHKeyEntry::IndexRowPosition(declared) => {
                    let position = spatial.map_or(declared, |s| s.physical_position(declared));
                    hkey.copy_value_to(self.field_value(position)?, slot)?;
                    slot += 1;
                }
            }
        }
        tracing::trace!(index = index.name(), %table, %hkey, "derived hkey from index row");

        if index.is_table_index() && table != leaf {
            let ancestor = self.narrow_leaf_hkey(&hkey, table_model, leaf)?;
            self.leaf_table_hkey = Some(hkey);
            return Ok(ancestor);
        }
        if table == leaf {
            self.leaf_table_hkey = Some(hkey.clone());
        }

        Ok(hkey)
    }

    ///
    /// COMPARISON
    ///

    /// Compare the first `field_count` fields of two rows of the same index.
    ///
    /// `ascending[f]` false reverses field `f`; a missing flag reads as
    /// ascending. Key bytes decide first; equal keys fall through to the
    /// value payloads, where a row without one sorts first.
    #[must_use]
    pub fn compare_to(
        &self,
        other: &Self,
        field_count: usize,
        ascending: Option<&[bool]>,
    ) -> Ordering {
        if field_count == 0 {
            return Ordering::Equal;
        }

        let mut field = 0;
        if let Some(ordering) = compare_fields(
            &self.key,
            &other.key,
            &mut field,
            self.key_fields,
            field_count,
            ascending,
        ) {
            return ordering;
        }

        match (self.value_bytes(), other.value_bytes()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => directed(ascending, field, Ordering::Less),
            (Some(_), None) => directed(ascending, field, Ordering::Greater),
            (Some(this), Some(that)) => compare_fields(
                this,
                that,
                &mut field,
                usize::MAX,
                field_count,
                ascending,
            )
            .unwrap_or(Ordering::Equal),
        }
    }

    /// Ascending comparison against a scan bound.
    #[must_use]
    pub fn compare_to_bound(&self, other: &Self, field_count: usize) -> Ordering {
        self.compare_to(other, field_count, None)
    }

    ///
    /// ACCESSORS
    ///

    #[must_use]
    pub const fn index(&self) -> Option<&'s IndexModel> {
        self.index
    }

    #[must_use]
    pub const fn key_empty(&self) -> bool {
        self.key.is_empty()
    }

    #[must_use]
    pub fn key_bytes(&self) -> &[u8] {
        &self.key
    }

    #[must_use]
    pub fn value_bytes(&self) -> Option<&[u8]> {
        self.value_present.then_some(self.value.as_slice())
    }

    /// Number of terminated fields currently in the key.
    #[must_use]
    pub fn field_count(&self) -> usize {
        crate::db::index::key::field_count(&self.key)
    }

    /// Decode the key field at physical position `i`.
    pub fn value(&self, i: usize) -> Result<Value, InternalError> {
        let bounds = field_bounds(&self.key, i).ok_or_else(|| {
            InternalError::index_invariant(format!(
                "index row has {} fields, field {i} requested",
                self.field_count()
            ))
        })?;

        decode_value_field(&self.key[bounds.start..bounds.end - 1])
    }

    /// Replace `out` with this row's key bytes.
    pub fn copy_key_to(&self, out: &mut Vec<u8>) {
        out.clear();
        out.extend_from_slice(&self.key);
    }

    /// Append the raw bytes of field `position`, terminator included.
    pub fn append_field_to(&self, position: usize, out: &mut Vec<u8>) -> Result<(), InternalError> {
        let bounds = field_bounds(&self.key, position).ok_or_else(|| {
            InternalError::index_invariant(format!(
                "index row has {} fields, field {position} requested",
                self.field_count()
            ))
        })?;
        out.extend_from_slice(&self.key[bounds]);

        Ok(())
    }

    #[must_use]
    pub const fn table_bitmap(&self) -> u64 {
        self.table_bitmap
    }

    pub const fn set_table_bitmap(&mut self, bitmap: u64) {
        self.table_bitmap = bitmap;
    }

    /// Physical position of the spatial z-value field.
    #[must_use]
    pub const fn z_position(&self) -> Option<usize> {
        self.z_position
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn attach(&mut self, index: &'s IndexModel) {
        self.index = Some(index);
        self.key_fields = index.all_columns().len();
        self.z_position = index.spatial().map(|spatial| spatial.first_argument);
        self.leaf_table_hkey = None;
    }

    fn attached_index(&self) -> Result<&'s IndexModel, InternalError> {
        self.index
            .ok_or_else(|| InternalError::index_invariant("index row is not attached to an index"))
    }

    fn load_value(&mut self, value: Option<&[u8]>) {
        self.value.clear();
        self.value_present = value.is_some();
        if let Some(bytes) = value {
            self.value.extend_from_slice(bytes);
        }
        self.leaf_table_hkey = None;
    }

    // Reads `field_ends`, which the caller must have filled for the current key.
    fn field_value(&self, position: usize) -> Result<Value, InternalError> {
        let end = *self.field_ends.get(position).ok_or_else(|| {
            InternalError::index_corruption(format!(
                "index row has {} fields, hkey mapping reads field {position}",
                self.field_ends.len()
            ))
        })?;
        let start = match position {
            0 => 0,
            _ => self.field_ends[position - 1] + 1,
        };

        decode_value_field(&self.key[start..end])
    }

    fn narrow_leaf_hkey(
        &self,
        leaf_hkey: &HKey,
        table: &TableModel,
        leaf: TableId,
    ) -> Result<HKey, InternalError> {
        if table.id() == leaf {
            return Ok(leaf_hkey.clone());
        }

        let mut ancestor = self.schema.new_hkey(table.id())?;
        leaf_hkey.copy_to(&mut ancestor)?;
        ancestor.use_segments(table.depth() + 1)?;

        Ok(ancestor)
    }
}

fn fill_field_ends(key: &[u8], ends: &mut Vec<usize>) {
    ends.clear();
    ends.extend(
        key.iter()
            .enumerate()
            .filter(|&(_, &byte)| byte == FIELD_TERMINATOR)
            .map(|(offset, _)| offset),
    );
}

// Byte-wise scan that counts fields at each terminator. `None` means both
// slices were consumed without deciding anything.
fn compare_fields(
    this: &[u8],
    that: &[u8],
    field: &mut usize,
    field_limit: usize,
    field_count: usize,
    ascending: Option<&[bool]>,
) -> Option<Ordering> {
    let end = this.len().min(that.len());
    let mut b = 0;

    while b < end && *field < field_limit {
        let (x, y) = (this[b], that[b]);
        if x != y {
            return Some(directed(ascending, *field, x.cmp(&y)));
        }
        b += 1;
        if x == FIELD_TERMINATOR {
            *field += 1;
            if *field == field_count {
                return Some(Ordering::Equal);
            }
        }
    }

    match this.len().cmp(&that.len()) {
        Ordering::Equal => None,
        ordering => Some(directed(ascending, *field, ordering)),
    }
}

fn directed(ascending: Option<&[bool]>, field: usize, ordering: Ordering) -> Ordering {
    match ascending.and_then(|flags| flags.get(field)) {
        Some(false) => ordering.reverse(),
        _ => ordering,
    }
}

fn decode_table_bitmap(bytes: &[u8]) -> Result<u64, InternalError> {
    let raw: [u8; 8] = bytes
        .get(..8)
        .and_then(|head| head.try_into().ok())
        .ok_or_else(|| {
            InternalError::index_corruption(format!(
                "index value payload of {} bytes cannot hold a table bitmap",
                bytes.len()
            ))
        })?;

    Ok(u64::from_be_bytes(raw))
}
