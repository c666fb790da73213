use crate::model::{ColumnId, Ordinal, TableId};
use serde::{Deserialize, Serialize};

///
/// Collation
///
/// Per-column text collation applied when a value is serialized into an
/// index key. Non-text values ignore it.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum Collation {
    #[default]
    Binary,
    CaseInsensitive,
}

///
/// ColumnModel
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnModel {
    pub name: String,
    pub collation: Collation,
}

///
/// HKeySegment
/// One (ordinal, value width) step of a table's hierarchy key.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HKeySegment {
    pub ordinal: Ordinal,
    pub width: usize,
}

///
/// HKeyShape
///
/// Segment layout of one table's HKey, root segment first.
/// Ancestor shapes are always a prefix of descendant shapes.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HKeyShape {
    segments: Vec<HKeySegment>,
}

impl HKeyShape {
    pub(crate) const fn new(segments: Vec<HKeySegment>) -> Self {
        Self { segments }
    }

    #[must_use]
    pub fn segments(&self) -> &[HKeySegment] {
        &self.segments
    }

    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Total number of value slots across all segments.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.segments.iter().map(|segment| segment.width).sum()
    }
}

///
/// TableDef
///
/// Catalog-side description of one table, consumed by `SchemaBuilder`.
/// Column references are by name and resolved during the build.
///

#[derive(Clone, Debug)]
pub struct TableDef {
    pub(crate) name: String,
    pub(crate) ordinal: Ordinal,
    pub(crate) columns: Vec<ColumnModel>,
    pub(crate) primary_key: Vec<String>,
    pub(crate) parent: Option<(TableId, Vec<String>)>,
}

impl TableDef {
    #[must_use]
    pub fn new(name: impl Into<String>, ordinal: u32) -> Self {
        Self {
            name: name.into(),
            ordinal: Ordinal(ordinal),
            columns: Vec::new(),
            primary_key: Vec::new(),
            parent: None,
        }
    }

    /// Declare a binary-collated column.
    #[must_use]
    pub fn column(self, name: impl Into<String>) -> Self {
        self.column_with(name, Collation::Binary)
    }

    #[must_use]
    pub fn column_with(mut self, name: impl Into<String>, collation: Collation) -> Self {
        self.columns.push(ColumnModel {
            name: name.into(),
            collation,
        });
        self
    }

    #[must_use]
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Attach this table under `parent`; `join` names this table's columns
    /// that carry the parent's primary key, positionally.
    #[must_use]
    pub fn child_of<I, S>(mut self, parent: TableId, join: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parent = Some((parent, join.into_iter().map(Into::into).collect()));
        self
    }
}

///
/// TableModel
///
/// Resolved runtime table node. Depth, ancestor chain, and HKey columns are
/// derived at schema build time and never change afterwards.
///

#[derive(Clone, Debug)]
pub struct TableModel {
    pub(crate) id: TableId,
    pub(crate) name: String,
    pub(crate) ordinal: Ordinal,
    pub(crate) depth: usize,
    pub(crate) parent: Option<TableId>,
    pub(crate) columns: Vec<ColumnModel>,
    pub(crate) primary_key: Vec<ColumnId>,
    pub(crate) parent_join: Vec<ColumnId>,
    pub(crate) ancestors: Vec<TableId>,
    pub(crate) hkey_columns: Vec<Vec<ColumnId>>,
    pub(crate) hkey_shape: HKeyShape,
}

impl TableModel {
    #[must_use]
    pub const fn id(&self) -> TableId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn ordinal(&self) -> Ordinal {
        self.ordinal
    }

    /// Distance from the hierarchy root; the root has depth 0.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub const fn parent(&self) -> Option<TableId> {
        self.parent
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnModel] {
        &self.columns
    }

    #[must_use]
    pub fn primary_key(&self) -> &[ColumnId] {
        &self.primary_key
    }

    /// This table's columns that reference the parent's primary key.
    #[must_use]
    pub fn parent_join(&self) -> &[ColumnId] {
        &self.parent_join
    }

    /// Ancestor chain from the root down to and including this table.
    #[must_use]
    pub fn ancestors(&self) -> &[TableId] {
        &self.ancestors
    }

    /// HKey value columns per segment, as carried by rows of this table.
    ///
    /// The own segment is the primary key, the parent segment is the join
    /// columns, and higher segments are inherited from the parent.
    #[must_use]
    pub fn hkey_columns(&self) -> &[Vec<ColumnId>] {
        &self.hkey_columns
    }

    /// HKey value columns flattened in segment order.
    pub fn hkey_column_list(&self) -> impl Iterator<Item = ColumnId> + '_ {
        self.hkey_columns.iter().flatten().copied()
    }

    #[must_use]
    pub const fn hkey_shape(&self) -> &HKeyShape {
        &self.hkey_shape
    }
}
