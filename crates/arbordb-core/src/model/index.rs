use crate::{
    error::InternalError,
    model::{ColumnId, IndexId, Ordinal, TableId},
};
use std::fmt::{self, Display};

///
/// IndexToHKeyEntry
///
/// One step of an index-to-HKey mapping: either the ordinal that opens the
/// next HKey segment, or the index-row position carrying the next value.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IndexToHKeyEntry {
    Ordinal(Ordinal),
    IndexRowPosition(usize),
}

///
/// IndexToHKey
///
/// Ordered mapping from index-row fields to the HKey of one table.
/// Positions are declared positions (spatial columns not yet collapsed).
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IndexToHKey {
    entries: Vec<IndexToHKeyEntry>,
}

impl IndexToHKey {
    pub(crate) const fn new(entries: Vec<IndexToHKeyEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[IndexToHKeyEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn is_ordinal(&self, i: usize) -> bool {
        matches!(self.entries.get(i), Some(IndexToHKeyEntry::Ordinal(_)))
    }
}

///
/// SpatialLayout
///
/// `dimensions` declared columns starting at `first_argument` are stored
/// as a single z-value field in the physical index row.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SpatialLayout {
    pub first_argument: usize,
    pub dimensions: usize,
}

impl SpatialLayout {
    /// Translate a declared column position into its physical row field.
    #[must_use]
    pub const fn physical_position(&self, declared: usize) -> usize {
        if declared > self.first_argument {
            declared - (self.dimensions - 1)
        } else {
            declared
        }
    }

    /// Translate a physical row field back to the first declared column it stores.
    #[must_use]
    pub const fn declared_position(&self, physical: usize) -> usize {
        if physical > self.first_argument {
            physical + (self.dimensions - 1)
        } else {
            physical
        }
    }
}

///
/// TableIndex
/// Index over the columns of one table.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableIndex {
    pub(crate) table: TableId,
    pub(crate) index_to_hkey: IndexToHKey,
}

impl TableIndex {
    #[must_use]
    pub const fn table(&self) -> TableId {
        self.table
    }

    /// Mapping onto the full HKey of the indexed table.
    #[must_use]
    pub const fn index_to_hkey(&self) -> &IndexToHKey {
        &self.index_to_hkey
    }
}

///
/// GroupIndex
///
/// Index spanning several tables of one hierarchy branch.
/// Carries one precomputed mapping per depth, root (depth 0) first.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GroupIndex {
    pub(crate) root_most: TableId,
    pub(crate) leaf_most: TableId,
    pub(crate) index_to_hkey_by_depth: Vec<IndexToHKey>,
}

impl GroupIndex {
    #[must_use]
    pub const fn root_most_table(&self) -> TableId {
        self.root_most
    }

    #[must_use]
    pub const fn leaf_most_table(&self) -> TableId {
        self.leaf_most
    }

    pub fn index_to_hkey(&self, depth: usize) -> Result<&IndexToHKey, InternalError> {
        self.index_to_hkey_by_depth.get(depth).ok_or_else(|| {
            InternalError::index_invariant(format!(
                "group index has no hkey mapping for depth {depth} (max {})",
                self.index_to_hkey_by_depth.len().saturating_sub(1)
            ))
        })
    }
}

///
/// IndexKind
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IndexKind {
    Table(TableIndex),
    Group(GroupIndex),
}

///
/// IndexModel
///
/// Resolved runtime index descriptor.
///
/// `all_columns` holds the declared key columns followed by whatever
/// hierarchy columns the index row must carry so the HKey of its leaf-most
/// table can be rebuilt from the row alone.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexModel {
    pub(crate) id: IndexId,
    pub(crate) name: String,
    pub(crate) key_columns: Vec<ColumnId>,
    pub(crate) all_columns: Vec<ColumnId>,
    pub(crate) kind: IndexKind,
    pub(crate) spatial: Option<SpatialLayout>,
}

impl IndexModel {
    #[must_use]
    pub const fn id(&self) -> IndexId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared key columns, in key order.
    #[must_use]
    pub fn key_columns(&self) -> &[ColumnId] {
        &self.key_columns
    }

    #[must_use]
    pub fn all_columns(&self) -> &[ColumnId] {
        &self.all_columns
    }

    #[must_use]
    pub const fn kind(&self) -> &IndexKind {
        &self.kind
    }

    #[must_use]
    pub const fn is_group_index(&self) -> bool {
        matches!(self.kind, IndexKind::Group(_))
    }

    #[must_use]
    pub const fn is_table_index(&self) -> bool {
        matches!(self.kind, IndexKind::Table(_))
    }

    #[must_use]
    pub const fn spatial(&self) -> Option<SpatialLayout> {
        self.spatial
    }

    #[must_use]
    pub const fn leaf_most_table(&self) -> TableId {
        match &self.kind {
            IndexKind::Table(index) => index.table,
            IndexKind::Group(index) => index.leaf_most,
        }
    }

    /// Mapping onto the HKey of the table at `depth`.
    ///
    /// Table indexes always map onto the full leaf HKey; callers truncate.
    pub fn index_to_hkey(&self, depth: usize) -> Result<&IndexToHKey, InternalError> {
        match &self.kind {
            IndexKind::Table(index) => Ok(&index.index_to_hkey),
            IndexKind::Group(index) => index.index_to_hkey(depth),
        }
    }

    /// Number of physical fields in one index row.
    #[must_use]
    pub fn physical_field_count(&self) -> usize {
        match self.spatial {
            Some(spatial) => self.all_columns.len() - (spatial.dimensions - 1),
            None => self.all_columns.len(),
        }
    }
}

impl Display for IndexModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns = self
            .key_columns
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        match self.kind {
            IndexKind::Table(_) => write!(f, "{}({columns})", self.name),
            IndexKind::Group(_) => write!(f, "GROUP {}({columns})", self.name),
        }
    }
}

///
/// IndexDef
///
/// Catalog-side index description consumed by `SchemaBuilder`.
///

#[derive(Clone, Debug)]
pub struct IndexDef {
    pub(crate) name: String,
    pub(crate) leaf: TableId,
    pub(crate) group: bool,
    pub(crate) columns: Vec<(TableId, String)>,
    pub(crate) spatial: Option<SpatialLayout>,
}

impl IndexDef {
    /// Index over columns of `table` only.
    #[must_use]
    pub fn table(name: impl Into<String>, table: TableId) -> Self {
        Self {
            name: name.into(),
            leaf: table,
            group: false,
            columns: Vec::new(),
            spatial: None,
        }
    }

    /// Index over columns of `leaf_most` and any of its ancestors.
    #[must_use]
    pub fn group(name: impl Into<String>, leaf_most: TableId) -> Self {
        Self {
            name: name.into(),
            leaf: leaf_most,
            group: true,
            columns: Vec::new(),
            spatial: None,
        }
    }

    /// Append a key column of the index's own table.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push((self.leaf, name.into()));
        self
    }

    /// Append a key column of an explicit table (group indexes).
    #[must_use]
    pub fn column_of(mut self, table: TableId, name: impl Into<String>) -> Self {
        self.columns.push((table, name.into()));
        self
    }

    #[must_use]
    pub const fn spatial(mut self, first_argument: usize, dimensions: usize) -> Self {
        self.spatial = Some(SpatialLayout {
            first_argument,
            dimensions,
        });
        self
    }
}
