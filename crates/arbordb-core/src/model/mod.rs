//! Runtime schema metadata for the table hierarchy.
//!
//! Types in `model` are read-only once a [`Schema`] is built. The catalog
//! collaborator describes tables and indexes through [`SchemaBuilder`]; every
//! derived shape the codec and planner rely on (ancestor chains, HKey column
//! lists, index-to-HKey mappings) is resolved once at build time.
//!
//! In general:
//! - the catalog defines *what exists*
//! - `model` defines *what runs*

mod index;
mod schema;
mod table;


use derive_more::Display;

// re-exports
pub use index::{
    GroupIndex, IndexDef, IndexKind, IndexModel, IndexToHKey, IndexToHKeyEntry, SpatialLayout,
    TableIndex,
};
pub use schema::{Schema, SchemaBuilder};
pub use table::{Collation, ColumnModel, HKeySegment, HKeyShape, TableDef, TableModel};

///
/// TableId
/// Dense handle of one table inside its [`Schema`].
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("table#{_0}")]
pub struct TableId(pub(crate) u32);

impl TableId {
    pub(crate) fn position(self) -> usize {
        self.0 as usize
    }
}

///
/// ColumnId
/// One declared column of one table, addressed by declaration position.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("{table}.{position}")]
pub struct ColumnId {
    pub table: TableId,
    pub position: u16,
}

impl ColumnId {
    #[must_use]
    pub const fn new(table: TableId, position: u16) -> Self {
        Self { table, position }
    }
}

///
/// IndexId
/// Dense handle of one index inside its [`Schema`].
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("index#{_0}")]
pub struct IndexId(pub(crate) u32);

impl IndexId {
    pub(crate) fn position(self) -> usize {
        self.0 as usize
    }
}

///
/// Ordinal
/// Small integer tag naming which table an HKey segment belongs to.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Ordinal(pub u32);
