//! Core runtime for ArborDB: hierarchical row keys, the index-row codec that
//! scans and compares physical index entries, and the multi-index
//! intersection planner that runs over a table hierarchy.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod obs;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// CONSTANTS
///

/// Maximum depth of a table hierarchy, root included.
///
/// Group-index table bitmaps carry one bit per group table, so a branch can
/// never be deeper than the bitmap is wide.
pub const MAX_HIERARCHY_DEPTH: usize = 64;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, cursors, enumerators, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        model::{ColumnId, IndexId, IndexModel, Ordinal, Schema, TableId, TableModel},
        value::Value,
    };
}
