//! Storage-side runtime: hierarchical keys, physical index rows, and the
//! query planning that chooses which indexes to scan.

pub mod hkey;
pub mod index;
pub mod query;
