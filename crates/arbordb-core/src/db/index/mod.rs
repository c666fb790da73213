//! Physical index entries: ordered field framing (`key`) and the reusable
//! cursor row that reads, writes, compares, and maps them back onto HKeys.

pub mod key;
mod row;

// re-exports
pub use key::{DecodedField, KeyEdge};
pub use row::IndexRow;
