//! Query-side planning over the table hierarchy.

pub mod plan;
