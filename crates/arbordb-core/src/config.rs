//! Engine-level tuning knobs.
//!
//! Every field has a default so an empty configuration document is valid.
//! Loading from files lives in `arbordb-config`; this module only owns the
//! shapes and their validation.

use crate::error::InternalError;
use serde::{Deserialize, Serialize};

/// Upper bound for any preallocated index-row buffer.
pub const MAX_BUFFER_CAPACITY: usize = 1 << 20;

///
/// EngineConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub index_row: IndexRowOptions,
    pub planner: EnumeratorOptions,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), InternalError> {
        self.index_row.validate()
    }
}

///
/// IndexRowOptions
/// Initial capacities of the reusable key and value buffers of one cursor row.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexRowOptions {
    pub key_capacity: usize,
    pub value_capacity: usize,
}

impl IndexRowOptions {
    pub const DEFAULT_KEY_CAPACITY: usize = 64;
    pub const DEFAULT_VALUE_CAPACITY: usize = 32;

    pub fn validate(&self) -> Result<(), InternalError> {
        for (name, capacity) in [
            ("index_row.key_capacity", self.key_capacity),
            ("index_row.value_capacity", self.value_capacity),
        ] {
            if capacity > MAX_BUFFER_CAPACITY {
                return Err(InternalError::config_unsupported(format!(
                    "{name} = {capacity} exceeds the maximum of {MAX_BUFFER_CAPACITY}"
                )));
            }
        }

        Ok(())
    }
}

impl Default for IndexRowOptions {
    fn default() -> Self {
        Self {
            key_capacity: Self::DEFAULT_KEY_CAPACITY,
            value_capacity: Self::DEFAULT_VALUE_CAPACITY,
        }
    }
}

///
/// EnumeratorOptions
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnumeratorOptions {
    /// When false, multi-index enumeration yields no intersections.
    pub enabled: bool,
}

impl Default for EnumeratorOptions {
    fn default() -> Self {
        Self { enabled: true }
    }
}

///
/// TESTS
///
