//! TOML loading for [`EngineConfig`].
//!
//! Missing tables and keys fall back to their defaults; unknown keys are
//! rejected. A document that parses is validated before it is returned.

use arbordb_core::{config::EngineConfig, error::InternalError};
use std::path::{Path, PathBuf};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] InternalError),
}

/// Parse and validate a TOML configuration document.
pub fn parse_config(source: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = toml::from_str(source)?;
    config.validate()?;

    Ok(config)
}

/// Read, parse and validate the configuration file at `path`.
pub fn load_config(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config = parse_config(&source)?;
    tracing::debug!(path = %path.display(), ?config, "loaded engine config");

    Ok(config)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use arbordb_core::{
        config::{EnumeratorOptions, IndexRowOptions, MAX_BUFFER_CAPACITY},
        error::{ErrorClass, ErrorOrigin},
    };

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(parse_config("").expect("empty config"), EngineConfig::default());
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let config = parse_config(
            r"
            [index_row]
            key_capacity = 256

            [planner]
            enabled = false
            ",
        )
        .expect("config");

        assert_eq!(
            config.index_row,
            IndexRowOptions {
                key_capacity: 256,
                value_capacity: IndexRowOptions::DEFAULT_VALUE_CAPACITY,
            }
        );
        assert_eq!(config.planner, EnumeratorOptions { enabled: false });
    }

    #[test]
    fn unknown_keys_fail_to_parse() {
        let err = parse_config("[index_row]\nkey_capacty = 8\n").expect_err("typo");
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = parse_config("[cache]\nsize = 8\n").expect_err("unknown table");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn oversized_buffers_fail_validation() {
        let source = format!("[index_row]\nvalue_capacity = {}\n", MAX_BUFFER_CAPACITY + 1);
        let err = parse_config(&source).expect_err("over the cap");

        let ConfigError::Invalid(inner) = err else {
            panic!("expected a validation error, got {err:?}");
        };
        assert_eq!(inner.class, ErrorClass::Unsupported);
        assert_eq!(inner.origin, ErrorOrigin::Config);
        assert!(inner.message.contains("index_row.value_capacity"));
    }

    #[test]
    fn load_reads_from_disk_and_reports_missing_files() {
        let dir = std::env::temp_dir().join(format!("arbordb-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("engine.toml");
        std::fs::write(&path, "[planner]\nenabled = false\n").expect("write config");

        let config = load_config(&path).expect("load");
        assert!(!config.planner.enabled);

        let err = load_config(dir.join("missing.toml")).expect_err("no such file");
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("missing.toml"));

        std::fs::remove_dir_all(&dir).expect("cleanup");
    }
}
