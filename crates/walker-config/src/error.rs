//! Configuration error types.

use std::path::PathBuf;

/// Errors raised while locating, loading or saving `config.ron`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The platform has no per-user config directory and none was given.
    #[error("no config directory available; pass --config")]
    NoConfigDir,

    /// The config file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config directory or file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid RON for [`Config`](crate::Config).
    #[error("failed to parse {}: {source}", path.display())]
    ParseError {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    /// RON serialization failed.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] ron::Error),
}
