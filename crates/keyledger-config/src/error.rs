//! Config loading errors.

use std::io;

use thiserror::Error;

/// Why configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file exists but could not be read.
    #[error("cannot read {path}: {source}")]
    ReadError {
        /// File that failed.
        path: String,
        /// I/O cause.
        #[source]
        source: io::Error,
    },

    /// A config file, or the merged layers, is not valid TOML for [`crate::Config`].
    #[error("cannot parse {path}: {source}")]
    ParseError {
        /// File that failed, or `<merged config>`.
        path: String,
        /// TOML cause.
        #[source]
        source: toml::de::Error,
    },

    /// A value parsed but is out of range.
    #[error("{field}: {message}")]
    ValidationError {
        /// Dotted field path.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// `$HOME` could not be determined and no home was given.
    #[error("no home directory; pass --home or set KEYLEDGER_HOME")]
    NoHomeDir,
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
