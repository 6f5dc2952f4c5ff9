//! Config file discovery and layered loading.
//!
//! Layers merge in order: embedded `defaults.toml`, then
//! `/etc/keyledger/config.toml`, then `<home>/config.toml`, then an
//! explicitly named file. `KEYLEDGER_*` variables fill whatever no file
//! set, and the result is deserialized and validated.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

const DEFAULTS_TOML: &str = include_str!("defaults.toml");

const SYSTEM_CONFIG: &str = "/etc/keyledger/config.toml";

/// Larger config files are refused unread.
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Name of the per-user directory under `$HOME`.
pub const HOME_DIR_NAME: &str = ".keyledger";

/// Which configuration layer a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in defaults.
    Defaults,
    /// `/etc/keyledger/config.toml`.
    System,
    /// `<home>/config.toml`.
    User,
    /// A file passed explicitly (e.g. `--config`).
    Explicit,
    /// Environment variable fallback.
    Environment,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Defaults => "defaults",
            Self::System => "system",
            Self::User => "user",
            Self::Explicit => "explicit file",
            Self::Environment => "environment variable",
        })
    }
}

/// Dotted field path to the layer that set it.
pub type FieldSources = HashMap<String, ConfigLayer>;

/// A loaded configuration plus where each value came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final configuration.
    pub config: Config,
    /// Dotted field path → layer that set it.
    pub field_sources: FieldSources,
    /// Files that were found and merged, in merge order.
    pub loaded_files: Vec<String>,
}

/// Load the layered configuration with `home` as the user directory.
///
/// The system and user files are optional; `explicit` must exist.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file cannot be read or parsed, or the
/// merged configuration fails validation.
pub fn load(home: &Path, explicit: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let defaults = parse_toml(DEFAULTS_TOML, "<embedded defaults>")?;
    let mut merged = toml::Value::Table(toml::Table::new());
    let mut field_sources = FieldSources::new();
    merge_into(&mut merged, &defaults, "", ConfigLayer::Defaults, &mut field_sources);

    let mut files = vec![
        (PathBuf::from(SYSTEM_CONFIG), ConfigLayer::System, false),
        (home.join("config.toml"), ConfigLayer::User, false),
    ];
    if let Some(path) = explicit {
        files.push((path.to_path_buf(), ConfigLayer::Explicit, true));
    }

    let mut loaded_files = Vec::new();
    for (path, layer, required) in files {
        let Some(overlay) = read_layer(&path, required)? else {
            continue;
        };
        merge_into(&mut merged, &overlay, "", layer, &mut field_sources);
        info!(path = %path.display(), %layer, "loaded config");
        loaded_files.push(path.display().to_string());
    }

    let from_env = apply_env_fallbacks(&mut merged, &mut field_sources, &collect_env_vars());
    if from_env > 0 {
        debug!(count = from_env, "applied environment variable fallbacks");
    }

    let config: Config = merged
        .try_into()
        .map_err(|source| ConfigError::ParseError {
            path: "<merged config>".to_owned(),
            source,
        })?;
    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// The default user directory (`~/.keyledger`).
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDir`] if the home directory is unknown.
pub fn default_home() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(HOME_DIR_NAME))
        .ok_or(ConfigError::NoHomeDir)
}

fn parse_toml(content: &str, path: &str) -> ConfigResult<toml::Value> {
    toml::from_str(content).map_err(|source| ConfigError::ParseError {
        path: path.to_owned(),
        source,
    })
}

/// Read one layer. A missing optional file is `None`.
fn read_layer(path: &Path, required: bool) -> ConfigResult<Option<toml::Value>> {
    let read_error = |source| ConfigError::ReadError {
        path: path.display().to_string(),
        source,
    };
    let size = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => return Err(read_error(e)),
    };
    if size > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!("config file is {size} bytes, over the {MAX_CONFIG_FILE_SIZE} byte limit"),
        });
    }
    let content = std::fs::read_to_string(path).map_err(read_error)?;
    parse_toml(&content, &path.display().to_string()).map(Some)
}

/// Merge `overlay` into `base` and record `layer` for every leaf it sets.
///
/// Tables merge per key; scalars and arrays replace.
fn merge_into(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                let slot = base
                    .entry(key.clone())
                    .or_insert_with(|| toml::Value::Table(toml::Table::new()));
                if value.is_table() && !slot.is_table() {
                    *slot = toml::Value::Table(toml::Table::new());
                }
                merge_into(slot, value, &path, layer, sources);
            }
        },
        (base, leaf) => {
            *base = leaf.clone();
            sources.insert(prefix.to_owned(), layer);
        },
    }
}
