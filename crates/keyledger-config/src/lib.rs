//! Layered configuration for the keyledger CLI and ledger.
//!
//! ```rust,no_run
//! use keyledger_config::{Config, default_home};
//!
//! let resolved = Config::load_with_home(&default_home().unwrap(), None).unwrap();
//! println!("cache ttl: {:?}", resolved.config.ledger.username_cache_ttl());
//! ```
//!
//! Later layers win: embedded `defaults.toml`, `/etc/keyledger/config.toml`,
//! `<home>/config.toml`, then the file passed with `--config`. A
//! `KEYLEDGER_*` variable only fills a field no file set.
//!
//! Nothing here depends on other keyledger crates; callers turn the
//! sections into ledger limits and storage handles at startup.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod env;
mod error;
mod loader;
mod types;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLayer, FieldSources, HOME_DIR_NAME, ResolvedConfig, default_home};
pub use types::{Config, LedgerSection, LoggingSection, StorageBackend, StorageSection};

impl Config {
    /// Load configuration with `home_dir` as the user directory, usually
    /// [`default_home`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load_with_home(
        home_dir: &std::path::Path,
        explicit: Option<&std::path::Path>,
    ) -> ConfigResult<ResolvedConfig> {
        loader::load(home_dir, explicit)
    }
}
