//! Range checks run on the merged configuration.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, LedgerSection, StorageBackend};

/// Upper bound on any single ledger limit.
const LIMIT_UPPER_BOUND: usize = 1 << 20;

/// A rotation submits the outgoing link plus the incoming one.
const MIN_TAIL_LEN: usize = 2;

/// The username listing may not be rebuilt more often than this.
const MIN_USERNAME_CACHE_TTL_SECS: u64 = 60;

/// First out-of-range field wins.
pub(crate) fn validate(config: &Config) -> ConfigResult<()> {
    validate_ledger(&config.ledger)?;
    if config.storage.backend == StorageBackend::Memory && config.storage.path.is_some() {
        return invalid("storage.path", "the memory backend does not take a path");
    }
    validate_logging(config)
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigResult<()> {
    Err(ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    })
}

fn within(field: &str, value: usize, min: usize) -> ConfigResult<()> {
    if (min..=LIMIT_UPPER_BOUND).contains(&value) {
        return Ok(());
    }
    invalid(field, format!("{value} is outside {min}..={LIMIT_UPPER_BOUND}"))
}

fn validate_ledger(l: &LedgerSection) -> ConfigResult<()> {
    within("ledger.max_pending_followers", l.max_pending_followers, 1)?;
    within("ledger.max_username_len", l.max_username_len, 1)?;
    within("ledger.max_hash_len", l.max_hash_len, 1)?;
    within("ledger.max_follow_request_len", l.max_follow_request_len, 1)?;
    within("ledger.max_tail_len", l.max_tail_len, MIN_TAIL_LEN)?;
    if l.username_cache_ttl_secs < MIN_USERNAME_CACHE_TTL_SECS {
        return invalid(
            "ledger.username_cache_ttl_secs",
            format!(
                "{} is below the {MIN_USERNAME_CACHE_TTL_SECS} second minimum",
                l.username_cache_ttl_secs
            ),
        );
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    one_of(
        "logging.level",
        &config.logging.level,
        &["trace", "debug", "info", "warn", "error"],
    )?;
    one_of("logging.format", &config.logging.format, &["pretty", "compact", "json"])
}

fn one_of(field: &str, value: &str, allowed: &[&str]) -> ConfigResult<()> {
    if allowed.contains(&value) {
        return Ok(());
    }
    invalid(field, format!("'{value}' is not one of {}", allowed.join(", ")))
}
