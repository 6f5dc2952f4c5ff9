//! Terminal styling for command output.

use chrono::{DateTime, Utc};
use colored::Colorize;
use keyledger_crypto::PublicKey;

pub(crate) struct Theme;

impl Theme {
    pub(crate) fn header(text: &str) -> String {
        text.bold().cyan().to_string()
    }

    /// Accepted by the ledger.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {text}", "✓".green().bold())
    }

    /// Refused by the ledger or the local pins.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red().bold(), text.red())
    }

    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow().bold(), text.yellow())
    }

    pub(crate) fn info(text: &str) -> String {
        format!("{} {text}", "·".blue())
    }

    pub(crate) fn dimmed(text: &str) -> String {
        text.dimmed().to_string()
    }

    /// Rule drawn under a chain listing header.
    pub(crate) fn separator() -> String {
        "─".repeat(40).dimmed().to_string()
    }

    pub(crate) fn kv(key: &str, value: &str) -> String {
        format!("{:>10} {value}", key.bold())
    }

    /// Short key fingerprint, as printed in log lines.
    pub(crate) fn key(key: &PublicKey) -> String {
        key.short_hex().cyan().to_string()
    }

    /// Claim expiries, to the minute, in UTC.
    pub(crate) fn timestamp(at: &DateTime<Utc>) -> String {
        at.format("%Y-%m-%d %H:%M UTC").to_string().dimmed().to_string()
    }
}
