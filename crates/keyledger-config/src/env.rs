//! `KEYLEDGER_*` environment fallbacks.
//!
//! A variable only fills a field that no config file set. Fields that
//! carry nothing but the embedded default count as unset.

use std::collections::HashMap;

use tracing::debug;

use crate::loader::{ConfigLayer, FieldSources};

/// TOML type a variable is parsed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Integer,
}

/// `(variable, section, field, kind)`.
const ENV_FIELDS: &[(&str, &str, &str, Kind)] = &[
    ("KEYLEDGER_LOG_LEVEL", "logging", "level", Kind::Text),
    ("KEYLEDGER_LOG_FORMAT", "logging", "format", Kind::Text),
    ("KEYLEDGER_LOG_DIR", "logging", "directory", Kind::Text),
    ("KEYLEDGER_STORAGE_BACKEND", "storage", "backend", Kind::Text),
    ("KEYLEDGER_STORAGE_PATH", "storage", "path", Kind::Text),
    ("KEYLEDGER_USERNAME_CACHE_TTL_SECS", "ledger", "username_cache_ttl_secs", Kind::Integer),
    ("KEYLEDGER_MAX_PENDING_FOLLOWERS", "ledger", "max_pending_followers", Kind::Integer),
    ("KEYLEDGER_MAX_USERNAME_LEN", "ledger", "max_username_len", Kind::Integer),
    ("KEYLEDGER_MAX_TAIL_LEN", "ledger", "max_tail_len", Kind::Integer),
    ("KEYLEDGER_MAX_HASH_LEN", "ledger", "max_hash_len", Kind::Integer),
    ("KEYLEDGER_MAX_FOLLOW_REQUEST_LEN", "ledger", "max_follow_request_len", Kind::Integer),
];

/// Fill unset fields of `merged` from `vars`. Returns how many were applied.
///
/// An integer field given a non-numeric value is stored as a string so
/// deserialization reports the bad value against its field.
pub(crate) fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    vars: &HashMap<String, String, S>,
) -> usize {
    let mut applied: usize = 0;
    for &(var, section, field, kind) in ENV_FIELDS {
        let path = format!("{section}.{field}");
        if sources.get(&path).is_some_and(|layer| *layer != ConfigLayer::Defaults) {
            continue;
        }
        let Some(raw) = vars.get(var) else {
            continue;
        };
        let Some(table) = merged.as_table_mut() else {
            return applied;
        };
        let section = table
            .entry(section)
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if let Some(section) = section.as_table_mut() {
            debug!(var, field = %path, "applying env var fallback");
            section.insert(field.to_owned(), parse(kind, raw));
            sources.insert(path, ConfigLayer::Environment);
            applied = applied.saturating_add(1);
        }
    }
    applied
}

fn parse(kind: Kind, raw: &str) -> toml::Value {
    match (kind, raw.parse::<i64>()) {
        (Kind::Integer, Ok(i)) => toml::Value::Integer(i),
        _ => toml::Value::String(raw.to_owned()),
    }
}

/// Snapshot of the process environment.
#[must_use]
pub(crate) fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_env_fills_defaults_and_missing_sections() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"info\"").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".to_owned(), ConfigLayer::Defaults);
        let env = vars(&[
            ("KEYLEDGER_LOG_LEVEL", "debug"),
            ("KEYLEDGER_MAX_PENDING_FOLLOWERS", "25"),
        ]);

        assert_eq!(apply_env_fallbacks(&mut merged, &mut sources, &env), 2);
        assert_eq!(merged["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(merged["ledger"]["max_pending_followers"].as_integer(), Some(25));
        assert_eq!(sources.get("logging.level"), Some(&ConfigLayer::Environment));
    }

    #[test]
    fn test_file_values_win_over_env() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"warn\"").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".to_owned(), ConfigLayer::User);

        let env = vars(&[("KEYLEDGER_LOG_LEVEL", "debug")]);
        assert_eq!(apply_env_fallbacks(&mut merged, &mut sources, &env), 0);
        assert_eq!(merged["logging"]["level"].as_str(), Some("warn"));
    }

    #[test]
    fn test_non_numeric_integer_stays_text() {
        assert_eq!(parse(Kind::Integer, "lots").as_str(), Some("lots"));
        assert_eq!(parse(Kind::Integer, "7").as_integer(), Some(7));
        assert_eq!(parse(Kind::Text, "7").as_str(), Some("7"));
    }
}
