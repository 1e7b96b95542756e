//! Process configuration loaded from the environment.

use std::path::PathBuf;

use anyhow::{Context, Result};
use toolcrib_observability::LogFormat;

/// CLI configuration.
///
/// | Env Var                 | Default         |
/// |-------------------------|-----------------|
/// | `TOOLCRIB_SNAPSHOT`     | `toolcrib.json` |
/// | `TOOLCRIB_RECENT_LIMIT` | `10`            |
/// | `TOOLCRIB_LOG_FORMAT`   | `json`          |
///
/// Command-line flags override these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CribConfig {
    pub snapshot_path: PathBuf,
    pub recent_limit: usize,
    pub log_format: LogFormat,
}

impl Default for CribConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("toolcrib.json"),
            recent_limit: 10,
            log_format: LogFormat::Json,
        }
    }
}

impl CribConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment, or a map in tests).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let snapshot_path = get("TOOLCRIB_SNAPSHOT")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.snapshot_path);

        let recent_limit = match get("TOOLCRIB_RECENT_LIMIT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("TOOLCRIB_RECENT_LIMIT must be a non-negative integer, got '{raw}'"))?,
            None => defaults.recent_limit,
        };

        let log_format = match get("TOOLCRIB_LOG_FORMAT") {
            Some(raw) => raw
                .parse()
                .map_err(anyhow::Error::msg)
                .context("invalid TOOLCRIB_LOG_FORMAT")?,
            None => defaults.log_format,
        };

        Ok(Self {
            snapshot_path,
            recent_limit,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = CribConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CribConfig::default());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = CribConfig::from_lookup(lookup(&[
            ("TOOLCRIB_SNAPSHOT", "/var/lib/toolcrib/ledger.json"),
            ("TOOLCRIB_RECENT_LIMIT", " 3 "),
            ("TOOLCRIB_LOG_FORMAT", "text"),
        ]))
        .unwrap();

        assert_eq!(config.snapshot_path, PathBuf::from("/var/lib/toolcrib/ledger.json"));
        assert_eq!(config.recent_limit, 3);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(CribConfig::from_lookup(lookup(&[("TOOLCRIB_RECENT_LIMIT", "many")])).is_err());
        assert!(CribConfig::from_lookup(lookup(&[("TOOLCRIB_LOG_FORMAT", "xml")])).is_err());
    }
}
