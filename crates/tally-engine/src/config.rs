//! Engine configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                   | Default      |
//! |----------------------------|--------------|
//! | `TALLY_DB_PATH`            | `./tally.db` |
//! | `TALLY_DB_MAX_CONNECTIONS` | `5`          |
//! | `TALLY_INVOICE_COUNTER`    | `invoice`    |
//! | `TALLY_INVOICE_PREFIX`     | `INV`        |
//! | `TALLY_LOG`                | unset        |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use tally_core::invoice::DEFAULT_INVOICE_PREFIX;
use tally_db::DbConfig;

pub const DEFAULT_DB_PATH: &str = "./tally.db";
pub const DEFAULT_INVOICE_COUNTER: &str = "invoice";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Pool size
    pub db_max_connections: u32,

    /// Name of the counter row invoice numbers are drawn from
    pub invoice_counter: String,

    /// Leading part of every invoice number
    pub invoice_prefix: String,

    /// Tracing filter; `RUST_LOG` applies when unset
    pub log_filter: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            db_max_connections: 5,
            invoice_counter: DEFAULT_INVOICE_COUNTER.to_string(),
            invoice_prefix: DEFAULT_INVOICE_PREFIX.to_string(),
            log_filter: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = EngineConfig::default();

        let config = EngineConfig {
            db_path: lookup("TALLY_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),

            db_max_connections: match lookup("TALLY_DB_MAX_CONNECTIONS") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("TALLY_DB_MAX_CONNECTIONS".to_string()))?,
                None => defaults.db_max_connections,
            },

            invoice_counter: lookup("TALLY_INVOICE_COUNTER")
                .unwrap_or(defaults.invoice_counter),

            invoice_prefix: lookup("TALLY_INVOICE_PREFIX")
                .unwrap_or(defaults.invoice_prefix),

            log_filter: lookup("TALLY_LOG").filter(|f| !f.trim().is_empty()),
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("TALLY_DB_MAX_CONNECTIONS".to_string()));
        }
        if config.invoice_counter.trim().is_empty() {
            return Err(ConfigError::MissingRequired("TALLY_INVOICE_COUNTER".to_string()));
        }
        if config.invoice_prefix.trim().is_empty() {
            return Err(ConfigError::MissingRequired("TALLY_INVOICE_PREFIX".to_string()));
        }

        Ok(config)
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.db_path).max_connections(self.db_max_connections)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<EngineConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::load_from(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.invoice_prefix, "INV");
        assert_eq!(config.db_config().max_connections, 5);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TALLY_DB_PATH", "/var/lib/tally/shop.db"),
            ("TALLY_DB_MAX_CONNECTIONS", "8"),
            ("TALLY_INVOICE_PREFIX", "WH"),
            ("TALLY_LOG", "debug"),
        ])
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/var/lib/tally/shop.db"));
        assert_eq!(config.db_max_connections, 8);
        assert_eq!(config.invoice_prefix, "WH");
        assert_eq!(config.log_filter.as_deref(), Some("debug"));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            load(&[("TALLY_DB_MAX_CONNECTIONS", "many")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            load(&[("TALLY_DB_MAX_CONNECTIONS", "0")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            load(&[("TALLY_INVOICE_PREFIX", " ")]),
            Err(ConfigError::MissingRequired(_))
        ));
    }
}
