//! # Engine Configuration
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults.
//!
//! ## Variables
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Variable                         Default      Used by                  │
//! │  ───────────────────────────────  ───────────  ───────────────────────  │
//! │  TALLY_DB_PATH                    ./tally.db   DbConfig                 │
//! │  TALLY_DB_MAX_CONNECTIONS         5            DbConfig                 │
//! │  TALLY_MAX_ITEM_QUANTITY          unset        OrderEngine              │
//! │  TALLY_MAX_ORDER_LINES            unset        OrderEngine              │
//! │  TALLY_ROLLBACK_PARTIAL_ORDERS    true         OrderEngine              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The two limits are opt-in; unset means any positive quantity and any
//! number of lines.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tally_db::DbConfig;

/// Behavior knobs of the [`OrderEngine`](crate::OrderEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Largest quantity accepted on a single order line. `None` accepts
    /// any positive quantity.
    pub max_item_quantity: Option<i64>,

    /// Largest number of lines accepted in one order.
    pub max_order_lines: Option<usize>,

    /// Restore already-applied stock decrements when order creation fails
    /// part way through.
    ///
    /// ```text
    /// lines [A×2, B×5], B short on stock
    ///
    ///   true  → A decremented, B fails, A restored    (stock unchanged)
    ///   false → A decremented, B fails                (A stays decremented)
    /// ```
    pub rollback_partial_orders: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_item_quantity: None,
            max_order_lines: None,
            rollback_partial_orders: true,
        }
    }
}

/// Full application configuration: storage plus engine behavior.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database file.
    pub db_path: PathBuf,

    /// Pool size for the SQLite store.
    pub db_max_connections: u32,

    pub engine: EngineConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// `from_env` is this with `std::env::var`; tests pass a map instead of
    /// mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = EngineConfig::default();

        let config = AppConfig {
            db_path: lookup("TALLY_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./tally.db")),

            db_max_connections: parse_or(&lookup, "TALLY_DB_MAX_CONNECTIONS", 5)?,

            engine: EngineConfig {
                max_item_quantity: parse_opt(&lookup, "TALLY_MAX_ITEM_QUANTITY")?
                    .or(defaults.max_item_quantity),
                max_order_lines: parse_opt(&lookup, "TALLY_MAX_ORDER_LINES")?
                    .or(defaults.max_order_lines),
                rollback_partial_orders: parse_or(
                    &lookup,
                    "TALLY_ROLLBACK_PARTIAL_ORDERS",
                    defaults.rollback_partial_orders,
                )?,
            },
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "TALLY_DB_MAX_CONNECTIONS".to_string(),
            ));
        }
        if config.engine.max_item_quantity.is_some_and(|max| max <= 0) {
            return Err(ConfigError::InvalidValue(
                "TALLY_MAX_ITEM_QUANTITY".to_string(),
            ));
        }
        if config.engine.max_order_lines == Some(0) {
            return Err(ConfigError::InvalidValue("TALLY_MAX_ORDER_LINES".to_string()));
        }

        Ok(config)
    }

    /// The pool configuration for [`tally_db::Database::new`].
    ///
    /// `:memory:` always gets a single connection; every extra connection
    /// would open its own empty database.
    pub fn db_config(&self) -> DbConfig {
        let config = DbConfig::new(&self.db_path);
        if config.is_in_memory() {
            return DbConfig::in_memory();
        }
        config.max_connections(self.db_max_connections)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}

fn parse_opt<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
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
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.db_path, PathBuf::from("./tally.db"));
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.engine.max_item_quantity, None);
        assert_eq!(config.engine.max_order_lines, None);
        assert!(config.engine.rollback_partial_orders);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TALLY_DB_PATH", "/var/lib/tally/orders.db"),
            ("TALLY_DB_MAX_CONNECTIONS", "8"),
            ("TALLY_MAX_ITEM_QUANTITY", "50"),
            ("TALLY_MAX_ORDER_LINES", "10"),
            ("TALLY_ROLLBACK_PARTIAL_ORDERS", "false"),
        ]))
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/var/lib/tally/orders.db"));
        assert_eq!(config.db_config().max_connections, 8);
        assert_eq!(config.engine.max_item_quantity, Some(50));
        assert_eq!(config.engine.max_order_lines, Some(10));
        assert!(!config.engine.rollback_partial_orders);
    }

    #[test]
    fn test_in_memory_path_uses_one_connection() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TALLY_DB_PATH", ":memory:"),
            ("TALLY_DB_MAX_CONNECTIONS", "8"),
        ]))
        .unwrap();

        let db = config.db_config();
        assert!(db.is_in_memory());
        assert_eq!(db.max_connections, 1);
    }

    #[test]
    fn test_invalid_values() {
        let err = AppConfig::from_lookup(lookup(&[("TALLY_MAX_ORDER_LINES", "many")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for TALLY_MAX_ORDER_LINES");

        assert!(AppConfig::from_lookup(lookup(&[("TALLY_DB_MAX_CONNECTIONS", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("TALLY_MAX_ITEM_QUANTITY", "-1")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("TALLY_MAX_ORDER_LINES", "0")])).is_err());
        assert!(
            AppConfig::from_lookup(lookup(&[("TALLY_ROLLBACK_PARTIAL_ORDERS", "maybe")])).is_err()
        );
    }
}
