//! Application configuration management.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::Currency;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger business rules and storage bounds.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    5
}

/// Ledger configuration shared by every transaction processor.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Largest amount accepted for a single deposit (inclusive).
    #[serde(default = "default_deposit_ceiling")]
    pub deposit_ceiling: Decimal,
    /// Currency stamped on every new ledger entry.
    #[serde(default)]
    pub currency: Currency,
    /// Upper bound for any single storage call, in milliseconds.
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,
}

fn default_deposit_ceiling() -> Decimal {
    Decimal::new(10_000, 0)
}

fn default_store_timeout() -> u64 {
    5_000
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            deposit_ceiling: default_deposit_ceiling(),
            currency: Currency::default(),
            store_timeout_ms: default_store_timeout(),
        }
    }
}

impl LedgerConfig {
    /// Returns the storage timeout as a `Duration`.
    #[must_use]
    pub const fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl DatabaseConfig {
    /// Returns the pool acquire timeout as a `Duration`.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
    /// then `PAYHUB__*` environment variables (`PAYHUB__DATABASE__URL`,
    /// `PAYHUB__LEDGER__DEPOSIT_CEILING`, ...).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("PAYHUB").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ledger_defaults() {
        let ledger = LedgerConfig::default();
        assert_eq!(ledger.deposit_ceiling, dec!(10000));
        assert_eq!(ledger.currency, Currency::Mxn);
        assert_eq!(ledger.store_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_load_uses_defaults_for_missing_sections() {
        temp_env::with_vars(
            [
                ("PAYHUB__DATABASE__URL", Some("postgres://localhost/payhub")),
                ("PAYHUB__LEDGER__DEPOSIT_CEILING", None),
                ("PAYHUB__LEDGER__CURRENCY", None),
                ("PAYHUB__LEDGER__STORE_TIMEOUT_MS", None),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/payhub");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.database.min_connections, 1);
                assert_eq!(config.database.connect_timeout(), Duration::from_secs(5));
                assert_eq!(config.ledger.deposit_ceiling, dec!(10000));
                assert_eq!(config.ledger.currency, Currency::Mxn);
            },
        );
    }

    #[test]
    fn test_load_reads_ledger_overrides() {
        temp_env::with_vars(
            [
                ("PAYHUB__DATABASE__URL", Some("postgres://db/payhub")),
                ("PAYHUB__LEDGER__DEPOSIT_CEILING", Some("2500.50")),
                ("PAYHUB__LEDGER__CURRENCY", Some("USD")),
                ("PAYHUB__LEDGER__STORE_TIMEOUT_MS", Some("250")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.ledger.deposit_ceiling, dec!(2500.50));
                assert_eq!(config.ledger.currency, Currency::Usd);
                assert_eq!(config.ledger.store_timeout(), Duration::from_millis(250));
            },
        );
    }

    #[test]
    fn test_load_requires_database_url() {
        temp_env::with_var_unset("PAYHUB__DATABASE__URL", || {
            assert!(AppConfig::load().is_err());
        });
    }
}
