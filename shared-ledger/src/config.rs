//! Configuration for the ledger

use crate::types::DEFAULT_INITIAL_BALANCE;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Service name
    pub service_name: String,

    /// Balance the ledger starts with
    pub initial_balance: Decimal,

    /// Bounded lock wait for `try_*` and `transfer` callers (milliseconds)
    pub lock_timeout_ms: u64,

    /// Demo binary configuration
    pub demo: DemoConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            service_name: "shared-ledger".to_string(),
            initial_balance: DEFAULT_INITIAL_BALANCE,
            lock_timeout_ms: 1_000,
            demo: DemoConfig::default(),
        }
    }
}

/// Demo workload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Number of worker threads
    pub workers: usize,

    /// Amount each worker deposits
    pub deposit_amount: Decimal,

    /// Amount each worker withdraws afterwards
    pub withdraw_amount: Decimal,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            deposit_amount: Decimal::from(1_000),
            withdraw_amount: Decimal::from(500),
        }
    }
}

impl LedgerConfig {
    /// Bounded lock wait as a `Duration`
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LedgerConfig = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = LedgerConfig::default();

        if let Ok(balance) = std::env::var("LEDGER_INITIAL_BALANCE") {
            config.initial_balance = Decimal::from_str(&balance).map_err(|e| {
                crate::Error::Config(format!("LEDGER_INITIAL_BALANCE: {}", e))
            })?;
        }

        if let Ok(timeout) = std::env::var("LEDGER_LOCK_TIMEOUT_MS") {
            config.lock_timeout_ms = timeout.parse().map_err(|e| {
                crate::Error::Config(format!("LEDGER_LOCK_TIMEOUT_MS: {}", e))
            })?;
        }

        if let Ok(workers) = std::env::var("LEDGER_DEMO_WORKERS") {
            config.demo.workers = workers.parse().map_err(|e| {
                crate::Error::Config(format!("LEDGER_DEMO_WORKERS: {}", e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the ledger cannot start from
    pub fn validate(&self) -> crate::Result<()> {
        if self.initial_balance.is_sign_negative() {
            return Err(crate::Error::Config(format!(
                "initial_balance must not be negative, got {}",
                self.initial_balance
            )));
        }
        Ok(())
    }
}
