//! Metrics collection for observability
//!
//! Each ledger owns its own Prometheus registry, so isolated instances
//! (tests, embedders) never collide on metric names.
//!
//! # Metrics
//!
//! - `ledger_deposits_total` - Accepted deposits
//! - `ledger_withdrawals_total` - Accepted withdrawals
//! - `ledger_rejected_total{reason}` - Rejected operations by reason
//! - `ledger_balance` - Balance after the last accepted operation

use prometheus::{Gauge, IntCounter, IntCounterVec, Opts, Registry};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Rejection reason for insufficient funds
pub const REASON_INSUFFICIENT_FUNDS: &str = "insufficient_funds";

/// Metrics collector
#[derive(Clone)]
pub struct LedgerMetrics {
    /// Accepted deposits
    pub deposits_total: IntCounter,

    /// Accepted withdrawals
    pub withdrawals_total: IntCounter,

    /// Rejected operations, labelled by reason
    pub rejected_total: IntCounterVec,

    /// Balance after the last accepted operation
    pub balance: Gauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl LedgerMetrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let deposits_total = IntCounter::new("ledger_deposits_total", "Accepted deposits")?;
        registry.register(Box::new(deposits_total.clone()))?;

        let withdrawals_total =
            IntCounter::new("ledger_withdrawals_total", "Accepted withdrawals")?;
        registry.register(Box::new(withdrawals_total.clone()))?;

        let rejected_total = IntCounterVec::new(
            Opts::new("ledger_rejected_total", "Rejected operations by reason"),
            &["reason"],
        )?;
        registry.register(Box::new(rejected_total.clone()))?;

        let balance = Gauge::new("ledger_balance", "Balance after the last accepted operation")?;
        registry.register(Box::new(balance.clone()))?;

        Ok(Self {
            deposits_total,
            withdrawals_total,
            rejected_total,
            balance,
            registry,
        })
    }

    /// Record accepted deposit
    pub fn record_deposit(&self, balance: Decimal) {
        self.deposits_total.inc();
        self.set_balance(balance);
    }

    /// Record accepted withdrawal
    pub fn record_withdrawal(&self, balance: Decimal) {
        self.withdrawals_total.inc();
        self.set_balance(balance);
    }

    /// Record rejected operation
    pub fn record_rejected(&self, reason: &str) {
        self.rejected_total.with_label_values(&[reason]).inc();
    }

    /// Rejections recorded for `reason`
    pub fn rejected(&self, reason: &str) -> u64 {
        self.rejected_total.with_label_values(&[reason]).get()
    }

    /// Update balance gauge
    pub fn set_balance(&self, balance: Decimal) {
        // Gauge is informational; exact value lives in the ledger
        self.balance.set(balance.to_f64().unwrap_or(f64::NAN));
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl std::fmt::Debug for LedgerMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerMetrics")
            .field("deposits_total", &self.deposits_total.get())
            .field("withdrawals_total", &self.withdrawals_total.get())
            .finish_non_exhaustive()
    }
}
