//! Shared aggregate ledger
//!
//! A [`Ledger`] keeps one aggregate `balance` and a count of accepted
//! operations. Both fields sit behind a single mutex, so every operation
//! is applied as one indivisible step:
//!
//! - a reader never sees a balance without its matching count
//! - the overdraft check and the subtraction in `withdraw` happen under
//!   the same guard
//! - concurrent deposits never lose updates
//!
//! The process-wide instance is obtained through [`get_instance`]; it is
//! built on first access and lives until the process exits.
//!
//! # Example
//!
//! ```
//! use rust_decimal::Decimal;
//! use shared_ledger::get_instance;
//!
//! let ledger = get_instance();
//! ledger.deposit("ACC123", Decimal::from(1000)).unwrap();
//! assert!(ledger.withdraw("ACC123", Decimal::from(500)).unwrap());
//! ```

use crate::{
    metrics::{LedgerMetrics, REASON_INSUFFICIENT_FUNDS},
    registry::InstanceRegistry,
    types::LedgerSnapshot,
    Error, LedgerConfig, Result,
};
use chrono::Utc;
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// The process-wide ledger
static SHARED_LEDGER: InstanceRegistry<Ledger> = InstanceRegistry::new();

/// Handle to the process-wide ledger
///
/// The first call builds it from [`LedgerConfig::default`]; every call from
/// every thread returns a handle to the same instance.
///
/// # Panics
///
/// Construction only fails on a negative initial balance or an invalid
/// metric name. The default configuration has neither, so this does not
/// panic.
pub fn get_instance() -> Arc<Ledger> {
    SHARED_LEDGER
        .get_or_try_init(|| Ledger::build(LedgerConfig::default()))
        .expect("default ledger configuration is valid")
}

/// Build the process-wide ledger from an explicit configuration
///
/// Fails with [`Error::AlreadyInitialized`] if the ledger already exists,
/// rather than silently discarding `config`. If construction fails the
/// ledger stays unbuilt and a later call may retry.
pub fn init_global(config: LedgerConfig) -> Result<Arc<Ledger>> {
    let mut built = false;
    let ledger = SHARED_LEDGER.get_or_try_init(|| {
        built = true;
        Ledger::build(config)
    })?;

    if !built {
        return Err(Error::AlreadyInitialized);
    }
    Ok(ledger)
}

/// Fields guarded together by the ledger lock
#[derive(Debug)]
struct LedgerState {
    balance: Decimal,
    transaction_count: u64,
}

/// Aggregate ledger with atomic deposit and withdraw
pub struct Ledger {
    /// Identifier assigned at construction
    instance_id: Uuid,

    /// Single mutual-exclusion domain for balance and count
    state: Mutex<LedgerState>,

    /// Operation metrics
    metrics: LedgerMetrics,
}

impl Ledger {
    /// Create an isolated ledger, outside the process-wide registry
    ///
    /// # Panics
    ///
    /// Panics if `config` fails validation.
    #[cfg(any(test, feature = "test-util"))]
    pub fn new(config: LedgerConfig) -> Self {
        Self::try_new(config).expect("invalid ledger configuration")
    }

    /// Create an isolated ledger, validating the configuration first
    #[cfg(any(test, feature = "test-util"))]
    pub fn try_new(config: LedgerConfig) -> Result<Self> {
        Self::build(config)
    }

    fn build(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let metrics = LedgerMetrics::new()
            .map_err(|e| Error::Construction(format!("Failed to create metrics: {}", e)))?;

        let instance_id = Uuid::new_v4();
        metrics.set_balance(config.initial_balance);

        tracing::info!(
            %instance_id,
            service = %config.service_name,
            initial_balance = %config.initial_balance,
            "Ledger initialized"
        );

        Ok(Self {
            instance_id,
            state: Mutex::new(LedgerState {
                balance: config.initial_balance,
                transaction_count: 0,
            }),
            metrics,
        })
    }

    /// Identifier assigned at construction
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Operation metrics
    pub fn metrics(&self) -> &LedgerMetrics {
        &self.metrics
    }

    /// Add `amount` to the balance
    ///
    /// Fails with [`Error::InvalidAmount`] if `amount` is zero or negative,
    /// or [`Error::Overflow`] if the balance would exceed `Decimal::MAX`;
    /// either way the ledger is left untouched.
    pub fn deposit(&self, label: &str, amount: Decimal) -> Result<()> {
        self.ensure_positive(label, amount)?;
        let mut state = self.state.lock();
        self.apply_deposit(&mut state, label, amount)
    }

    /// Subtract `amount` from the balance if funds suffice
    ///
    /// Returns `Ok(false)` without changing anything when `amount` exceeds
    /// the current balance. Zero or negative amounts fail with
    /// [`Error::InvalidAmount`].
    pub fn withdraw(&self, label: &str, amount: Decimal) -> Result<bool> {
        self.ensure_positive(label, amount)?;
        let mut state = self.state.lock();
        Ok(self.apply_withdraw(&mut state, label, amount))
    }

    /// [`deposit`](Self::deposit) with a bounded wait for the lock
    ///
    /// Fails with [`Error::ResourceBusy`] if the lock is not acquired within
    /// `timeout`.
    pub fn try_deposit(&self, label: &str, amount: Decimal, timeout: Duration) -> Result<()> {
        self.ensure_positive(label, amount)?;
        let mut state = self.lock_within(label, timeout)?;
        self.apply_deposit(&mut state, label, amount)
    }

    /// [`withdraw`](Self::withdraw) with a bounded wait for the lock
    pub fn try_withdraw(&self, label: &str, amount: Decimal, timeout: Duration) -> Result<bool> {
        self.ensure_positive(label, amount)?;
        let mut state = self.lock_within(label, timeout)?;
        Ok(self.apply_withdraw(&mut state, label, amount))
    }

    /// Move `amount` from one account label to another
    ///
    /// The withdrawal and the deposit are applied under one lock acquisition,
    /// counting as two accepted operations. The aggregate balance is
    /// unchanged. Returns `Ok(false)` if funds are insufficient.
    pub fn transfer(&self, from: &str, to: &str, amount: Decimal, timeout: Duration) -> Result<bool> {
        self.ensure_positive(from, amount)?;
        let mut state = self.lock_within(from, timeout)?;

        if !self.apply_withdraw(&mut state, from, amount) {
            return Ok(false);
        }
        // Restores the pre-withdrawal balance, so it cannot overflow
        self.apply_deposit(&mut state, to, amount)?;
        Ok(true)
    }

    /// Current balance
    pub fn balance(&self) -> Decimal {
        self.state.lock().balance
    }

    /// Number of accepted operations
    pub fn transaction_count(&self) -> u64 {
        self.state.lock().transaction_count
    }

    /// Balance and count read under one lock acquisition
    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state.lock();
        LedgerSnapshot {
            instance_id: self.instance_id,
            balance: state.balance,
            transaction_count: state.transaction_count,
            taken_at: Utc::now(),
        }
    }

    fn ensure_positive(&self, label: &str, amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            let err = Error::InvalidAmount(amount);
            tracing::warn!(instance_id = %self.instance_id, label, %amount, "Rejected non-positive amount");
            self.metrics.record_rejected(err.reason());
            return Err(err);
        }
        Ok(())
    }

    fn lock_within(&self, label: &str, timeout: Duration) -> Result<MutexGuard<'_, LedgerState>> {
        self.state.try_lock_for(timeout).ok_or_else(|| {
            let err = Error::ResourceBusy(timeout);
            tracing::warn!(instance_id = %self.instance_id, label, ?timeout, "Could not acquire ledger lock");
            self.metrics.record_rejected(err.reason());
            err
        })
    }

    fn apply_deposit(&self, state: &mut LedgerState, label: &str, amount: Decimal) -> Result<()> {
        let Some(balance) = state.balance.checked_add(amount) else {
            let err = Error::Overflow(amount);
            tracing::warn!(
                instance_id = %self.instance_id,
                label,
                %amount,
                balance = %state.balance,
                "Deposit rejected - balance would overflow"
            );
            self.metrics.record_rejected(err.reason());
            return Err(err);
        };

        state.balance = balance;
        state.transaction_count += 1;
        self.metrics.record_deposit(state.balance);

        tracing::debug!(
            instance_id = %self.instance_id,
            label,
            %amount,
            balance = %state.balance,
            "Deposit applied"
        );
        Ok(())
    }

    fn apply_withdraw(&self, state: &mut LedgerState, label: &str, amount: Decimal) -> bool {
        if amount > state.balance {
            tracing::warn!(
                instance_id = %self.instance_id,
                label,
                %amount,
                balance = %state.balance,
                "Withdrawal failed - insufficient funds"
            );
            self.metrics.record_rejected(REASON_INSUFFICIENT_FUNDS);
            return false;
        }

        state.balance -= amount;
        state.transaction_count += 1;
        self.metrics.record_withdrawal(state.balance);

        tracing::debug!(
            instance_id = %self.instance_id,
            label,
            %amount,
            balance = %state.balance,
            "Withdrawal applied"
        );
        true
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("instance_id", &self.instance_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn create_test_ledger() -> Ledger {
        Ledger::new(LedgerConfig::default())
    }

    fn initial() -> Decimal {
        Decimal::new(1_000_000_00, 2)
    }

    #[test]
    fn test_initial_state() {
        let ledger = create_test_ledger();
        assert_eq!(ledger.balance(), initial());
        assert_eq!(ledger.transaction_count(), 0);
    }

    #[test]
    fn test_deposit_increases_balance() {
        let ledger = create_test_ledger();
        ledger.deposit("ACC001", Decimal::new(50000, 2)).unwrap();

        assert_eq!(ledger.balance(), initial() + Decimal::new(50000, 2));
        assert_eq!(ledger.transaction_count(), 1);
        assert_eq!(ledger.metrics().deposits_total.get(), 1);
    }

    #[test]
    fn test_rejected_deposit_is_noop() {
        let ledger = create_test_ledger();

        for amount in [Decimal::ZERO, Decimal::from(-100)] {
            let err = ledger.deposit("ACC001", amount).unwrap_err();
            assert!(matches!(err, Error::InvalidAmount(a) if a == amount));
        }

        assert_eq!(ledger.balance(), initial());
        assert_eq!(ledger.transaction_count(), 0);
        assert_eq!(ledger.metrics().rejected("invalid_amount"), 2);
    }

    #[test]
    fn test_deposit_overflow_is_rejected() {
        let ledger = create_test_ledger();

        let err = ledger.deposit("ACC001", Decimal::MAX).unwrap_err();
        assert!(matches!(err, Error::Overflow(a) if a == Decimal::MAX));

        let err = ledger
            .try_deposit("ACC001", Decimal::MAX, Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, Error::Overflow(_)));

        assert_eq!(ledger.balance(), initial());
        assert_eq!(ledger.transaction_count(), 0);
        assert_eq!(ledger.metrics().rejected("overflow"), 2);

        // Ledger stays usable afterwards
        ledger.deposit("ACC001", Decimal::ONE).unwrap();
        assert_eq!(ledger.balance(), initial() + Decimal::ONE);
    }

    #[test]
    fn test_withdraw_decreases_balance() {
        let ledger = create_test_ledger();
        assert!(ledger.withdraw("ACC001", Decimal::from(500)).unwrap());

        assert_eq!(ledger.balance(), initial() - Decimal::from(500));
        assert_eq!(ledger.transaction_count(), 1);
    }

    #[test]
    fn test_withdraw_entire_balance() {
        let ledger = create_test_ledger();
        assert!(ledger.withdraw("ACC001", initial()).unwrap());
        assert_eq!(ledger.balance(), Decimal::ZERO);
        assert!(!ledger.withdraw("ACC001", Decimal::new(1, 2)).unwrap());
    }

    #[test]
    fn test_withdraw_insufficient_funds() {
        let ledger = create_test_ledger();
        let result = ledger.withdraw("ACC001", initial() + Decimal::from(1000));

        assert!(!result.unwrap());
        assert_eq!(ledger.balance(), initial());
        assert_eq!(ledger.transaction_count(), 0);
        assert_eq!(ledger.metrics().rejected(REASON_INSUFFICIENT_FUNDS), 1);
    }

    #[test]
    fn test_rejected_withdraw_is_noop() {
        let ledger = create_test_ledger();

        for amount in [Decimal::ZERO, Decimal::from(-5)] {
            assert!(matches!(
                ledger.withdraw("ACC001", amount),
                Err(Error::InvalidAmount(_))
            ));
        }

        assert_eq!(ledger.balance(), initial());
        assert_eq!(ledger.transaction_count(), 0);
    }

    #[test]
    fn test_try_ops_fail_closed_when_busy() {
        let ledger = create_test_ledger();
        let timeout = Duration::from_millis(20);
        let held = ledger.state.lock();

        thread::scope(|s| {
            s.spawn(|| {
                let err = ledger.try_deposit("ACC001", Decimal::ONE, timeout).unwrap_err();
                assert!(matches!(err, Error::ResourceBusy(t) if t == timeout));

                let err = ledger.try_withdraw("ACC001", Decimal::ONE, timeout).unwrap_err();
                assert!(matches!(err, Error::ResourceBusy(_)));
            });
        });

        drop(held);
        assert_eq!(ledger.balance(), initial());
        assert_eq!(ledger.transaction_count(), 0);
        assert_eq!(ledger.metrics().rejected("resource_busy"), 2);
    }

    #[test]
    fn test_try_ops_apply_when_free() {
        let ledger = create_test_ledger();
        let timeout = Duration::from_millis(100);

        ledger.try_deposit("ACC001", Decimal::from(10), timeout).unwrap();
        assert!(ledger.try_withdraw("ACC001", Decimal::from(4), timeout).unwrap());
        assert!(!ledger.try_withdraw("ACC001", initial(), timeout).unwrap());

        assert_eq!(ledger.balance(), initial() + Decimal::from(6));
        assert_eq!(ledger.transaction_count(), 2);
    }

    #[test]
    fn test_transfer() {
        let ledger = create_test_ledger();
        let timeout = Duration::from_secs(1);

        assert!(ledger.transfer("ACC001", "ACC002", Decimal::from(250), timeout).unwrap());
        assert_eq!(ledger.balance(), initial());
        assert_eq!(ledger.transaction_count(), 2);

        assert!(!ledger
            .transfer("ACC001", "ACC002", initial() + Decimal::ONE, timeout)
            .unwrap());
        assert_eq!(ledger.transaction_count(), 2);

        assert!(matches!(
            ledger.transfer("ACC001", "ACC002", Decimal::ZERO, timeout),
            Err(Error::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_transfer_fails_closed_when_busy() {
        let ledger = create_test_ledger();
        let timeout = Duration::from_millis(20);
        let held = ledger.state.lock();

        thread::scope(|s| {
            s.spawn(|| {
                let err = ledger
                    .transfer("ACC001", "ACC002", Decimal::from(250), timeout)
                    .unwrap_err();
                assert!(matches!(err, Error::ResourceBusy(t) if t == timeout));
            });
        });

        drop(held);
        assert_eq!(ledger.balance(), initial());
        assert_eq!(ledger.transaction_count(), 0);
        assert_eq!(ledger.metrics().rejected("resource_busy"), 1);
    }

    #[test]
    fn test_snapshot() {
        let ledger = create_test_ledger();
        ledger.deposit("ACC001", Decimal::new(1025, 2)).unwrap();

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.instance_id, ledger.instance_id());
        assert_eq!(snapshot.balance, initial() + Decimal::new(1025, 2));
        assert_eq!(snapshot.transaction_count, 1);
    }

    #[test]
    fn test_try_new_rejects_negative_balance() {
        let config = LedgerConfig {
            initial_balance: Decimal::from(-1),
            ..LedgerConfig::default()
        };
        assert!(matches!(Ledger::try_new(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_custom_initial_balance() {
        let config = LedgerConfig {
            initial_balance: Decimal::from(10),
            ..LedgerConfig::default()
        };
        let ledger = Ledger::try_new(config).unwrap();

        assert!(!ledger.withdraw("ACC001", Decimal::from(11)).unwrap());
        assert!(ledger.withdraw("ACC001", Decimal::from(10)).unwrap());
        assert_eq!(ledger.balance(), Decimal::ZERO);
    }

    #[test]
    fn test_shared_instance_identity() {
        let first = get_instance();
        let second = get_instance();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.instance_id(), second.instance_id());
        assert!(matches!(
            init_global(LedgerConfig::default()),
            Err(Error::AlreadyInitialized)
        ));
    }
}
