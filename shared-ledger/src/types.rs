//! Core types for the ledger
//!
//! Money is always `Decimal`: exact fixed-point arithmetic, no float drift
//! across hundreds of thousands of operations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Starting balance of a freshly constructed ledger (1,000,000.00)
pub const DEFAULT_INITIAL_BALANCE: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 2);

/// Point-in-time view of the ledger
///
/// `balance` and `transaction_count` are read under one lock acquisition,
/// so they always describe the same prefix of applied operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Ledger the snapshot was taken from
    pub instance_id: Uuid,

    /// Aggregate balance
    pub balance: Decimal,

    /// Number of accepted operations
    pub transaction_count: u64,

    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
}
