//! Shared Ledger
//!
//! Process-wide aggregate ledger, built once on first access and mutated
//! concurrently through atomic deposits and withdrawals.
//!
//! # Architecture
//!
//! - **Instance Registry**: double-checked, exactly-once construction
//! - **Single Lock**: one mutex guards balance and transaction count together
//! - **Exact Money**: `Decimal` amounts, no float drift
//!
//! # Invariants
//!
//! - Balance == initial + Σ(accepted deposits) − Σ(accepted withdrawals)
//! - Transaction count grows by exactly one per accepted operation
//! - Withdrawals never overdraw the balance
//! - Every `get_instance()` call returns the same ledger

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod registry;
pub mod types;

// Re-exports
pub use config::{DemoConfig, LedgerConfig};
pub use error::{Error, Result};
pub use ledger::{get_instance, init_global, Ledger};
pub use registry::InstanceRegistry;
pub use types::{LedgerSnapshot, DEFAULT_INITIAL_BALANCE};
