//! Error types for the shared ledger

use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// Insufficient funds is not an error: `withdraw` reports it as `Ok(false)`.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller supplied a zero or negative amount
    #[error("Invalid amount: {0} (must be positive)")]
    InvalidAmount(Decimal),

    /// Deposit would push the balance past `Decimal::MAX`
    #[error("Overflow: depositing {0} would exceed the maximum balance")]
    Overflow(Decimal),

    /// Ledger lock could not be acquired within the allowed wait
    #[error("Resource busy: could not acquire ledger lock within {0:?}")]
    ResourceBusy(Duration),

    /// Shared ledger was already constructed
    #[error("Shared ledger already initialized")]
    AlreadyInitialized,

    /// Instance construction failed
    #[error("Construction failed: {0}")]
    Construction(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short machine-readable reason, used as a metrics label
    pub fn reason(&self) -> &'static str {
        match self {
            Error::InvalidAmount(_) => "invalid_amount",
            Error::Overflow(_) => "overflow",
            Error::ResourceBusy(_) => "resource_busy",
            Error::AlreadyInitialized => "already_initialized",
            Error::Construction(_) => "construction",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
        }
    }
}
