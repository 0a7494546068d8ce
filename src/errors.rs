//! Unified error type for the credit ledger.
//!
//! Every facade operation returns [`Result`], so callers can tell "no data"
//! (`Ok(None)`, empty vectors) apart from a failed operation.

use thiserror::Error;

/// Errors produced by the ledger, its persistence layer and its configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Underlying store read/write failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Referenced credit does not exist
    #[error("Credit {id} not found")]
    CreditNotFound {
        /// Requested credit id
        id: i64,
    },

    /// Referenced payment does not exist
    #[error("Payment {id} not found")]
    PaymentNotFound {
        /// Requested payment id
        id: i64,
    },

    /// Scheduler trigger called without the shared secret
    #[error("Unauthorized")]
    Unauthorized,

    /// Amount is zero, negative or overflows the currency range
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// Offending amount in currency units
        amount: i64,
    },

    /// Malformed input that is not an amount
    #[error("Validation error: {message}")]
    Validation {
        /// Which field failed and why
        message: String,
    },

    /// Capital payment exceeds the outstanding balance
    #[error("Overpayment: balance is {balance}, attempted to pay {amount}")]
    Overpayment {
        /// Outstanding balance before the payment
        balance: i64,
        /// Requested capital payment
        amount: i64,
    },

    /// Payment attempted on a credit that is already paid off
    #[error("Credit {id} is already completed")]
    CreditCompleted {
        /// Completed credit id
        id: i64,
    },

    /// Accrual-eligible credit has no start date
    #[error("Credit {id} has no start date")]
    MissingStartDate {
        /// Credit id
        id: i64,
    },

    /// Credit changed between read and write
    #[error("Credit {id} was modified concurrently")]
    ConcurrentModification {
        /// Credit id
        id: i64,
    },

    /// I/O failure (config file, socket)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error means the referenced record does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CreditNotFound { .. } | Self::PaymentNotFound { .. }
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
