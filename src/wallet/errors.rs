//! Ledger error types.

use thiserror::Error;

use super::models::{Amount, WalletId};

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid amount (must be positive)
    #[error("Invalid amount: {0}")]
    InvalidAmount(Amount),

    /// Insufficient funds in the relevant balance pool
    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: Amount, required: Amount },

    /// Ledger inconsistency (releasing more than held, corrupt stored data)
    #[error("Ledger inconsistency: {0}")]
    InvalidState(String),

    /// Wallet not found
    #[error("Wallet not found: {0}")]
    WalletNotFound(WalletId),

    /// Concurrent update conflict (wallet version moved under us)
    #[error("Wallet update conflict")]
    Conflict,

    /// Balance arithmetic overflow
    #[error("Balance overflow")]
    BalanceOverflow,
}

impl LedgerError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database and internal-consistency errors are sanitized so storage
    /// detail and wallet identifiers never reach user-facing surfaces.
    pub fn client_message(&self) -> String {
        match self {
            LedgerError::Database(_) => "Internal server error".to_string(),
            LedgerError::InvalidState(_) => "Internal server error".to_string(),
            LedgerError::WalletNotFound(_) => "Wallet not found".to_string(),
            LedgerError::Conflict => "Wallet is busy, please retry".to_string(),
            LedgerError::InsufficientFunds { .. } => "Insufficient available balance".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
