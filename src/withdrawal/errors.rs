//! Withdrawal error types.

use thiserror::Error;

use super::models::{WithdrawalId, WithdrawalStatus};
use crate::wallet::errors::LedgerError;

/// Withdrawal errors
#[derive(Debug, Error)]
pub enum WithdrawalError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Underlying ledger operation failed
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Withdrawal request not found
    #[error("Withdrawal request not found: {0}")]
    NotFound(WithdrawalId),

    /// Status change not permitted by the lifecycle state machine
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: WithdrawalStatus,
        to: WithdrawalStatus,
    },

    /// The stored status moved while a transition was being claimed
    #[error("Withdrawal request update conflict")]
    Conflict,
}

impl WithdrawalError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            WithdrawalError::Database(_) => "Internal server error".to_string(),
            WithdrawalError::NotFound(_) => "Withdrawal request not found".to_string(),
            WithdrawalError::Conflict => "Withdrawal request is busy, please retry".to_string(),
            WithdrawalError::Ledger(e) => e.client_message(),
            WithdrawalError::InvalidTransition { .. } => self.to_string(),
        }
    }
}

/// Result type for withdrawal operations
pub type WithdrawalResult<T> = Result<T, WithdrawalError>;
