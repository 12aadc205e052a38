//! Withdrawal module providing the payout request lifecycle.
//!
//! This module implements:
//! - Withdrawal requests tracked through `pending -> processing -> completed | failed`
//!   with business-initiated cancellation from `pending`
//! - Compare-and-swap transition claims so racing callers cannot double-apply
//!   a funds movement
//! - Hold on request, release on failure/cancellation, settlement on completion
//! - Pure presentation helpers (status labels, badge classes, masked accounts)

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{WithdrawalError, WithdrawalResult};
pub use manager::WithdrawalManager;
pub use models::{
    ActorId, BankAccount, BankAccountId, NewWithdrawalRequest, WithdrawalId, WithdrawalRequest,
    WithdrawalStatus,
};
