//! # Merchant Ledger
//!
//! Wallet ledger and withdrawal lifecycle for a multi-tenant booking platform.
//!
//! Businesses accumulate funds from customer payments in per-currency wallets
//! and pay them out to bank accounts through withdrawal requests. This crate
//! is the money-movement core between those two surfaces: an append-only
//! ledger over wallet balances, and the payout state machine that consumes
//! held funds.
//!
//! ## Architecture
//!
//! Every wallet carries three balances bound by one invariant:
//!
//! ```text
//! balance == available_balance + held_balance
//! ```
//!
//! Balances change only through ledger entries, each recording before/after
//! snapshots of the total balance:
//!
//! - **credit**: payment captured; total and available rise
//! - **hold**: withdrawal requested; available moves to held
//! - **release**: withdrawal failed or cancelled; held moves back
//! - **debit**: payout confirmed; total and held fall
//! - **refund**: payment reversed; total and available fall
//!
//! Withdrawal requests move through `pending -> processing -> completed |
//! failed`, with business-initiated cancellation from `pending`. Each
//! transition is claimed with a compare-and-swap on the stored status, and
//! each ledger commit is guarded by a wallet version counter, so concurrent
//! callers serialize per wallet without cross-wallet coordination.
//!
//! ## Core Modules
//!
//! - [`wallet`]: wallet aggregate, ledger entries, and the ledger manager
//! - [`withdrawal`]: withdrawal request state machine and manager
//! - [`db`]: store traits with PostgreSQL and in-memory implementations
//! - [`currency`]: display formatting for minor-unit amounts
//!
//! ## Example
//!
//! ```no_run
//! use merchant_ledger::{MemoryStore, WalletManager, WithdrawalManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let ledger = WalletManager::new(store.clone());
//!     let withdrawals = WithdrawalManager::new(ledger.clone(), store);
//!
//!     let wallet = ledger.get_or_create(42, "NGN").await?;
//!     ledger.credit(wallet.id, 500_000, Some(1001), None, None).await?;
//!
//!     let request = withdrawals.request(42, "NGN", 200_000, Some(7)).await?;
//!     println!("requested payout {}", request.id);
//!
//!     Ok(())
//! }
//! ```

/// Display formatting for minor-unit amounts.
pub mod currency;
pub use currency::CurrencyFormatter;

/// Store traits and their PostgreSQL and in-memory implementations.
pub mod db;
pub use db::{Database, DatabaseConfig, MemoryStore, PgWalletStore, PgWithdrawalStore};

/// Wallet aggregate, ledger entries, and the ledger manager.
pub mod wallet;
pub use wallet::{
    Amount, BusinessId, EntryType, LedgerError, LedgerResult, Wallet, WalletEntry, WalletManager,
};

/// Withdrawal request state machine and manager.
pub mod withdrawal;
pub use withdrawal::{
    BankAccount, WithdrawalError, WithdrawalManager, WithdrawalRequest, WithdrawalResult,
    WithdrawalStatus,
};
