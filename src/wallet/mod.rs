//! Wallet module providing merchant balance management with an append-only ledger.
//!
//! This module implements:
//! - Per-business, per-currency wallets with total, available, and held balances
//! - Append-only ledger entries with before/after balance snapshots
//! - Atomic credit/hold/release/debit/refund operations
//! - Optimistic concurrency with bounded retry on conflicting writers
//!
//! ## Example
//!
//! ```no_run
//! use merchant_ledger::db::MemoryStore;
//! use merchant_ledger::wallet::WalletManager;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let ledger = WalletManager::new(store);
//!
//!     // Credit a merchant wallet after a captured payment
//!     let wallet = ledger.get_or_create(42, "NGN").await?;
//!     let entry = ledger.credit(wallet.id, 5000, Some(1001), None, None).await?;
//!     println!("New balance after credit: {}", entry.balance_after);
//!
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{LedgerError, LedgerResult};
pub use manager::WalletManager;
pub use models::{
    Amount, BusinessId, EntryId, EntryType, NewWalletEntry, TransactionId, Wallet, WalletBalances,
    WalletEntry, WalletId,
};
