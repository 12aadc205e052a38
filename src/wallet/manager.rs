//! Ledger manager: the single write path for wallet balances.

use super::{
    errors::{LedgerError, LedgerResult},
    models::{
        Amount, BusinessId, EntryType, NewWalletEntry, TransactionId, Wallet, WalletBalances,
        WalletEntry, WalletId,
    },
};
use crate::db::repository::WalletStore;
use crate::withdrawal::models::WithdrawalId;
use std::sync::Arc;

/// Internal balance movement. Distinct from [`EntryType`] because settlement
/// debits consume available funds (after an in-commit release) while the
/// public debit operation consumes held funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Movement {
    Credit,
    Hold,
    Release,
    DebitHeld,
    DebitAvailable,
    Refund,
}

impl Movement {
    fn entry_type(self) -> EntryType {
        match self {
            Movement::Credit => EntryType::Credit,
            Movement::Hold => EntryType::Hold,
            Movement::Release => EntryType::Release,
            Movement::DebitHeld | Movement::DebitAvailable => EntryType::Debit,
            Movement::Refund => EntryType::Refund,
        }
    }
}

#[derive(Debug, Clone)]
struct LedgerOp {
    movement: Movement,
    amount: Amount,
    transaction_id: Option<TransactionId>,
    withdrawal_request_id: Option<WithdrawalId>,
    description: Option<String>,
    metadata: Option<serde_json::Value>,
}

impl LedgerOp {
    fn for_withdrawal(
        movement: Movement,
        amount: Amount,
        withdrawal_request_id: WithdrawalId,
        description: String,
    ) -> Self {
        Self {
            movement,
            amount,
            transaction_id: None,
            withdrawal_request_id: Some(withdrawal_request_id),
            description: Some(description),
            metadata: None,
        }
    }
}

/// Ledger manager
///
/// Every balance-affecting operation reads the wallet, computes new balances,
/// validates them, and persists the wallet state together with the ledger
/// entries as one atomic store commit. Commits are guarded by the wallet
/// version; a conflicting concurrent writer triggers a bounded retry.
pub struct WalletManager<S> {
    store: Arc<S>,
    max_retries: u32,
}

impl<S> Clone for WalletManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            max_retries: self.max_retries,
        }
    }
}

impl<S: WalletStore> WalletManager<S> {
    /// Create a new ledger manager
    ///
    /// # Arguments
    ///
    /// * `store` - Wallet persistence backend
    ///
    /// # Returns
    ///
    /// * `WalletManager` - New ledger manager instance
    pub fn new(store: Arc<S>) -> Self {
        let max_retries = std::env::var("LEDGER_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        Self { store, max_retries }
    }

    /// Get the wallet for a (business, currency) pair, creating it with zero
    /// balances on first reference. Creation is idempotent under concurrent
    /// first access; a losing creator reads the winner's row.
    pub async fn get_or_create(
        &self,
        business_id: BusinessId,
        currency: &str,
    ) -> LedgerResult<Wallet> {
        self.store.get_or_create(business_id, currency).await
    }

    /// Get a wallet by id
    pub async fn get_wallet(&self, wallet_id: WalletId) -> LedgerResult<Wallet> {
        self.store.wallet(wallet_id).await
    }

    /// Get ledger entries for a wallet, newest first
    ///
    /// # Arguments
    ///
    /// * `wallet_id` - Wallet ID
    /// * `limit` - Maximum number of entries to return
    pub async fn entries(&self, wallet_id: WalletId, limit: i64) -> LedgerResult<Vec<WalletEntry>> {
        self.store.entries(wallet_id, limit).await
    }

    /// Credit a wallet: `balance` and `available_balance` both increase.
    ///
    /// Called by the payment collaborator on successful capture.
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidAmount` - Amount is zero or negative
    /// * `LedgerError::BalanceOverflow` - Credit would overflow the balance
    pub async fn credit(
        &self,
        wallet_id: WalletId,
        amount: Amount,
        transaction_id: Option<TransactionId>,
        description: Option<String>,
        metadata: Option<serde_json::Value>,
    ) -> LedgerResult<WalletEntry> {
        self.apply_one(
            wallet_id,
            LedgerOp {
                movement: Movement::Credit,
                amount,
                transaction_id,
                withdrawal_request_id: None,
                description,
                metadata,
            },
        )
        .await
    }

    /// Reserve funds against a pending withdrawal: `available_balance` moves
    /// to `held_balance`, total unchanged.
    ///
    /// # Errors
    ///
    /// * `LedgerError::InsufficientFunds` - Available balance below `amount`
    pub async fn hold(
        &self,
        wallet_id: WalletId,
        amount: Amount,
        withdrawal_request_id: WithdrawalId,
    ) -> LedgerResult<WalletEntry> {
        self.apply_one(
            wallet_id,
            LedgerOp::for_withdrawal(
                Movement::Hold,
                amount,
                withdrawal_request_id,
                format!("Hold for withdrawal {withdrawal_request_id}"),
            ),
        )
        .await
    }

    /// Reverse a hold: `held_balance` moves back to `available_balance`.
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidState` - Held balance below `amount`; holds are
    ///   released at most once, so this indicates corrupted hold accounting
    pub async fn release(
        &self,
        wallet_id: WalletId,
        amount: Amount,
        withdrawal_request_id: WithdrawalId,
    ) -> LedgerResult<WalletEntry> {
        self.apply_one(
            wallet_id,
            LedgerOp::for_withdrawal(
                Movement::Release,
                amount,
                withdrawal_request_id,
                format!("Release hold for withdrawal {withdrawal_request_id}"),
            ),
        )
        .await
    }

    /// Debit held funds leaving the platform: `balance` and `held_balance`
    /// both decrease.
    ///
    /// # Errors
    ///
    /// * `LedgerError::InsufficientFunds` - Held balance below `amount`
    pub async fn debit(
        &self,
        wallet_id: WalletId,
        amount: Amount,
        withdrawal_request_id: WithdrawalId,
    ) -> LedgerResult<WalletEntry> {
        self.apply_one(
            wallet_id,
            LedgerOp::for_withdrawal(
                Movement::DebitHeld,
                amount,
                withdrawal_request_id,
                format!("Payout for withdrawal {withdrawal_request_id}"),
            ),
        )
        .await
    }

    /// Reverse a prior credit: `balance` and `available_balance` both
    /// decrease. Called by the payment collaborator on payment reversal.
    ///
    /// # Errors
    ///
    /// * `LedgerError::InsufficientFunds` - Available balance below `amount`
    pub async fn refund(
        &self,
        wallet_id: WalletId,
        amount: Amount,
        transaction_id: TransactionId,
    ) -> LedgerResult<WalletEntry> {
        self.apply_one(
            wallet_id,
            LedgerOp {
                movement: Movement::Refund,
                amount,
                transaction_id: Some(transaction_id),
                withdrawal_request_id: None,
                description: Some(format!("Refund of payment {transaction_id}")),
                metadata: None,
            },
        )
        .await
    }

    /// Settle a completed withdrawal: one atomic commit producing a release
    /// entry followed by a settlement debit entry. The wallet sees only the
    /// net effect: `balance` and `held_balance` down by `amount`,
    /// `available_balance` unchanged.
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidState` - Held balance below `amount`
    pub async fn settle(
        &self,
        wallet_id: WalletId,
        amount: Amount,
        withdrawal_request_id: WithdrawalId,
    ) -> LedgerResult<Vec<WalletEntry>> {
        self.apply(
            wallet_id,
            vec![
                LedgerOp::for_withdrawal(
                    Movement::Release,
                    amount,
                    withdrawal_request_id,
                    format!("Release hold for withdrawal {withdrawal_request_id}"),
                ),
                LedgerOp::for_withdrawal(
                    Movement::DebitAvailable,
                    amount,
                    withdrawal_request_id,
                    format!("Payout for withdrawal {withdrawal_request_id}"),
                ),
            ],
        )
        .await
    }

    async fn apply_one(&self, wallet_id: WalletId, op: LedgerOp) -> LedgerResult<WalletEntry> {
        let mut created = self.apply(wallet_id, vec![op]).await?;
        created
            .pop()
            .ok_or_else(|| LedgerError::InvalidState("commit returned no entries".to_string()))
    }

    /// Read-compute-validate-commit loop shared by every operation.
    async fn apply(&self, wallet_id: WalletId, ops: Vec<LedgerOp>) -> LedgerResult<Vec<WalletEntry>> {
        for op in &ops {
            if op.amount <= 0 {
                return Err(LedgerError::InvalidAmount(op.amount));
            }
        }

        let mut attempt = 0;
        loop {
            let wallet = self.store.wallet(wallet_id).await?;
            let (balances, entries) = plan(&wallet, &ops)?;

            match self
                .store
                .commit(wallet_id, wallet.version, balances, entries)
                .await
            {
                Ok(created) => return Ok(created),
                Err(LedgerError::Conflict) if attempt < self.max_retries => {
                    attempt += 1;
                    log::warn!(
                        "wallet {} commit conflict, retrying ({}/{})",
                        wallet_id,
                        attempt,
                        self.max_retries
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Compute the balance triple after applying `ops` in order, along with the
/// ledger entries recording each step. Pure; rejects before any mutation.
fn plan(
    wallet: &Wallet,
    ops: &[LedgerOp],
) -> LedgerResult<(WalletBalances, Vec<NewWalletEntry>)> {
    let mut balance = wallet.balance;
    let mut available = wallet.available_balance;
    let mut held = wallet.held_balance;
    let mut entries = Vec::with_capacity(ops.len());

    for op in ops {
        let amount = op.amount;
        let balance_before = balance;

        match op.movement {
            Movement::Credit => {
                balance = balance.checked_add(amount).ok_or(LedgerError::BalanceOverflow)?;
                available = available
                    .checked_add(amount)
                    .ok_or(LedgerError::BalanceOverflow)?;
            }
            Movement::Hold => {
                if available < amount {
                    return Err(LedgerError::InsufficientFunds {
                        available,
                        required: amount,
                    });
                }
                available -= amount;
                held = held.checked_add(amount).ok_or(LedgerError::BalanceOverflow)?;
            }
            Movement::Release => {
                if held < amount {
                    return Err(LedgerError::InvalidState(format!(
                        "release of {} exceeds held balance {} on wallet {}",
                        amount, held, wallet.id
                    )));
                }
                held -= amount;
                available = available
                    .checked_add(amount)
                    .ok_or(LedgerError::BalanceOverflow)?;
            }
            Movement::DebitHeld => {
                if held < amount {
                    return Err(LedgerError::InsufficientFunds {
                        available: held,
                        required: amount,
                    });
                }
                held -= amount;
                balance -= amount;
            }
            Movement::DebitAvailable => {
                if available < amount {
                    return Err(LedgerError::InvalidState(format!(
                        "settlement debit of {} exceeds available balance {} on wallet {}",
                        amount, available, wallet.id
                    )));
                }
                available -= amount;
                balance -= amount;
            }
            Movement::Refund => {
                if available < amount {
                    return Err(LedgerError::InsufficientFunds {
                        available,
                        required: amount,
                    });
                }
                available -= amount;
                balance -= amount;
            }
        }

        if balance < 0 || available < 0 || held < 0 {
            return Err(LedgerError::InvalidState(format!(
                "negative balance computed for wallet {}: {}/{}/{}",
                wallet.id, balance, available, held
            )));
        }

        entries.push(NewWalletEntry {
            wallet_id: wallet.id,
            business_id: wallet.business_id,
            transaction_id: op.transaction_id,
            withdrawal_request_id: op.withdrawal_request_id,
            entry_type: op.movement.entry_type(),
            amount,
            currency: wallet.currency.clone(),
            balance_before,
            balance_after: balance,
            description: op.description.clone(),
            metadata: op.metadata.clone(),
        });
    }

    Ok((
        WalletBalances {
            balance,
            available_balance: available,
            held_balance: held,
        },
        entries,
    ))
}
