//! In-memory store implementation.
//!
//! Backs the ledger and withdrawal managers without a database, with the
//! same version/status compare-and-swap semantics as the PostgreSQL stores.
//! Used by the crate's tests and suitable for lightweight embedding.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use super::repository::{WalletStore, WithdrawalStore};
use crate::wallet::{
    errors::{LedgerError, LedgerResult},
    models::{
        BusinessId, EntryId, NewWalletEntry, Wallet, WalletBalances, WalletEntry, WalletId,
    },
};
use crate::withdrawal::{
    errors::{WithdrawalError, WithdrawalResult},
    models::{NewWithdrawalRequest, WithdrawalId, WithdrawalRequest, WithdrawalStatus},
};

struct State {
    wallets: HashMap<WalletId, Wallet>,
    wallet_index: HashMap<(BusinessId, String), WalletId>,
    entries: Vec<WalletEntry>,
    withdrawals: HashMap<WithdrawalId, WithdrawalRequest>,
    next_wallet_id: WalletId,
    next_entry_id: EntryId,
    next_withdrawal_id: WithdrawalId,
}

impl State {
    fn new() -> Self {
        Self {
            wallets: HashMap::new(),
            wallet_index: HashMap::new(),
            entries: Vec::new(),
            withdrawals: HashMap::new(),
            next_wallet_id: 1,
            next_entry_id: 1,
            next_withdrawal_id: 1,
        }
    }
}

/// In-memory implementation of both store traits
pub struct MemoryStore {
    inner: Mutex<State>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(State::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicked holder cannot leave a half-applied commit: every
        // mutation below is completed before the guard is dropped.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn get_or_create(&self, business_id: BusinessId, currency: &str) -> LedgerResult<Wallet> {
        let mut state = self.state();

        let key = (business_id, currency.to_string());
        if let Some(&id) = state.wallet_index.get(&key) {
            return state.wallets.get(&id).cloned().ok_or_else(|| {
                LedgerError::InvalidState(format!("wallet index points at missing wallet {id}"))
            });
        }

        let now = Utc::now();
        let wallet = Wallet {
            id: state.next_wallet_id,
            business_id,
            currency: currency.to_string(),
            balance: 0,
            available_balance: 0,
            held_balance: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        state.next_wallet_id += 1;
        state.wallet_index.insert(key, wallet.id);
        state.wallets.insert(wallet.id, wallet.clone());

        Ok(wallet)
    }

    async fn wallet(&self, wallet_id: WalletId) -> LedgerResult<Wallet> {
        self.state()
            .wallets
            .get(&wallet_id)
            .cloned()
            .ok_or(LedgerError::WalletNotFound(wallet_id))
    }

    async fn commit(
        &self,
        wallet_id: WalletId,
        expected_version: i64,
        balances: WalletBalances,
        entries: Vec<NewWalletEntry>,
    ) -> LedgerResult<Vec<WalletEntry>> {
        let mut state = self.state();

        let wallet = state
            .wallets
            .get_mut(&wallet_id)
            .ok_or(LedgerError::WalletNotFound(wallet_id))?;

        if wallet.version != expected_version {
            return Err(LedgerError::Conflict);
        }

        let now = Utc::now();
        wallet.balance = balances.balance;
        wallet.available_balance = balances.available_balance;
        wallet.held_balance = balances.held_balance;
        wallet.version += 1;
        wallet.updated_at = now;

        let mut created = Vec::with_capacity(entries.len());
        for entry in entries {
            let persisted = WalletEntry {
                id: state.next_entry_id,
                wallet_id: entry.wallet_id,
                business_id: entry.business_id,
                transaction_id: entry.transaction_id,
                withdrawal_request_id: entry.withdrawal_request_id,
                entry_type: entry.entry_type,
                amount: entry.amount,
                currency: entry.currency,
                balance_before: entry.balance_before,
                balance_after: entry.balance_after,
                description: entry.description,
                metadata: entry.metadata,
                created_at: now,
            };
            state.next_entry_id += 1;
            state.entries.push(persisted.clone());
            created.push(persisted);
        }

        Ok(created)
    }

    async fn entries(&self, wallet_id: WalletId, limit: i64) -> LedgerResult<Vec<WalletEntry>> {
        let state = self.state();
        let limit = usize::try_from(limit).unwrap_or(0);

        Ok(state
            .entries
            .iter()
            .filter(|e| e.wallet_id == wallet_id)
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl WithdrawalStore for MemoryStore {
    async fn create(&self, new: NewWithdrawalRequest) -> WithdrawalResult<WithdrawalRequest> {
        let mut state = self.state();

        let now = Utc::now();
        let request = WithdrawalRequest {
            id: state.next_withdrawal_id,
            business_id: new.business_id,
            wallet_id: new.wallet_id,
            bank_account_id: new.bank_account_id,
            amount: new.amount,
            currency: new.currency,
            status: WithdrawalStatus::Pending,
            transfer_code: None,
            transfer_reference: None,
            failure_reason: None,
            processed_at: None,
            processed_by: None,
            created_at: now,
            updated_at: now,
        };
        state.next_withdrawal_id += 1;
        state.withdrawals.insert(request.id, request.clone());

        Ok(request)
    }

    async fn get(&self, id: WithdrawalId) -> WithdrawalResult<WithdrawalRequest> {
        self.state()
            .withdrawals
            .get(&id)
            .cloned()
            .ok_or(WithdrawalError::NotFound(id))
    }

    async fn transition(
        &self,
        request: &WithdrawalRequest,
        expected: WithdrawalStatus,
    ) -> WithdrawalResult<()> {
        let mut state = self.state();

        let stored = state
            .withdrawals
            .get_mut(&request.id)
            .ok_or(WithdrawalError::NotFound(request.id))?;

        if stored.status != expected {
            return Err(WithdrawalError::Conflict);
        }

        *stored = request.clone();
        stored.updated_at = Utc::now();

        Ok(())
    }

    async fn delete(&self, id: WithdrawalId) -> WithdrawalResult<()> {
        self.state().withdrawals.remove(&id);
        Ok(())
    }

    async fn list_for_business(
        &self,
        business_id: BusinessId,
        limit: i64,
    ) -> WithdrawalResult<Vec<WithdrawalRequest>> {
        let state = self.state();
        let limit = usize::try_from(limit).unwrap_or(0);

        let mut requests: Vec<WithdrawalRequest> = state
            .withdrawals
            .values()
            .filter(|r| r.business_id == business_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.id.cmp(&a.id));
        requests.truncate(limit);

        Ok(requests)
    }
}
