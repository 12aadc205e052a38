//! Repository trait definitions for testability and dependency injection.
//!
//! This module provides trait-based abstractions over wallet and withdrawal
//! persistence, with PostgreSQL implementations. Expected tables:
//!
//! - `wallets(id, business_id, currency, balance, available_balance,
//!   held_balance, version, created_at, updated_at)` unique on
//!   `(business_id, currency)`
//! - `wallet_transactions(id, wallet_id, business_id, transaction_id,
//!   withdrawal_request_id, entry_type, amount, currency, balance_before,
//!   balance_after, description, metadata, created_at)`
//! - `withdrawal_requests(id, business_id, wallet_id, bank_account_id,
//!   amount, currency, status, transfer_code, transfer_reference,
//!   failure_reason, processed_at, processed_by, created_at, updated_at)`

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::wallet::{
    errors::{LedgerError, LedgerResult},
    models::{
        BusinessId, EntryType, NewWalletEntry, Wallet, WalletBalances, WalletEntry, WalletId,
    },
};
use crate::withdrawal::{
    errors::{WithdrawalError, WithdrawalResult},
    models::{NewWithdrawalRequest, WithdrawalId, WithdrawalRequest, WithdrawalStatus},
};

/// Trait for wallet and ledger entry persistence
///
/// `commit` is the single mutation seam: it persists a new balance triple
/// and appends the recording entries as one atomic unit, guarded by the
/// wallet version. A stale version yields `LedgerError::Conflict` and no
/// mutation.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Get the wallet for a (business, currency) pair, creating it with zero
    /// balances if absent. Must be idempotent under concurrent first access.
    async fn get_or_create(&self, business_id: BusinessId, currency: &str) -> LedgerResult<Wallet>;

    /// Get a wallet by id
    async fn wallet(&self, wallet_id: WalletId) -> LedgerResult<Wallet>;

    /// Atomically persist new balances and append ledger entries
    async fn commit(
        &self,
        wallet_id: WalletId,
        expected_version: i64,
        balances: WalletBalances,
        entries: Vec<NewWalletEntry>,
    ) -> LedgerResult<Vec<WalletEntry>>;

    /// Get ledger entries for a wallet, newest first
    async fn entries(&self, wallet_id: WalletId, limit: i64) -> LedgerResult<Vec<WalletEntry>>;
}

/// Trait for withdrawal request persistence
#[async_trait]
pub trait WithdrawalStore: Send + Sync {
    /// Persist a new request in `pending`
    async fn create(&self, new: NewWithdrawalRequest) -> WithdrawalResult<WithdrawalRequest>;

    /// Get a request by id
    async fn get(&self, id: WithdrawalId) -> WithdrawalResult<WithdrawalRequest>;

    /// Persist `request`, guarded on the stored status still being
    /// `expected`. A lost guard yields `WithdrawalError::Conflict` and no
    /// mutation.
    async fn transition(
        &self,
        request: &WithdrawalRequest,
        expected: WithdrawalStatus,
    ) -> WithdrawalResult<()>;

    /// Remove a request that never held funds
    async fn delete(&self, id: WithdrawalId) -> WithdrawalResult<()>;

    /// List requests for a business, newest first
    async fn list_for_business(
        &self,
        business_id: BusinessId,
        limit: i64,
    ) -> WithdrawalResult<Vec<WithdrawalRequest>>;
}

/// Default PostgreSQL implementation of `WalletStore`
pub struct PgWalletStore {
    pool: PgPool,
}

impl PgWalletStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn wallet_from_row(row: &PgRow) -> Wallet {
    Wallet {
        id: row.get("id"),
        business_id: row.get("business_id"),
        currency: row.get("currency"),
        balance: row.get("balance"),
        available_balance: row.get("available_balance"),
        held_balance: row.get("held_balance"),
        version: row.get("version"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
    }
}

fn entry_from_row(row: &PgRow) -> LedgerResult<WalletEntry> {
    let stored_type: String = row.get("entry_type");
    let entry_type = EntryType::parse(&stored_type).ok_or_else(|| {
        LedgerError::InvalidState(format!("unknown entry type {stored_type:?} in ledger"))
    })?;

    Ok(WalletEntry {
        id: row.get("id"),
        wallet_id: row.get("wallet_id"),
        business_id: row.get("business_id"),
        transaction_id: row.get("transaction_id"),
        withdrawal_request_id: row.get("withdrawal_request_id"),
        entry_type,
        amount: row.get("amount"),
        currency: row.get("currency"),
        balance_before: row.get("balance_before"),
        balance_after: row.get("balance_after"),
        description: row.get("description"),
        metadata: row.get("metadata"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    })
}

const WALLET_COLUMNS: &str = "id, business_id, currency, balance, available_balance, held_balance, \
     version, created_at, updated_at";

const ENTRY_COLUMNS: &str = "id, wallet_id, business_id, transaction_id, withdrawal_request_id, \
     entry_type, amount, currency, balance_before, balance_after, description, metadata, created_at";

#[async_trait]
impl WalletStore for PgWalletStore {
    async fn get_or_create(&self, business_id: BusinessId, currency: &str) -> LedgerResult<Wallet> {
        // The unique (business_id, currency) constraint is the source of
        // truth; a losing concurrent creator falls through to the select.
        sqlx::query(
            "INSERT INTO wallets (business_id, currency)
             VALUES ($1, $2)
             ON CONFLICT (business_id, currency) DO NOTHING",
        )
        .bind(business_id)
        .bind(currency)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE business_id = $1 AND currency = $2"
        ))
        .bind(business_id)
        .bind(currency)
        .fetch_one(&self.pool)
        .await?;

        Ok(wallet_from_row(&row))
    }

    async fn wallet(&self, wallet_id: WalletId) -> LedgerResult<Wallet> {
        let row = sqlx::query(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE id = $1"
        ))
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(LedgerError::WalletNotFound(wallet_id))?;

        Ok(wallet_from_row(&row))
    }

    async fn commit(
        &self,
        wallet_id: WalletId,
        expected_version: i64,
        balances: WalletBalances,
        entries: Vec<NewWalletEntry>,
    ) -> LedgerResult<Vec<WalletEntry>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE wallets
             SET balance = $1, available_balance = $2, held_balance = $3,
                 version = version + 1, updated_at = NOW()
             WHERE id = $4 AND version = $5",
        )
        .bind(balances.balance)
        .bind(balances.available_balance)
        .bind(balances.held_balance)
        .bind(wallet_id)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Distinguish a stale version from a missing wallet
            let exists = sqlx::query("SELECT id FROM wallets WHERE id = $1")
                .bind(wallet_id)
                .fetch_optional(&mut *tx)
                .await?;

            return Err(match exists {
                Some(_) => LedgerError::Conflict,
                None => LedgerError::WalletNotFound(wallet_id),
            });
        }

        let mut created = Vec::with_capacity(entries.len());
        for entry in entries {
            let row = sqlx::query(
                "INSERT INTO wallet_transactions
                     (wallet_id, business_id, transaction_id, withdrawal_request_id,
                      entry_type, amount, currency, balance_before, balance_after,
                      description, metadata)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                 RETURNING id, created_at",
            )
            .bind(entry.wallet_id)
            .bind(entry.business_id)
            .bind(entry.transaction_id)
            .bind(entry.withdrawal_request_id)
            .bind(entry.entry_type.to_string())
            .bind(entry.amount)
            .bind(&entry.currency)
            .bind(entry.balance_before)
            .bind(entry.balance_after)
            .bind(&entry.description)
            .bind(&entry.metadata)
            .fetch_one(&mut *tx)
            .await?;

            created.push(WalletEntry {
                id: row.get("id"),
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
                created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            });
        }

        tx.commit().await?;

        Ok(created)
    }

    async fn entries(&self, wallet_id: WalletId, limit: i64) -> LedgerResult<Vec<WalletEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM wallet_transactions
             WHERE wallet_id = $1
             ORDER BY id DESC
             LIMIT $2"
        ))
        .bind(wallet_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }
}

/// Default PostgreSQL implementation of `WithdrawalStore`
pub struct PgWithdrawalStore {
    pool: PgPool,
}

impl PgWithdrawalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const WITHDRAWAL_COLUMNS: &str = "id, business_id, wallet_id, bank_account_id, amount, currency, \
     status, transfer_code, transfer_reference, failure_reason, processed_at, processed_by, \
     created_at, updated_at";

fn withdrawal_from_row(row: &PgRow) -> WithdrawalResult<WithdrawalRequest> {
    let stored_status: String = row.get("status");
    let status = WithdrawalStatus::parse(&stored_status).ok_or_else(|| {
        WithdrawalError::Ledger(LedgerError::InvalidState(format!(
            "unknown withdrawal status {stored_status:?}"
        )))
    })?;

    Ok(WithdrawalRequest {
        id: row.get("id"),
        business_id: row.get("business_id"),
        wallet_id: row.get("wallet_id"),
        bank_account_id: row.get("bank_account_id"),
        amount: row.get("amount"),
        currency: row.get("currency"),
        status,
        transfer_code: row.get("transfer_code"),
        transfer_reference: row.get("transfer_reference"),
        failure_reason: row.get("failure_reason"),
        processed_at: row
            .get::<Option<chrono::NaiveDateTime>, _>("processed_at")
            .map(|dt| dt.and_utc()),
        processed_by: row.get("processed_by"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
    })
}

#[async_trait]
impl WithdrawalStore for PgWithdrawalStore {
    async fn create(&self, new: NewWithdrawalRequest) -> WithdrawalResult<WithdrawalRequest> {
        let row = sqlx::query(&format!(
            "INSERT INTO withdrawal_requests
                 (business_id, wallet_id, bank_account_id, amount, currency, status)
             VALUES ($1, $2, $3, $4, $5, 'pending')
             RETURNING {WITHDRAWAL_COLUMNS}"
        ))
        .bind(new.business_id)
        .bind(new.wallet_id)
        .bind(new.bank_account_id)
        .bind(new.amount)
        .bind(&new.currency)
        .fetch_one(&self.pool)
        .await?;

        withdrawal_from_row(&row)
    }

    async fn get(&self, id: WithdrawalId) -> WithdrawalResult<WithdrawalRequest> {
        let row = sqlx::query(&format!(
            "SELECT {WITHDRAWAL_COLUMNS} FROM withdrawal_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(WithdrawalError::NotFound(id))?;

        withdrawal_from_row(&row)
    }

    async fn transition(
        &self,
        request: &WithdrawalRequest,
        expected: WithdrawalStatus,
    ) -> WithdrawalResult<()> {
        let updated = sqlx::query(
            "UPDATE withdrawal_requests
             SET status = $1, transfer_code = $2, transfer_reference = $3,
                 failure_reason = $4, processed_at = $5, processed_by = $6,
                 updated_at = NOW()
             WHERE id = $7 AND status = $8",
        )
        .bind(request.status.to_string())
        .bind(&request.transfer_code)
        .bind(&request.transfer_reference)
        .bind(&request.failure_reason)
        .bind(request.processed_at.map(|dt| dt.naive_utc()))
        .bind(request.processed_by)
        .bind(request.id)
        .bind(expected.to_string())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            let exists = sqlx::query("SELECT id FROM withdrawal_requests WHERE id = $1")
                .bind(request.id)
                .fetch_optional(&self.pool)
                .await?;

            return Err(match exists {
                Some(_) => WithdrawalError::Conflict,
                None => WithdrawalError::NotFound(request.id),
            });
        }

        Ok(())
    }

    async fn delete(&self, id: WithdrawalId) -> WithdrawalResult<()> {
        sqlx::query("DELETE FROM withdrawal_requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_for_business(
        &self,
        business_id: BusinessId,
        limit: i64,
    ) -> WithdrawalResult<Vec<WithdrawalRequest>> {
        let rows = sqlx::query(&format!(
            "SELECT {WITHDRAWAL_COLUMNS} FROM withdrawal_requests
             WHERE business_id = $1
             ORDER BY id DESC
             LIMIT $2"
        ))
        .bind(business_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(withdrawal_from_row).collect()
    }
}
