//! Wallet data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Business ID type
pub type BusinessId = i64;

/// Wallet ID type
pub type WalletId = i64;

/// Ledger entry ID type
pub type EntryId = i64;

/// Payment transaction ID type
pub type TransactionId = i64;

/// Monetary amount in minor currency units (kobo, cents)
pub type Amount = i64;

/// Wallet model: per-business, per-currency balance aggregate.
///
/// Invariant: `balance == available_balance + held_balance`, all three
/// non-negative. Balances change only through ledger entry application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub business_id: BusinessId,
    pub currency: String,
    pub balance: Amount,
    pub available_balance: Amount,
    pub held_balance: Amount,
    /// Optimistic-concurrency counter, bumped on every committed mutation.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New balance triple computed by the ledger manager, persisted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletBalances {
    pub balance: Amount,
    pub available_balance: Amount,
    pub held_balance: Amount,
}

/// Ledger entry model (append-only audit record)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletEntry {
    pub id: EntryId,
    pub wallet_id: WalletId,
    pub business_id: BusinessId,
    pub transaction_id: Option<TransactionId>,
    pub withdrawal_request_id: Option<i64>,
    pub entry_type: EntryType,
    pub amount: Amount,
    pub currency: String,
    pub balance_before: Amount,
    pub balance_after: Amount,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Ledger entry awaiting persistence (id and timestamp are store-assigned)
#[derive(Debug, Clone)]
pub struct NewWalletEntry {
    pub wallet_id: WalletId,
    pub business_id: BusinessId,
    pub transaction_id: Option<TransactionId>,
    pub withdrawal_request_id: Option<i64>,
    pub entry_type: EntryType,
    pub amount: Amount,
    pub currency: String,
    pub balance_before: Amount,
    pub balance_after: Amount,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Ledger entry type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Credit,
    Debit,
    Hold,
    Release,
    Refund,
}

impl EntryType {
    /// Parse the stored string form back into a variant.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "credit" => Some(EntryType::Credit),
            "debit" => Some(EntryType::Debit),
            "hold" => Some(EntryType::Hold),
            "release" => Some(EntryType::Release),
            "refund" => Some(EntryType::Refund),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryType::Credit => write!(f, "credit"),
            EntryType::Debit => write!(f, "debit"),
            EntryType::Hold => write!(f, "hold"),
            EntryType::Release => write!(f, "release"),
            EntryType::Refund => write!(f, "refund"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EntryType;

    #[test]
    fn entry_type_round_trips_through_stored_form() {
        for kind in [
            EntryType::Credit,
            EntryType::Debit,
            EntryType::Hold,
            EntryType::Release,
            EntryType::Refund,
        ] {
            assert_eq!(EntryType::parse(&kind.to_string()), Some(kind));
        }
        assert_eq!(EntryType::parse("chargeback"), None);
    }
}
