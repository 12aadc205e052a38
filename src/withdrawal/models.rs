//! Withdrawal request data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::currency::CurrencyFormatter;
use crate::wallet::models::{Amount, BusinessId, WalletId};

/// Withdrawal request ID type
pub type WithdrawalId = i64;

/// Bank account ID type
pub type BankAccountId = i64;

/// Processing actor ID type (admin or system worker)
pub type ActorId = i64;

/// Withdrawal request lifecycle state
///
/// ```text
/// pending -> processing -> completed
///    |            \-> failed
///    \-> cancelled
/// ```
///
/// `completed`, `failed`, and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    /// Awaiting submission to the payout provider; funds held
    Pending,
    /// Submitted to the payout provider
    Processing,
    /// Provider confirmed the transfer; funds debited
    Completed,
    /// Provider reported failure; funds released
    Failed,
    /// Withdrawn by the business before submission; funds released
    Cancelled,
}

impl WithdrawalStatus {
    /// Whether `next` is a legal state-machine move from `self`.
    pub fn can_transition_to(self, next: WithdrawalStatus) -> bool {
        use WithdrawalStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Pending, Cancelled) | (Processing, Completed) | (Processing, Failed)
        )
    }

    /// Whether this state absorbs all further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WithdrawalStatus::Completed | WithdrawalStatus::Failed | WithdrawalStatus::Cancelled
        )
    }

    /// Fixed display label for presentation collaborators.
    pub fn label(self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "Pending",
            WithdrawalStatus::Processing => "Processing",
            WithdrawalStatus::Completed => "Completed",
            WithdrawalStatus::Failed => "Failed",
            WithdrawalStatus::Cancelled => "Cancelled",
        }
    }

    /// Fixed badge style classification for presentation collaborators.
    pub fn badge_class(self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "warning",
            WithdrawalStatus::Processing => "info",
            WithdrawalStatus::Completed => "success",
            WithdrawalStatus::Failed => "danger",
            WithdrawalStatus::Cancelled => "secondary",
        }
    }

    /// Parse the stored string form back into a variant.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(WithdrawalStatus::Pending),
            "processing" => Some(WithdrawalStatus::Processing),
            "completed" => Some(WithdrawalStatus::Completed),
            "failed" => Some(WithdrawalStatus::Failed),
            "cancelled" => Some(WithdrawalStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "pending"),
            WithdrawalStatus::Processing => write!(f, "processing"),
            WithdrawalStatus::Completed => write!(f, "completed"),
            WithdrawalStatus::Failed => write!(f, "failed"),
            WithdrawalStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Withdrawal request model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: WithdrawalId,
    pub business_id: BusinessId,
    pub wallet_id: WalletId,
    /// May be unset until the payout destination is confirmed
    pub bank_account_id: Option<BankAccountId>,
    pub amount: Amount,
    pub currency: String,
    pub status: WithdrawalStatus,
    /// Provider transfer code, recorded on submission
    pub transfer_code: Option<String>,
    /// Provider transfer reference, recorded on submission
    pub transfer_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<ActorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WithdrawalRequest {
    /// A request can be cancelled by the business only while pending.
    pub fn can_be_cancelled(&self) -> bool {
        self.status == WithdrawalStatus::Pending
    }

    /// Amount rendered for display, e.g. `₦1,250.00`.
    pub fn formatted_amount(&self, formatter: &CurrencyFormatter) -> String {
        formatter.format(self.amount, &self.currency)
    }
}

/// Withdrawal request awaiting persistence
#[derive(Debug, Clone)]
pub struct NewWithdrawalRequest {
    pub business_id: BusinessId,
    pub wallet_id: WalletId,
    pub bank_account_id: Option<BankAccountId>,
    pub amount: Amount,
    pub currency: String,
}

/// Verified payout destination. Referenced, never mutated, by withdrawal
/// requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: BankAccountId,
    pub business_id: BusinessId,
    pub bank_name: String,
    pub bank_code: String,
    pub account_name: String,
    pub account_number: String,
    pub created_at: DateTime<Utc>,
}

impl BankAccount {
    /// Account number with all but the last four digits masked.
    pub fn masked_account_number(&self) -> String {
        let digits = self.account_number.len();
        if digits <= 4 {
            return self.account_number.clone();
        }
        let (masked, tail) = self.account_number.split_at(digits - 4);
        format!("{}{}", "*".repeat(masked.chars().count()), tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [WithdrawalStatus; 5] = [
        WithdrawalStatus::Pending,
        WithdrawalStatus::Processing,
        WithdrawalStatus::Completed,
        WithdrawalStatus::Failed,
        WithdrawalStatus::Cancelled,
    ];

    #[test]
    fn transition_matrix_is_exactly_the_lifecycle() {
        let legal = [
            (WithdrawalStatus::Pending, WithdrawalStatus::Processing),
            (WithdrawalStatus::Pending, WithdrawalStatus::Cancelled),
            (WithdrawalStatus::Processing, WithdrawalStatus::Completed),
            (WithdrawalStatus::Processing, WithdrawalStatus::Failed),
        ];
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn terminal_states_absorb() {
        for status in ALL {
            if status.is_terminal() {
                for to in ALL {
                    assert!(!status.can_transition_to(to), "{status} -> {to}");
                }
            }
        }
    }

    #[test]
    fn every_status_has_a_label_and_badge() {
        for status in ALL {
            assert!(!status.label().is_empty());
            assert!(!status.badge_class().is_empty());
        }
    }

    #[test]
    fn status_round_trips_through_stored_form() {
        for status in ALL {
            assert_eq!(WithdrawalStatus::parse(&status.to_string()), Some(status));
        }
        assert_eq!(WithdrawalStatus::parse("reversed"), None);
    }

    #[test]
    fn masked_account_number_keeps_last_four() {
        let account = BankAccount {
            id: 1,
            business_id: 2,
            bank_name: "Guaranty Trust Bank".to_string(),
            bank_code: "058".to_string(),
            account_name: "Ada O.".to_string(),
            account_number: "0123456789".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(account.masked_account_number(), "******6789");
    }

    #[test]
    fn short_account_numbers_are_left_alone() {
        let account = BankAccount {
            id: 1,
            business_id: 2,
            bank_name: "Test".to_string(),
            bank_code: "000".to_string(),
            account_name: "T".to_string(),
            account_number: "123".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(account.masked_account_number(), "123");
    }
}
