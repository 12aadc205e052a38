//! Withdrawal manager: drives payout requests through their lifecycle.

use std::sync::Arc;

use chrono::Utc;

use super::{
    errors::{WithdrawalError, WithdrawalResult},
    models::{
        ActorId, BankAccountId, NewWithdrawalRequest, WithdrawalId, WithdrawalRequest,
        WithdrawalStatus,
    },
};
use crate::db::repository::{WalletStore, WithdrawalStore};
use crate::wallet::{
    errors::LedgerError,
    manager::WalletManager,
    models::{Amount, BusinessId},
};

/// Withdrawal manager
///
/// Every lifecycle move is claimed with a compare-and-swap on the stored
/// status before its ledger effect is applied, so racing callers cannot
/// double-apply a funds movement: exactly one claim wins, the rest observe
/// `InvalidTransition`.
pub struct WithdrawalManager<W, S> {
    ledger: WalletManager<W>,
    store: Arc<S>,
}

impl<W, S> WithdrawalManager<W, S>
where
    W: WalletStore,
    S: WithdrawalStore,
{
    /// Create a new withdrawal manager
    ///
    /// # Arguments
    ///
    /// * `ledger` - Ledger manager used for hold/release/settle movements
    /// * `store` - Withdrawal request persistence backend
    pub fn new(ledger: WalletManager<W>, store: Arc<S>) -> Self {
        Self { ledger, store }
    }

    /// Create a payout request for a business.
    ///
    /// Places a hold for `amount` on the business wallet and persists the
    /// request in `pending`. If the hold is rejected (most commonly
    /// insufficient available balance) the request row is removed again and
    /// the ledger error propagates.
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidAmount` - Amount is zero or negative
    /// * `LedgerError::InsufficientFunds` - Available balance below `amount`
    pub async fn request(
        &self,
        business_id: BusinessId,
        currency: &str,
        amount: Amount,
        bank_account_id: Option<BankAccountId>,
    ) -> WithdrawalResult<WithdrawalRequest> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount).into());
        }

        let wallet = self.ledger.get_or_create(business_id, currency).await?;
        let request = self
            .store
            .create(NewWithdrawalRequest {
                business_id,
                wallet_id: wallet.id,
                bank_account_id,
                amount,
                currency: wallet.currency.clone(),
            })
            .await?;

        match self.ledger.hold(wallet.id, amount, request.id).await {
            Ok(_) => {
                log::info!(
                    "withdrawal {} requested by business {} for {} {}",
                    request.id,
                    business_id,
                    amount,
                    request.currency
                );
                Ok(request)
            }
            Err(e) => {
                // The request never held funds, so it never enters the lifecycle.
                if let Err(delete_err) = self.store.delete(request.id).await {
                    log::error!(
                        "failed to remove withdrawal {} after rejected hold: {}",
                        request.id,
                        delete_err
                    );
                }
                Err(e.into())
            }
        }
    }

    /// Record submission to the payout provider: `pending -> processing`.
    ///
    /// No ledger effect; the provider transfer code and reference are stored
    /// for reconciliation.
    pub async fn mark_processing(
        &self,
        id: WithdrawalId,
        transfer_code: &str,
        transfer_reference: &str,
    ) -> WithdrawalResult<WithdrawalRequest> {
        let mut request = self.store.get(id).await?;
        let previous = ensure(&request, WithdrawalStatus::Processing)?;

        request.status = WithdrawalStatus::Processing;
        request.transfer_code = Some(transfer_code.to_string());
        request.transfer_reference = Some(transfer_reference.to_string());
        self.claim(&request, previous).await?;

        log::info!("withdrawal {} submitted to provider ({})", id, transfer_code);
        Ok(request)
    }

    /// Record provider confirmation: `processing -> completed`.
    ///
    /// Settles the held amount (release + settlement debit in one atomic
    /// ledger commit) and stamps the processing actor and time.
    pub async fn complete(
        &self,
        id: WithdrawalId,
        processed_by: ActorId,
    ) -> WithdrawalResult<WithdrawalRequest> {
        let mut request = self.store.get(id).await?;
        let previous = ensure(&request, WithdrawalStatus::Completed)?;

        request.status = WithdrawalStatus::Completed;
        request.processed_at = Some(Utc::now());
        request.processed_by = Some(processed_by);
        self.claim(&request, previous).await?;

        if let Err(e) = self.ledger.settle(request.wallet_id, request.amount, id).await {
            log::error!(
                "withdrawal {} completed but settlement of {} on wallet {} failed: {}",
                id,
                request.amount,
                request.wallet_id,
                e
            );
            return Err(e.into());
        }

        log::info!("withdrawal {} completed by actor {}", id, processed_by);
        Ok(request)
    }

    /// Record provider failure: `processing -> failed`.
    ///
    /// Releases the held funds back to the available balance and stores the
    /// provider's failure reason.
    pub async fn fail(
        &self,
        id: WithdrawalId,
        failure_reason: &str,
    ) -> WithdrawalResult<WithdrawalRequest> {
        let mut request = self.store.get(id).await?;
        let previous = ensure(&request, WithdrawalStatus::Failed)?;

        request.status = WithdrawalStatus::Failed;
        request.failure_reason = Some(failure_reason.to_string());
        self.claim(&request, previous).await?;

        if let Err(e) = self.ledger.release(request.wallet_id, request.amount, id).await {
            log::error!(
                "withdrawal {} failed but release of {} on wallet {} failed: {}",
                id,
                request.amount,
                request.wallet_id,
                e
            );
            return Err(e.into());
        }

        log::info!("withdrawal {} failed: {}", id, failure_reason);
        Ok(request)
    }

    /// Cancel a request at the business's initiative: `pending -> cancelled`.
    ///
    /// Permitted only while pending; releases the held funds.
    pub async fn cancel(&self, id: WithdrawalId) -> WithdrawalResult<WithdrawalRequest> {
        let mut request = self.store.get(id).await?;
        let previous = ensure(&request, WithdrawalStatus::Cancelled)?;

        request.status = WithdrawalStatus::Cancelled;
        self.claim(&request, previous).await?;

        if let Err(e) = self.ledger.release(request.wallet_id, request.amount, id).await {
            log::error!(
                "withdrawal {} cancelled but release of {} on wallet {} failed: {}",
                id,
                request.amount,
                request.wallet_id,
                e
            );
            return Err(e.into());
        }

        log::info!("withdrawal {} cancelled", id);
        Ok(request)
    }

    /// Get a withdrawal request by id
    pub async fn get(&self, id: WithdrawalId) -> WithdrawalResult<WithdrawalRequest> {
        self.store.get(id).await
    }

    /// List withdrawal requests for a business, newest first
    pub async fn list_for_business(
        &self,
        business_id: BusinessId,
        limit: i64,
    ) -> WithdrawalResult<Vec<WithdrawalRequest>> {
        self.store.list_for_business(business_id, limit).await
    }

    /// Persist a transition, converting a lost claim into the
    /// `InvalidTransition` the caller would have seen had it read later.
    async fn claim(
        &self,
        request: &WithdrawalRequest,
        previous: WithdrawalStatus,
    ) -> WithdrawalResult<()> {
        match self.store.transition(request, previous).await {
            Ok(()) => Ok(()),
            Err(WithdrawalError::Conflict) => {
                let current = self.store.get(request.id).await?;
                Err(WithdrawalError::InvalidTransition {
                    from: current.status,
                    to: request.status,
                })
            }
            Err(e) => Err(e),
        }
    }
}

fn ensure(
    request: &WithdrawalRequest,
    to: WithdrawalStatus,
) -> WithdrawalResult<WithdrawalStatus> {
    if !request.status.can_transition_to(to) {
        return Err(WithdrawalError::InvalidTransition {
            from: request.status,
            to,
        });
    }
    Ok(request.status)
}
