//! Integration tests for the wallet ledger.
//!
//! Tests wallet creation, the five balance movements, atomicity of rejected
//! operations, and ledger history using the in-memory store.

use merchant_ledger::db::MemoryStore;
use merchant_ledger::wallet::{EntryType, LedgerError, Wallet, WalletManager};
use std::sync::Arc;

fn setup_ledger() -> WalletManager<MemoryStore> {
    let _ = env_logger::builder().is_test(true).try_init();
    WalletManager::new(Arc::new(MemoryStore::new()))
}

fn assert_balances(wallet: &Wallet, balance: i64, available: i64, held: i64) {
    assert_eq!(wallet.balance, balance, "total balance");
    assert_eq!(wallet.available_balance, available, "available balance");
    assert_eq!(wallet.held_balance, held, "held balance");
    assert_eq!(
        wallet.balance,
        wallet.available_balance + wallet.held_balance,
        "wallet identity must hold"
    );
}

#[tokio::test]
async fn test_wallet_created_lazily_with_zero_balances() {
    let ledger = setup_ledger();

    let wallet = ledger
        .get_or_create(42, "NGN")
        .await
        .expect("Should create wallet");

    assert_eq!(wallet.business_id, 42);
    assert_eq!(wallet.currency, "NGN");
    assert_balances(&wallet, 0, 0, 0);
}

#[tokio::test]
async fn test_get_or_create_returns_the_same_wallet() {
    let ledger = setup_ledger();

    let first = ledger.get_or_create(42, "NGN").await.expect("create");
    let second = ledger.get_or_create(42, "NGN").await.expect("get");

    assert_eq!(first.id, second.id, "Same pair should map to one wallet");

    let other_currency = ledger.get_or_create(42, "USD").await.expect("create");
    assert_ne!(
        first.id, other_currency.id,
        "Different currency should map to a different wallet"
    );
}

#[tokio::test]
async fn test_concurrent_get_or_create_yields_one_wallet() {
    let store = Arc::new(MemoryStore::new());

    let mut handles = vec![];
    for _ in 0..10 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let ledger = WalletManager::new(store);
            ledger.get_or_create(7, "NGN").await
        }));
    }

    let mut ids = vec![];
    for handle in handles {
        let wallet = handle
            .await
            .expect("Task should complete")
            .expect("get_or_create should succeed");
        ids.push(wallet.id);
    }

    ids.dedup();
    assert_eq!(ids.len(), 1, "All callers should see the same wallet row");
}

#[tokio::test]
async fn test_credit_then_hold_then_settle() {
    // The full happy path: (0,0,0) -> credit 5000 -> (5000,5000,0)
    // -> hold 2000 -> (5000,3000,2000) -> settle -> (3000,3000,0)
    let ledger = setup_ledger();
    let wallet = ledger.get_or_create(1, "NGN").await.expect("create");

    ledger
        .credit(wallet.id, 5000, Some(900), None, None)
        .await
        .expect("credit should succeed");
    assert_balances(&ledger.get_wallet(wallet.id).await.unwrap(), 5000, 5000, 0);

    ledger
        .hold(wallet.id, 2000, 11)
        .await
        .expect("hold should succeed");
    assert_balances(
        &ledger.get_wallet(wallet.id).await.unwrap(),
        5000,
        3000,
        2000,
    );

    let entries = ledger
        .settle(wallet.id, 2000, 11)
        .await
        .expect("settle should succeed");
    assert_balances(&ledger.get_wallet(wallet.id).await.unwrap(), 3000, 3000, 0);

    // Two audit entries, release then debit, with a contiguous snapshot chain
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].entry_type, EntryType::Release);
    assert_eq!(entries[1].entry_type, EntryType::Debit);
    assert_eq!(entries[0].balance_after, entries[1].balance_before);
    assert_eq!(entries[1].balance_after, 3000);
}

#[tokio::test]
async fn test_hold_beyond_available_leaves_wallet_unchanged() {
    let ledger = setup_ledger();
    let wallet = ledger.get_or_create(1, "NGN").await.expect("create");
    ledger
        .credit(wallet.id, 5000, None, None, None)
        .await
        .expect("credit");

    let result = ledger.hold(wallet.id, 6000, 11).await;
    assert!(
        matches!(
            result,
            Err(LedgerError::InsufficientFunds {
                available: 5000,
                required: 6000
            })
        ),
        "hold should be rejected: {result:?}"
    );

    assert_balances(&ledger.get_wallet(wallet.id).await.unwrap(), 5000, 5000, 0);
    let entries = ledger.entries(wallet.id, 10).await.unwrap();
    assert_eq!(entries.len(), 1, "No entry is written for a rejected hold");
}

#[tokio::test]
async fn test_release_restores_available_balance() {
    let ledger = setup_ledger();
    let wallet = ledger.get_or_create(1, "NGN").await.expect("create");
    ledger
        .credit(wallet.id, 5000, None, None, None)
        .await
        .expect("credit");
    ledger.hold(wallet.id, 2000, 11).await.expect("hold");

    ledger
        .release(wallet.id, 2000, 11)
        .await
        .expect("release should succeed");

    assert_balances(&ledger.get_wallet(wallet.id).await.unwrap(), 5000, 5000, 0);
}

#[tokio::test]
async fn test_release_beyond_held_is_an_internal_fault() {
    let ledger = setup_ledger();
    let wallet = ledger.get_or_create(1, "NGN").await.expect("create");
    ledger
        .credit(wallet.id, 5000, None, None, None)
        .await
        .expect("credit");

    let result = ledger.release(wallet.id, 100, 11).await;
    assert!(
        matches!(result, Err(LedgerError::InvalidState(_))),
        "releasing with nothing held is an inconsistency: {result:?}"
    );
}

#[tokio::test]
async fn test_debit_consumes_held_funds() {
    let ledger = setup_ledger();
    let wallet = ledger.get_or_create(1, "NGN").await.expect("create");
    ledger
        .credit(wallet.id, 5000, None, None, None)
        .await
        .expect("credit");
    ledger.hold(wallet.id, 2000, 11).await.expect("hold");

    ledger
        .debit(wallet.id, 2000, 11)
        .await
        .expect("debit should succeed");

    assert_balances(&ledger.get_wallet(wallet.id).await.unwrap(), 3000, 3000, 0);
}

#[tokio::test]
async fn test_refund_reverses_a_credit() {
    let ledger = setup_ledger();
    let wallet = ledger.get_or_create(1, "NGN").await.expect("create");
    ledger
        .credit(wallet.id, 5000, Some(900), None, None)
        .await
        .expect("credit");

    ledger
        .refund(wallet.id, 1500, 900)
        .await
        .expect("refund should succeed");

    assert_balances(&ledger.get_wallet(wallet.id).await.unwrap(), 3500, 3500, 0);
}

#[tokio::test]
async fn test_refund_cannot_exceed_available() {
    let ledger = setup_ledger();
    let wallet = ledger.get_or_create(1, "NGN").await.expect("create");
    ledger
        .credit(wallet.id, 5000, Some(900), None, None)
        .await
        .expect("credit");
    ledger.hold(wallet.id, 4000, 11).await.expect("hold");

    // Only 1000 is available; held funds are not refundable
    let result = ledger.refund(wallet.id, 2000, 900).await;
    assert!(
        matches!(result, Err(LedgerError::InsufficientFunds { .. })),
        "refund should be rejected: {result:?}"
    );
    assert_balances(
        &ledger.get_wallet(wallet.id).await.unwrap(),
        5000,
        1000,
        4000,
    );
}

#[tokio::test]
async fn test_zero_and_negative_amounts_rejected() {
    let ledger = setup_ledger();
    let wallet = ledger.get_or_create(1, "NGN").await.expect("create");

    for amount in [0, -100] {
        let result = ledger.credit(wallet.id, amount, None, None, None).await;
        assert!(
            matches!(result, Err(LedgerError::InvalidAmount(a)) if a == amount),
            "credit of {amount} should be rejected: {result:?}"
        );
    }
}

#[tokio::test]
async fn test_operations_on_missing_wallet() {
    let ledger = setup_ledger();

    let result = ledger.credit(999, 100, None, None, None).await;
    assert!(matches!(result, Err(LedgerError::WalletNotFound(999))));
}

#[tokio::test]
async fn test_entry_history_is_newest_first() {
    let ledger = setup_ledger();
    let wallet = ledger.get_or_create(1, "NGN").await.expect("create");

    ledger
        .credit(wallet.id, 100, Some(1), None, None)
        .await
        .expect("credit 1");
    ledger
        .credit(wallet.id, 200, Some(2), None, None)
        .await
        .expect("credit 2");
    ledger.hold(wallet.id, 50, 11).await.expect("hold");

    let entries = ledger.entries(wallet.id, 10).await.expect("history");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].entry_type, EntryType::Hold);
    assert_eq!(entries[1].amount, 200);
    assert_eq!(entries[2].amount, 100);

    let limited = ledger.entries(wallet.id, 2).await.expect("history");
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn test_entries_carry_references_and_metadata() {
    let ledger = setup_ledger();
    let wallet = ledger.get_or_create(1, "NGN").await.expect("create");

    let entry = ledger
        .credit(
            wallet.id,
            2500,
            Some(900),
            Some("Booking #77 payment".to_string()),
            Some(serde_json::json!({"booking_id": 77})),
        )
        .await
        .expect("credit");

    assert_eq!(entry.transaction_id, Some(900));
    assert_eq!(entry.withdrawal_request_id, None);
    assert_eq!(entry.description.as_deref(), Some("Booking #77 payment"));
    assert_eq!(
        entry.metadata,
        Some(serde_json::json!({"booking_id": 77}))
    );
    assert_eq!(entry.currency, "NGN");
}

#[tokio::test]
async fn test_concurrent_credits_all_land() {
    // Optimistic retries must serialize racing writers on one wallet
    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(WalletManager::new(store));
    let wallet = ledger.get_or_create(1, "NGN").await.expect("create");

    let mut handles = vec![];
    for i in 0..10 {
        let ledger = ledger.clone();
        let wallet_id = wallet.id;
        handles.push(tokio::spawn(async move {
            ledger.credit(wallet_id, 100, Some(i), None, None).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.expect("Task should complete").is_ok() {
            succeeded += 1;
        }
    }

    let wallet = ledger.get_wallet(wallet.id).await.unwrap();
    assert_eq!(
        wallet.balance,
        succeeded * 100,
        "Every successful credit must be reflected exactly once"
    );
    assert_balances(&wallet, wallet.balance, wallet.balance, 0);
}
