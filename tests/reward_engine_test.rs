mod helpers;

use helpers::*;
use std::sync::Arc;
use std::time::Duration;
use stocky_backend::error::{AppError, ErrorKind};
use stocky_backend::models::*;
use stocky_backend::store::InMemoryStore;
use tokio_test::{assert_err, assert_ok};

// ============================================================================
// Issuance
// ============================================================================

#[tokio::test]
async fn test_issue_reward_writes_balanced_posting() {
    let harness = TestHarness::new();
    let rewarded_at = parse_rewarded_at("2024-12-18T10:00:00Z").unwrap();

    let receipt = harness.grant(1, "AAPL", 10.0, "r1", rewarded_at).await;
    assert_eq!(receipt.reward.reward_id, "r1");
    assert_eq!(receipt.reward.rewarded_at, rewarded_at);
    assert_close(receipt.price_per_share, 150.0);
    assert_close(receipt.stock_value_inr, 1500.0);
    assert_close(receipt.fee_inr, 20.0);

    let entries = harness.rewards.ledger_entries(receipt.reward.id).await.unwrap();
    assert_eq!(entries.len(), 3);

    let stock = entries
        .iter()
        .find(|e| e.is(EntryType::Stock, Direction::Debit))
        .expect("STOCK/DEBIT line");
    assert_eq!(stock.stock_symbol.as_deref(), Some("AAPL"));
    assert_eq!(stock.quantity, Some(10.0));

    let cash = entries
        .iter()
        .find(|e| e.is(EntryType::Cash, Direction::Credit))
        .expect("CASH/CREDIT line");
    assert_close(cash.amount_inr, 1500.0);
    assert_eq!(cash.stock_symbol, None);

    let fee = entries
        .iter()
        .find(|e| e.is(EntryType::Fee, Direction::Credit))
        .expect("FEE/CREDIT line");
    assert_close(fee.amount_inr, 20.0);

    for entry in &entries {
        assert_eq!(entry.reference_id, receipt.reward.id);
        assert_eq!(entry.user_id, 1);
        assert_eq!(entry.created_at, rewarded_at);
    }
}

#[tokio::test]
async fn test_duplicate_key_is_rejected_and_ledger_unchanged() {
    let harness = TestHarness::new();
    let rewarded_at = at(2024, 12, 18, 10);
    harness.grant(1, "AAPL", 10.0, "r1", rewarded_at).await;

    // Same key with different fields is still a duplicate
    let err = harness
        .rewards
        .issue_reward(RewardRequest::new(1, "TCS", 3.0, "r1", rewarded_at))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateReward(ref key) if key == "r1"));
    assert_eq!(err.kind(), ErrorKind::DuplicateReward);

    assert_eq!(harness.store.reward_count().unwrap(), 1);
    assert_eq!(harness.store.entry_count().unwrap(), 3);

    let stored = harness.rewards.find_reward("r1").await.unwrap().expect("r1 recorded");
    assert_eq!(stored.stock_symbol, "AAPL");
}

#[tokio::test]
async fn test_unknown_symbol_writes_nothing() {
    let harness = TestHarness::new();

    let err = harness
        .rewards
        .issue_reward(RewardRequest::new(1, "ZZZZ", 1.0, "r-missing", at(2024, 12, 18, 10)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StockNotFound(ref s) if s == "ZZZZ"));
    assert_eq!(err.kind(), ErrorKind::StockNotFound);

    assert_eq!(harness.store.reward_count().unwrap(), 0);
    assert_eq!(harness.store.entry_count().unwrap(), 0);
    assert!(harness.rewards.find_reward("r-missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_same_key_yields_one_success() {
    // Latency keeps both writers in flight at the same time
    let harness = TestHarness::with_store(
        InMemoryStore::new()
            .with_users([1])
            .with_price("AAPL", 150.0)
            .with_write_latency(Duration::from_millis(20)),
    );
    let rewarded_at = at(2024, 12, 18, 10);

    let (first, second) = tokio::join!(
        harness
            .rewards
            .issue_reward(RewardRequest::new(1, "AAPL", 10.0, "r1", rewarded_at)),
        harness
            .rewards
            .issue_reward(RewardRequest::new(1, "AAPL", 10.0, "r1", rewarded_at)),
    );

    let outcomes = [first, second];
    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    let duplicates = outcomes
        .iter()
        .filter(|r| matches!(r, Err(AppError::DuplicateReward(_))))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(duplicates, 1);
    assert_eq!(harness.store.entry_count().unwrap(), 3);
}

#[tokio::test]
async fn test_distinct_keys_issue_concurrently() {
    let harness = Arc::new(TestHarness::new());
    let rewarded_at = at(2024, 12, 18, 10);

    let handles: Vec<_> = (0..8i64)
        .map(|i| {
            let harness = Arc::clone(&harness);
            tokio::spawn(async move {
                let request = RewardRequest::new(1 + i % 2, "AAPL", 1.0, format!("bulk-{}", i), rewarded_at);
                harness.rewards.issue_reward(request).await
            })
        })
        .collect();

    for handle in handles {
        assert_ok!(handle.await.expect("task panicked"));
    }
    assert_eq!(harness.store.reward_count().unwrap(), 8);
    assert_eq!(harness.store.entry_count().unwrap(), 24);
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_invalid_requests_are_rejected_before_any_write() {
    let harness = TestHarness::new();
    let rewarded_at = at(2024, 12, 18, 10);

    let bad = [
        RewardRequest::new(1, "AAPL", 0.0, "zero", rewarded_at),
        RewardRequest::new(1, "AAPL", -2.0, "negative", rewarded_at),
        RewardRequest::new(1, "AAPL", f64::NAN, "nan", rewarded_at),
        RewardRequest::new(1, "  ", 1.0, "blank-symbol", rewarded_at),
        RewardRequest::new(1, "AAPL", 1.0, "   ", rewarded_at),
    ];
    for request in bad {
        let err = harness.rewards.issue_reward(request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{}", err);
    }
    assert_eq!(harness.store.reward_count().unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_user_is_validation_error() {
    let harness = TestHarness::new();

    let result = harness
        .rewards
        .issue_reward(RewardRequest::new(99, "AAPL", 1.0, "r-ghost", at(2024, 12, 18, 10)))
        .await;
    let err = assert_err!(result);
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(harness.store.entry_count().unwrap(), 0);
}

#[tokio::test]
async fn test_overflowing_stock_value_is_rejected() {
    let harness = TestHarness::new();

    let err = harness
        .rewards
        .issue_reward(RewardRequest::new(1, "AAPL", 1e307, "big", at(2024, 12, 18, 10)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(harness.store.reward_count().unwrap(), 0);
    assert_eq!(harness.store.entry_count().unwrap(), 0);
    assert!(harness.rewards.find_reward("big").await.unwrap().is_none());
}

#[test]
fn test_unparseable_timestamp_is_validation_error() {
    let err = parse_rewarded_at("18/12/2024 10:00").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

// ============================================================================
// Atomicity and retries
// ============================================================================

#[tokio::test]
async fn test_deadline_before_commit_leaves_no_rows() {
    let harness = TestHarness::with_store(
        InMemoryStore::new()
            .with_users([1])
            .with_price("AAPL", 150.0)
            .with_write_latency(Duration::from_millis(200)),
    );
    let request = RewardRequest::new(1, "AAPL", 10.0, "r-slow", at(2024, 12, 18, 10));

    let err = harness
        .rewards
        .issue_reward_with_deadline(request.clone(), Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Timeout(_)));
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(err.is_retryable());

    // The abandoned write never lands
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(harness.store.reward_count().unwrap(), 0);
    assert_eq!(harness.store.entry_count().unwrap(), 0);

    // Retrying with the same key succeeds exactly once
    let receipt = assert_ok!(
        harness
            .rewards
            .issue_reward_with_deadline(request, Duration::from_secs(2))
            .await
    );
    assert_eq!(receipt.reward.reward_id, "r-slow");
    assert_eq!(harness.store.entry_count().unwrap(), 3);
}

#[tokio::test]
async fn test_storage_failure_is_retryable_with_same_key() {
    let harness = TestHarness::new();
    let request = RewardRequest::new(1, "AAPL", 2.0, "r-retry", at(2024, 12, 18, 10));

    harness.store.set_offline(true);
    let err = harness.rewards.issue_reward(request.clone()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(err.is_retryable());

    harness.store.set_offline(false);
    assert_eq!(harness.store.reward_count().unwrap(), 0);

    let receipt = assert_ok!(harness.rewards.issue_reward(request.clone()).await);
    assert_close(receipt.stock_value_inr, 300.0);

    let err = harness.rewards.issue_reward(request).await.unwrap_err();
    assert!(err.is_duplicate());
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_every_reward_balances() {
    let harness = TestHarness::new();
    let grants = [
        (1, "AAPL", 10.0, "b1"),
        (1, "TCS", 0.5, "b2"),
        (2, "AAPL", 3.25, "b3"),
        (2, "TCS", 7.0, "b4"),
    ];

    for (user, symbol, shares, key) in grants {
        let receipt = harness.grant(user, symbol, shares, key, at(2024, 12, 18, 9)).await;
        let entries = harness.rewards.ledger_entries(receipt.reward.id).await.unwrap();

        let stock: Vec<_> = entries.iter().filter(|e| e.is(EntryType::Stock, Direction::Debit)).collect();
        let cash: Vec<_> = entries.iter().filter(|e| e.is(EntryType::Cash, Direction::Credit)).collect();
        let fee: Vec<_> = entries.iter().filter(|e| e.is(EntryType::Fee, Direction::Credit)).collect();
        assert_eq!((stock.len(), cash.len(), fee.len()), (1, 1, 1));

        let quantity = stock[0].quantity.unwrap();
        assert_close(cash[0].amount_inr, quantity * receipt.price_per_share);
    }
}
