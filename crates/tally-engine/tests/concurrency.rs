//! Multi-connection behaviour on a WAL database file: guarded stock debits,
//! whole-bill rollback under contention and optimistic bill versions.

mod common;

use std::future::Future;

use common::*;
use tally_core::invoice::parse_invoice_number;
use tally_core::{CoreError, StockKey};
use tally_db::{BillRepository, DbError};
use tally_engine::{EngineError, EngineResult};
use tempfile::TempDir;
use tokio::task::JoinSet;

const MAX_ATTEMPTS: usize = 50;

/// Re-runs `op` while it fails with a retryable conflict.
async fn with_retry<T, F, Fut>(mut op: F) -> EngineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngineResult<T>>,
{
    for _ in 1..MAX_ATTEMPTS {
        match op().await {
            Err(err) if err.is_retryable() => tokio::task::yield_now().await,
            other => return other,
        }
    }
    op().await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_debits_never_oversell() {
    let dir = TempDir::new().unwrap();
    let tally = setup_file(&dir).await;
    assert_eq!(pieces(&tally, RICE).await, 53);

    let mut tasks = JoinSet::new();
    for _ in 0..80 {
        let ledger = tally.ledger.clone();
        tasks.spawn(async move {
            let key = StockKey::new(RICE, MAIN);
            with_retry(|| ledger.adjust(&key, -1)).await
        });
    }

    let mut applied = 0;
    let mut refused = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(stock) => {
                assert!(stock.total_items() >= 0);
                assert!(stock.loose_items < stock.items_per_box);
                applied += 1;
            }
            Err(EngineError::Core(CoreError::InsufficientStock { requested: 1, .. })) => refused += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(applied, 53);
    assert_eq!(refused, 27);
    let rice = stock(&tally, RICE).await.unwrap();
    assert_eq!((rice.boxes, rice.loose_items), (0, 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_bills_roll_back_whole_and_keep_invoices_gapless() {
    let dir = TempDir::new().unwrap();
    let tally = setup_file(&dir).await;

    // 20 bills of 3 rice + 1 sugar; rice runs out after 17
    let mut tasks = JoinSet::new();
    for _ in 0..20 {
        let bills = tally.bills.clone();
        tasks.spawn(async move {
            let request = bill(vec![rice(0, 3), sugar(0, 1)], cash(0));
            with_retry(|| bills.create(&request)).await
        });
    }

    let mut seqs = Vec::new();
    let mut refused = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(created) => seqs.push(parse_invoice_number(&created.invoice_number).unwrap().seq),
            Err(EngineError::Core(CoreError::InsufficientStock { .. })) => refused += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(seqs.len(), 17);
    assert_eq!(refused, 3);
    seqs.sort_unstable();
    assert_eq!(seqs, (1..=17).collect::<Vec<i64>>());

    // Refused bills deducted nothing, sugar included
    assert_eq!(pieces(&tally, RICE).await, 53 - 17 * 3);
    assert_eq!(pieces(&tally, SUGAR).await, 48 - 17);
}

#[tokio::test]
async fn test_racing_bill_saves_exactly_one_conflicts() {
    let dir = TempDir::new().unwrap();
    let tally = setup_file(&dir).await;
    let created = tally
        .bills
        .create(&bill(vec![rice(1, 0)], cash(0)))
        .await
        .unwrap();

    // Both writers read the same version on their own connections
    let mut first = tally.db.begin().await.unwrap();
    let mut second = tally.db.begin().await.unwrap();
    let mut a = BillRepository::fetch(&mut first, &created.id).await.unwrap().unwrap();
    let mut b = BillRepository::fetch(&mut second, &created.id).await.unwrap().unwrap();
    assert_eq!(a.version, b.version);

    a.customer.name = "First Writer".to_string();
    b.customer.name = "Second Writer".to_string();

    let saved = BillRepository::save(&mut first, &a).await.unwrap();
    first.commit().await.unwrap();
    assert_eq!(saved, created.version + 1);

    let err = BillRepository::save(&mut second, &b).await.unwrap_err();
    assert!(matches!(err, DbError::ConcurrencyConflict { .. }));
    drop(second);

    let stored = tally.bills.get(&created.id).await.unwrap();
    assert_eq!(stored.customer.name, "First Writer");
    assert_eq!(stored.version, created.version + 1);
}

#[tokio::test]
async fn test_stale_holder_conflicts_with_engine_update() {
    let dir = TempDir::new().unwrap();
    let tally = setup_file(&dir).await;
    let created = tally
        .bills
        .create(&bill(vec![rice(1, 0)], cash(0)))
        .await
        .unwrap();

    let mut stale_tx = tally.db.begin().await.unwrap();
    let mut stale = BillRepository::fetch(&mut stale_tx, &created.id)
        .await
        .unwrap()
        .unwrap();

    // The engine update runs on another pooled connection and wins
    let updated = tally
        .bills
        .update(&created.id, &bill(vec![rice(1, 5)], cash(0)))
        .await
        .unwrap();
    assert_eq!(updated.version, created.version + 1);

    stale.customer.name = "Late".to_string();
    let err: EngineError = BillRepository::save(&mut stale_tx, &stale)
        .await
        .unwrap_err()
        .into();
    assert!(err.is_retryable());
    drop(stale_tx);

    // Stock reflects only the winning update
    assert_eq!(pieces(&tally, RICE).await, 53 - 15);
}
