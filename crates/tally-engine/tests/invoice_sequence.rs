//! Invoice numbers under concurrent allocation.

mod common;

use std::collections::HashSet;

use tally_core::invoice::parse_invoice_number;
use tally_db::{Database, DbConfig};
use tally_engine::InvoiceSequencer;
use tokio::task::JoinSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_thousand_concurrent_numbers_are_distinct_and_gapless() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let sequencer = InvoiceSequencer::new(db, "invoice", "INV");

    let mut tasks = JoinSet::new();
    for _ in 0..1000 {
        let sequencer = sequencer.clone();
        tasks.spawn(async move { sequencer.next().await });
    }

    let mut numbers = HashSet::new();
    let mut seqs = Vec::with_capacity(1000);
    while let Some(joined) = tasks.join_next().await {
        let number = joined.unwrap().unwrap();
        seqs.push(parse_invoice_number(&number).unwrap().seq);
        assert!(numbers.insert(number), "duplicate invoice number");
    }

    seqs.sort_unstable();
    assert_eq!(seqs, (1..=1000).collect::<Vec<i64>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bills_get_distinct_invoices() {
    let tally = common::setup().await;

    let mut tasks = JoinSet::new();
    for _ in 0..20 {
        let bills = tally.bills.clone();
        tasks.spawn(async move {
            bills
                .create(&common::bill(vec![common::rice(0, 1)], common::cash(0)))
                .await
        });
    }

    let mut numbers = HashSet::new();
    while let Some(joined) = tasks.join_next().await {
        let bill = joined.unwrap().unwrap();
        assert!(numbers.insert(bill.invoice_number));
    }

    assert_eq!(numbers.len(), 20);
    assert_eq!(common::pieces(&tally, common::RICE).await, 33);
}
