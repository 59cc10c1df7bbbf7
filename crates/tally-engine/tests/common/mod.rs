//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use chrono::{NaiveDate, Utc};
use tempfile::TempDir;

use tally_core::dto::{BillItemRequest, BillRequest, DiscountType, PaymentRequest};
use tally_core::{PaymentMode, Product, Stock, StockKey};
use tally_db::{Database, DbConfig};
use tally_engine::{EngineConfig, Tally};

pub const RICE: &str = "RICE-5KG";
pub const SUGAR: &str = "SUGAR-1KG";
pub const MAIN: &str = "main";

/// Fresh in-memory engines with two products stocked in `main`:
/// - RICE-5KG: 10 per box, 5 boxes + 3 loose (53 pieces)
/// - SUGAR-1KG: 12 per box, 4 boxes (48 pieces)
pub async fn setup() -> Tally {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    seed(&db).await;
    Tally::new(db, &EngineConfig::default())
}

/// Same fixtures on a WAL database file with a multi-connection pool.
pub async fn setup_file(dir: &TempDir) -> Tally {
    let config = EngineConfig {
        db_path: dir.path().join("tally.db"),
        db_max_connections: 8,
        ..EngineConfig::default()
    };
    let tally = Tally::open(&config).await.unwrap();
    seed(&tally.db).await;
    tally
}

async fn seed(db: &Database) {
    add_product(db, RICE, "Basmati Rice 5kg", 10, 11_800, 1_800).await;
    add_product(db, SUGAR, "Sugar 1kg", 12, 4_500, 500).await;
    set_stock(db, RICE, 5, 10, 3).await;
    set_stock(db, SUGAR, 4, 12, 0).await;
}

async fn add_product(db: &Database, id: &str, name: &str, ipb: i64, price: i64, tax_bps: u32) {
    let now = Utc::now();
    db.products()
        .insert(&Product {
            id: id.to_string(),
            name: name.to_string(),
            sku: id.to_string(),
            items_per_box: ipb,
            selling_price_cents: price,
            tax_rate_bps: tax_bps,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
}

async fn set_stock(db: &Database, product_id: &str, boxes: i64, ipb: i64, loose: i64) {
    db.stock()
        .set(&Stock {
            product_id: product_id.to_string(),
            warehouse_id: MAIN.to_string(),
            boxes,
            items_per_box: ipb,
            loose_items: loose,
            updated_at: Utc::now(),
        })
        .await
        .unwrap();
}

pub fn rice(boxes: i64, loose: i64) -> BillItemRequest {
    line(RICE, boxes, loose, 10, 11_800, 18.0)
}

pub fn sugar(boxes: i64, loose: i64) -> BillItemRequest {
    line(SUGAR, boxes, loose, 12, 4_500, 5.0)
}

pub fn line(
    product_id: &str,
    boxes: i64,
    loose: i64,
    items_per_box: i64,
    price_cents: i64,
    tax_percent: f64,
) -> BillItemRequest {
    BillItemRequest {
        product_id: product_id.to_string(),
        warehouse_id: MAIN.to_string(),
        quantity_boxes: boxes,
        quantity_loose: loose,
        items_per_box,
        selling_price_cents: price_cents,
        tax_percent,
        discount_type: DiscountType::None,
        discount_value: None,
    }
}

pub fn cash(cents: i64) -> PaymentRequest {
    PaymentRequest {
        mode: PaymentMode::Cash,
        cash_amount_cents: cents,
        upi_amount_cents: 0,
        card_amount_cents: 0,
    }
}

pub fn bill(items: Vec<BillItemRequest>, payment: PaymentRequest) -> BillRequest {
    BillRequest {
        bill_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
        customer: Default::default(),
        items,
        payment,
    }
}

pub async fn stock(tally: &Tally, product_id: &str) -> Option<Stock> {
    tally.ledger.get(&StockKey::new(product_id, MAIN)).await.unwrap()
}

pub async fn pieces(tally: &Tally, product_id: &str) -> i64 {
    stock(tally, product_id)
        .await
        .map(|s| s.total_items())
        .unwrap_or(0)
}
