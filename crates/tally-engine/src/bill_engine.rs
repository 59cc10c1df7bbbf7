//! # Bill Engine
//!
//! Creates and updates bills. Each call is one transaction: stock deltas,
//! the invoice number and the bill row commit together or not at all.
//!
//! ## Create
//! ```text
//!   validate DTO ─► price lines ─► deduct every line ─► next invoice number
//!        ─► totals ─► validate payment ─► insert bill ─► COMMIT
//! ```
//!
//! ## Update
//! ```text
//!   validate DTO ─► load bill ─► price new lines
//!        ─► plan deltas over (old keys ∪ new keys) ─► apply non-zero deltas
//!        ─► totals ─► re-validate payment ─► save (version check) ─► COMMIT
//! ```
//! Submitting the same update twice plans only zero deltas the second time,
//! so stock is untouched.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use tally_core::billing::{apply_totals, plan_update, price_item, sale_deltas};
use tally_core::dto::{BillItemRequest, BillRequest};
use tally_core::payment::apply_payment;
use tally_core::{Bill, BillItem, BillStatus, PaymentSplit};
use tally_db::{BillRepository, Database, ProductRepository, SqliteConnection};

use crate::error::{EngineError, EngineResult};
use crate::ledger::apply_delta;
use crate::sequencer::InvoiceSequencer;

#[derive(Debug, Clone)]
pub struct BillEngine {
    db: Database,
    sequencer: InvoiceSequencer,
}

impl BillEngine {
    pub fn new(db: Database, sequencer: InvoiceSequencer) -> Self {
        BillEngine { db, sequencer }
    }

    /// Creates a bill and deducts its lines from stock.
    ///
    /// ## Errors
    /// - `Validation` for a malformed request
    /// - `NotFound` if a line names an unknown product
    /// - `InsufficientStock` if any line cannot be covered (nothing is deducted)
    /// - `PaymentExceedsTotal` if the tenders exceed the grand total
    pub async fn create(&self, request: &BillRequest) -> EngineResult<Bill> {
        request.validate()?;

        let mut tx = self.db.begin().await?;

        let items = price_lines(&mut tx, &request.items).await?;
        for delta in sale_deltas(&items) {
            apply_delta(&mut tx, &delta).await?;
        }

        let invoice_number = self.sequencer.next_in(&mut tx).await?;
        let now = Utc::now();

        let mut bill = Bill {
            id: Uuid::new_v4().to_string(),
            invoice_number,
            bill_date: request.bill_date,
            customer: request.customer.clone(),
            items,
            total_items: 0,
            total_before_tax_cents: 0,
            total_tax_cents: 0,
            grand_total_cents: 0,
            returned_amount_cents: 0,
            payment: PaymentSplit::default(),
            amount_collected_cents: 0,
            balance_amount_cents: 0,
            status: BillStatus::Pending,
            delivered_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        apply_totals(&mut bill)?;
        apply_payment(&mut bill, request.payment.to_split())?;

        BillRepository::insert(&mut tx, &bill).await?;
        tx.commit().await?;

        info!(
            bill_id = %bill.id,
            invoice_number = %bill.invoice_number,
            lines = bill.items.len(),
            grand_total_cents = bill.grand_total_cents,
            status = %bill.status,
            "Bill created"
        );

        Ok(bill)
    }

    /// Replaces a bill's lines and payment, moving stock by the difference.
    ///
    /// ## Rules
    /// - Lines kept with the same quantity never touch stock
    /// - A line dropped from the bill is restocked in full
    /// - A line may not go below what was already returned from it
    /// - The payment is re-validated against the new grand total
    pub async fn update(&self, bill_id: &str, request: &BillRequest) -> EngineResult<Bill> {
        request.validate()?;

        let mut tx = self.db.begin().await?;
        let mut bill = load_bill(&mut tx, bill_id).await?;

        let mut items = price_lines(&mut tx, &request.items).await?;
        let deltas = plan_update(&bill.items, &mut items)?;
        for delta in &deltas {
            apply_delta(&mut tx, delta).await?;
        }

        bill.bill_date = request.bill_date;
        bill.customer = request.customer.clone();
        bill.items = items;
        apply_totals(&mut bill)?;
        apply_payment(&mut bill, request.payment.to_split())?;
        bill.updated_at = Utc::now();

        bill.version = BillRepository::save(&mut tx, &bill).await?;
        tx.commit().await?;

        info!(
            bill_id = %bill.id,
            invoice_number = %bill.invoice_number,
            deltas = deltas.len(),
            grand_total_cents = bill.grand_total_cents,
            version = bill.version,
            "Bill updated"
        );

        Ok(bill)
    }

    pub async fn get(&self, bill_id: &str) -> EngineResult<Bill> {
        self.db
            .bills()
            .get_by_id(bill_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Bill", bill_id))
    }

    pub async fn get_by_invoice_number(&self, invoice_number: &str) -> EngineResult<Bill> {
        self.db
            .bills()
            .get_by_invoice_number(invoice_number)
            .await?
            .ok_or_else(|| EngineError::not_found("Bill", invoice_number))
    }

    /// Most recent bills first.
    pub async fn list_recent(&self, limit: u32) -> EngineResult<Vec<Bill>> {
        Ok(self.db.bills().list_recent(limit).await?)
    }
}

/// Loads a bill on the caller's transaction, `NotFound` if absent.
pub(crate) async fn load_bill(conn: &mut SqliteConnection, bill_id: &str) -> EngineResult<Bill> {
    BillRepository::fetch(conn, bill_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Bill", bill_id))
}

/// Prices request lines, snapshotting each product's name.
///
/// Price, tax and box size come from the request; the catalog only has to
/// know the product.
async fn price_lines(
    conn: &mut SqliteConnection,
    requests: &[BillItemRequest],
) -> EngineResult<Vec<BillItem>> {
    let mut items = Vec::with_capacity(requests.len());

    for request in requests {
        let key = request.key();
        let product = ProductRepository::fetch(conn, &key.product_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Product", &key.product_id))?;

        let item = price_item(key, product.name, &request.line_input())?;
        debug!(
            product_id = %item.product_id,
            warehouse_id = %item.warehouse_id,
            total_items = item.total_items,
            line_total_cents = item.line_total_cents,
            "Priced bill line"
        );
        items.push(item);
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::dto::{DiscountType, PaymentRequest};
    use tally_core::{CoreError, PaymentMode, Product, Stock, StockKey};
    use tally_db::DbConfig;

    async fn setup() -> (Database, BillEngine) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        db.products()
            .insert(&Product {
                id: "RICE-5KG".to_string(),
                name: "Basmati Rice 5kg".to_string(),
                sku: "RICE-5KG".to_string(),
                items_per_box: 10,
                selling_price_cents: 11_800,
                tax_rate_bps: 1_800,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        db.stock()
            .set(&Stock {
                product_id: "RICE-5KG".to_string(),
                warehouse_id: "main".to_string(),
                boxes: 5,
                items_per_box: 10,
                loose_items: 3,
                updated_at: now,
            })
            .await
            .unwrap();

        let sequencer = InvoiceSequencer::new(db.clone(), "invoice", "INV");
        let engine = BillEngine::new(db.clone(), sequencer);
        (db, engine)
    }

    fn request(boxes: i64, loose: i64, cash_cents: i64) -> BillRequest {
        BillRequest {
            bill_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            customer: Default::default(),
            items: vec![BillItemRequest {
                product_id: "RICE-5KG".to_string(),
                warehouse_id: "main".to_string(),
                quantity_boxes: boxes,
                quantity_loose: loose,
                items_per_box: 10,
                selling_price_cents: 11_800,
                tax_percent: 18.0,
                discount_type: DiscountType::None,
                discount_value: None,
            }],
            payment: PaymentRequest {
                mode: PaymentMode::Cash,
                cash_amount_cents: cash_cents,
                upi_amount_cents: 0,
                card_amount_cents: 0,
            },
        }
    }

    #[tokio::test]
    async fn test_create_prices_and_deducts() {
        let (db, engine) = setup().await;

        let bill = engine.create(&request(2, 5, 100_000)).await.unwrap();

        assert_eq!(bill.grand_total_cents, 295_000);
        assert_eq!(bill.total_tax_cents, 45_000);
        assert_eq!(bill.total_before_tax_cents, 250_000);
        assert_eq!(bill.amount_collected_cents, 100_000);
        assert_eq!(bill.balance_amount_cents, 195_000);
        assert_eq!(bill.status, BillStatus::PartiallyPaid);
        assert!(bill.invoice_number.ends_with("-000001"));

        let stock = db
            .stock()
            .get(&StockKey::new("RICE-5KG", "main"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!((stock.boxes, stock.loose_items), (2, 8));
    }

    #[tokio::test]
    async fn test_create_unknown_product_is_not_found() {
        let (_db, engine) = setup().await;
        let mut req = request(1, 0, 0);
        req.items[0].product_id = "GHOST".to_string();

        let err = engine.create(&req).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_same_lines_is_stock_neutral() {
        let (db, engine) = setup().await;
        let key = StockKey::new("RICE-5KG", "main");
        let bill = engine.create(&request(2, 5, 0)).await.unwrap();

        let updated = engine.update(&bill.id, &request(2, 5, 0)).await.unwrap();
        assert_eq!(updated.version, 1);
        assert_eq!(db.stock().get(&key).await.unwrap().unwrap().total_items(), 28);

        // Shrinking the line gives stock back
        engine.update(&bill.id, &request(2, 0, 0)).await.unwrap();
        assert_eq!(db.stock().get(&key).await.unwrap().unwrap().total_items(), 33);
    }

    #[tokio::test]
    async fn test_update_overpayment_changes_nothing() {
        let (db, engine) = setup().await;
        let bill = engine.create(&request(2, 5, 0)).await.unwrap();

        let err = engine
            .update(&bill.id, &request(1, 0, 2_000_000))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::PaymentExceedsTotal { .. })
        ));

        let stored = engine.get(&bill.id).await.unwrap();
        assert_eq!(stored.items[0].total_items, 25);
        assert_eq!(stored.version, 0);
        let stock = db
            .stock()
            .get(&StockKey::new("RICE-5KG", "main"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stock.total_items(), 28);
    }

    #[tokio::test]
    async fn test_lookup_by_invoice_number() {
        let (_db, engine) = setup().await;
        let bill = engine.create(&request(0, 3, 0)).await.unwrap();

        let found = engine
            .get_by_invoice_number(&bill.invoice_number)
            .await
            .unwrap();
        assert_eq!(found.id, bill.id);
        assert_eq!(engine.list_recent(10).await.unwrap().len(), 1);
        assert!(engine.get("missing").await.is_err());
    }
}
