//! # Bill Repository
//!
//! Bills and their lines. Lines live in `bill_items` and are rewritten as a
//! whole on every save, inside the caller's transaction.
//!
//! ## Optimistic Versioning
//! ```text
//!   read bill (version 3)
//!        │
//!        ▼  compute new state in memory
//!   UPDATE bills SET ..., version = 4 WHERE id = ? AND version = 3
//!        │
//!        ├── 1 row  → saved
//!        └── 0 rows → someone else saved first → ConcurrencyConflict
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::{
    Bill, BillItem, BillStatus, CustomerSnapshot, Discount, PaymentMode, PaymentSplit,
};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct BillRow {
    id: String,
    invoice_number: String,
    bill_date: NaiveDate,
    customer_name: String,
    customer_phone: Option<String>,
    customer_address: Option<String>,
    total_items: i64,
    total_before_tax_cents: i64,
    total_tax_cents: i64,
    grand_total_cents: i64,
    returned_amount_cents: i64,
    payment_mode: PaymentMode,
    cash_amount_cents: i64,
    upi_amount_cents: i64,
    card_amount_cents: i64,
    amount_collected_cents: i64,
    balance_amount_cents: i64,
    status: BillStatus,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl BillRow {
    fn into_bill(self, items: Vec<BillItem>) -> Bill {
        Bill {
            id: self.id,
            invoice_number: self.invoice_number,
            bill_date: self.bill_date,
            customer: CustomerSnapshot {
                name: self.customer_name,
                phone: self.customer_phone,
                address: self.customer_address,
            },
            items,
            total_items: self.total_items,
            total_before_tax_cents: self.total_before_tax_cents,
            total_tax_cents: self.total_tax_cents,
            grand_total_cents: self.grand_total_cents,
            returned_amount_cents: self.returned_amount_cents,
            payment: PaymentSplit {
                mode: self.payment_mode,
                cash_amount_cents: self.cash_amount_cents,
                upi_amount_cents: self.upi_amount_cents,
                card_amount_cents: self.card_amount_cents,
            },
            amount_collected_cents: self.amount_collected_cents,
            balance_amount_cents: self.balance_amount_cents,
            status: self.status,
            delivered_at: self.delivered_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BillItemRow {
    product_id: String,
    warehouse_id: String,
    product_name: String,
    selling_price_cents: i64,
    tax_rate_bps: i64,
    discount: String,
    quantity_boxes: i64,
    quantity_loose: i64,
    items_per_box: i64,
    total_items: i64,
    returned_items: i64,
    total_before_tax_cents: i64,
    tax_amount_cents: i64,
    line_total_cents: i64,
}

impl TryFrom<BillItemRow> for BillItem {
    type Error = DbError;

    fn try_from(row: BillItemRow) -> DbResult<Self> {
        let discount: Discount = serde_json::from_str(&row.discount)
            .map_err(|e| DbError::corrupt("bill_items.discount", e))?;

        Ok(BillItem {
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            product_name: row.product_name,
            selling_price_cents: row.selling_price_cents,
            tax_rate_bps: u32::try_from(row.tax_rate_bps)
                .map_err(|e| DbError::corrupt("bill_items.tax_rate_bps", e))?,
            discount,
            quantity_boxes: row.quantity_boxes,
            quantity_loose: row.quantity_loose,
            items_per_box: row.items_per_box,
            total_items: row.total_items,
            returned_items: row.returned_items,
            total_before_tax_cents: row.total_before_tax_cents,
            tax_amount_cents: row.tax_amount_cents,
            line_total_cents: row.line_total_cents,
        })
    }
}

const SELECT_BILL: &str = r#"
    SELECT id, invoice_number, bill_date,
           customer_name, customer_phone, customer_address,
           total_items, total_before_tax_cents, total_tax_cents, grand_total_cents,
           returned_amount_cents,
           payment_mode, cash_amount_cents, upi_amount_cents, card_amount_cents,
           amount_collected_cents, balance_amount_cents,
           status, delivered_at, created_at, updated_at, version
    FROM bills
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for bill database operations.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Gets a bill with its lines by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bill>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    /// Gets a bill with its lines by invoice number.
    pub async fn get_by_invoice_number(&self, invoice_number: &str) -> DbResult<Option<Bill>> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!("{SELECT_BILL} WHERE invoice_number = ?1");
        let row: Option<BillRow> = sqlx::query_as(&sql)
            .bind(invoice_number)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => {
                let items = Self::fetch_items(&mut conn, &row.id).await?;
                Ok(Some(row.into_bill(items)))
            }
            None => Ok(None),
        }
    }

    /// Lists the most recent bills, newest first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Bill>> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!("{SELECT_BILL} ORDER BY created_at DESC, invoice_number DESC LIMIT ?1");
        let rows: Vec<BillRow> = sqlx::query_as(&sql)
            .bind(limit as i64)
            .fetch_all(&mut *conn)
            .await?;

        let mut bills = Vec::with_capacity(rows.len());
        for row in rows {
            let items = Self::fetch_items(&mut conn, &row.id).await?;
            bills.push(row.into_bill(items));
        }
        Ok(bills)
    }

    /// Gets a bill on an open connection or transaction.
    pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Bill>> {
        let sql = format!("{SELECT_BILL} WHERE id = ?1");
        let row: Option<BillRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => {
                let items = Self::fetch_items(conn, &row.id).await?;
                Ok(Some(row.into_bill(items)))
            }
            None => Ok(None),
        }
    }

    async fn fetch_items(conn: &mut SqliteConnection, bill_id: &str) -> DbResult<Vec<BillItem>> {
        let rows: Vec<BillItemRow> = sqlx::query_as(
            r#"
            SELECT product_id, warehouse_id, product_name, selling_price_cents, tax_rate_bps,
                   discount, quantity_boxes, quantity_loose, items_per_box, total_items,
                   returned_items, total_before_tax_cents, tax_amount_cents, line_total_cents
            FROM bill_items
            WHERE bill_id = ?1
            ORDER BY line_index
            "#,
        )
        .bind(bill_id)
        .fetch_all(&mut *conn)
        .await?;

        rows.into_iter().map(BillItem::try_from).collect()
    }

    /// Inserts a new bill and its lines.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - invoice number already used
    pub async fn insert(conn: &mut SqliteConnection, bill: &Bill) -> DbResult<()> {
        debug!(id = %bill.id, invoice_number = %bill.invoice_number, "Inserting bill");

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, invoice_number, bill_date,
                customer_name, customer_phone, customer_address,
                total_items, total_before_tax_cents, total_tax_cents, grand_total_cents,
                returned_amount_cents,
                payment_mode, cash_amount_cents, upi_amount_cents, card_amount_cents,
                amount_collected_cents, balance_amount_cents,
                status, delivered_at, created_at, updated_at, version
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11,
                ?12, ?13, ?14, ?15,
                ?16, ?17,
                ?18, ?19, ?20, ?21, ?22
            )
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.invoice_number)
        .bind(bill.bill_date)
        .bind(&bill.customer.name)
        .bind(&bill.customer.phone)
        .bind(&bill.customer.address)
        .bind(bill.total_items)
        .bind(bill.total_before_tax_cents)
        .bind(bill.total_tax_cents)
        .bind(bill.grand_total_cents)
        .bind(bill.returned_amount_cents)
        .bind(bill.payment.mode)
        .bind(bill.payment.cash_amount_cents)
        .bind(bill.payment.upi_amount_cents)
        .bind(bill.payment.card_amount_cents)
        .bind(bill.amount_collected_cents)
        .bind(bill.balance_amount_cents)
        .bind(bill.status)
        .bind(bill.delivered_at)
        .bind(bill.created_at)
        .bind(bill.updated_at)
        .bind(bill.version)
        .execute(&mut *conn)
        .await?;

        Self::insert_items(conn, &bill.id, &bill.items).await
    }

    /// Saves a modified bill if nobody else saved it since it was read.
    ///
    /// `bill.version` must be the version that was read. On success the
    /// stored version is `bill.version + 1`, which is returned.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no such bill
    /// * `Err(DbError::ConcurrencyConflict)` - version moved on
    pub async fn save(conn: &mut SqliteConnection, bill: &Bill) -> DbResult<i64> {
        debug!(id = %bill.id, version = bill.version, "Saving bill");

        let next_version = bill.version + 1;
        let result = sqlx::query(
            r#"
            UPDATE bills SET
                bill_date = ?3,
                customer_name = ?4, customer_phone = ?5, customer_address = ?6,
                total_items = ?7, total_before_tax_cents = ?8, total_tax_cents = ?9,
                grand_total_cents = ?10, returned_amount_cents = ?11,
                payment_mode = ?12, cash_amount_cents = ?13, upi_amount_cents = ?14,
                card_amount_cents = ?15,
                amount_collected_cents = ?16, balance_amount_cents = ?17,
                status = ?18, delivered_at = ?19, updated_at = ?20,
                version = ?21
            WHERE id = ?1 AND version = ?2
            "#,
        )
        .bind(&bill.id)
        .bind(bill.version)
        .bind(bill.bill_date)
        .bind(&bill.customer.name)
        .bind(&bill.customer.phone)
        .bind(&bill.customer.address)
        .bind(bill.total_items)
        .bind(bill.total_before_tax_cents)
        .bind(bill.total_tax_cents)
        .bind(bill.grand_total_cents)
        .bind(bill.returned_amount_cents)
        .bind(bill.payment.mode)
        .bind(bill.payment.cash_amount_cents)
        .bind(bill.payment.upi_amount_cents)
        .bind(bill.payment.card_amount_cents)
        .bind(bill.amount_collected_cents)
        .bind(bill.balance_amount_cents)
        .bind(bill.status)
        .bind(bill.delivered_at)
        .bind(bill.updated_at)
        .bind(next_version)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<i64> = sqlx::query_scalar("SELECT version FROM bills WHERE id = ?1")
                .bind(&bill.id)
                .fetch_optional(&mut *conn)
                .await?;

            return Err(match exists {
                Some(_) => DbError::conflict("Bill", &bill.id),
                None => DbError::not_found("Bill", &bill.id),
            });
        }

        sqlx::query("DELETE FROM bill_items WHERE bill_id = ?1")
            .bind(&bill.id)
            .execute(&mut *conn)
            .await?;
        Self::insert_items(conn, &bill.id, &bill.items).await?;

        Ok(next_version)
    }

    async fn insert_items(
        conn: &mut SqliteConnection,
        bill_id: &str,
        items: &[BillItem],
    ) -> DbResult<()> {
        for (line_index, item) in items.iter().enumerate() {
            let discount = serde_json::to_string(&item.discount)
                .map_err(|e| DbError::corrupt("bill_items.discount", e))?;

            sqlx::query(
                r#"
                INSERT INTO bill_items (
                    bill_id, line_index, product_id, warehouse_id, product_name,
                    selling_price_cents, tax_rate_bps, discount,
                    quantity_boxes, quantity_loose, items_per_box, total_items, returned_items,
                    total_before_tax_cents, tax_amount_cents, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                "#,
            )
            .bind(bill_id)
            .bind(line_index as i64)
            .bind(&item.product_id)
            .bind(&item.warehouse_id)
            .bind(&item.product_name)
            .bind(item.selling_price_cents)
            .bind(item.tax_rate_bps as i64)
            .bind(discount)
            .bind(item.quantity_boxes)
            .bind(item.quantity_loose)
            .bind(item.items_per_box)
            .bind(item.total_items)
            .bind(item.returned_items)
            .bind(item.total_before_tax_cents)
            .bind(item.tax_amount_cents)
            .bind(item.line_total_cents)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn bill(id: &str, invoice_number: &str) -> Bill {
        let now = Utc::now();
        Bill {
            id: id.to_string(),
            invoice_number: invoice_number.to_string(),
            bill_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            customer: CustomerSnapshot {
                name: "Ravi Traders".to_string(),
                phone: Some("98450 00000".to_string()),
                address: None,
            },
            items: vec![BillItem {
                product_id: "RICE-5KG".to_string(),
                warehouse_id: "main".to_string(),
                product_name: "Basmati Rice 5kg".to_string(),
                selling_price_cents: 11_800,
                tax_rate_bps: 1800,
                discount: Discount::Percent { bps: 500 },
                quantity_boxes: 2,
                quantity_loose: 5,
                items_per_box: 10,
                total_items: 25,
                returned_items: 0,
                total_before_tax_cents: 250_000,
                tax_amount_cents: 45_000,
                line_total_cents: 295_000,
            }],
            total_items: 25,
            total_before_tax_cents: 250_000,
            total_tax_cents: 45_000,
            grand_total_cents: 295_000,
            returned_amount_cents: 0,
            payment: PaymentSplit {
                mode: PaymentMode::Split,
                cash_amount_cents: 1_000,
                upi_amount_cents: 500,
                card_amount_cents: 0,
            },
            amount_collected_cents: 1_500,
            balance_amount_cents: 293_500,
            status: BillStatus::PartiallyPaid,
            delivered_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let original = bill("b1", "INV-2026-000001");

        let mut tx = db.begin().await.unwrap();
        BillRepository::insert(&mut tx, &original).await.unwrap();
        tx.commit().await.unwrap();

        let loaded = db.bills().get_by_id("b1").await.unwrap().unwrap();
        assert_eq!(loaded.items, original.items);
        assert_eq!(loaded.payment, original.payment);
        assert_eq!(loaded.status, BillStatus::PartiallyPaid);
        assert_eq!(loaded.customer, original.customer);

        let by_number = db
            .bills()
            .get_by_invoice_number("INV-2026-000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_number.id, "b1");
        assert_eq!(db.bills().list_recent(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_invoice_number_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin().await.unwrap();
        BillRepository::insert(&mut tx, &bill("b1", "INV-2026-000001"))
            .await
            .unwrap();

        let err = BillRepository::insert(&mut tx, &bill("b2", "INV-2026-000001")).await;
        assert!(matches!(err, Err(DbError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn test_save_bumps_version_and_detects_conflict() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        BillRepository::insert(&mut conn, &bill("b1", "INV-2026-000001"))
            .await
            .unwrap();

        let mut first = BillRepository::fetch(&mut conn, "b1").await.unwrap().unwrap();
        let stale = first.clone();

        first.items[0].returned_items = 5;
        assert_eq!(BillRepository::save(&mut conn, &first).await.unwrap(), 1);

        let reloaded = BillRepository::fetch(&mut conn, "b1").await.unwrap().unwrap();
        assert_eq!(reloaded.version, 1);
        assert_eq!(reloaded.items[0].returned_items, 5);

        assert!(matches!(
            BillRepository::save(&mut conn, &stale).await,
            Err(DbError::ConcurrencyConflict { .. })
        ));

        let ghost = bill("nope", "INV-2026-000009");
        assert!(matches!(
            BillRepository::save(&mut conn, &ghost).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
