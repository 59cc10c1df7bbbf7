//! # Bill Return Repository
//!
//! Append-only audit records. There is no update or delete here, and a
//! trigger in the schema refuses `UPDATE` on the table.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::{BillReturn, ReturnLineSnapshot};

#[derive(Debug, sqlx::FromRow)]
struct BillReturnRow {
    id: String,
    bill_id: Option<String>,
    invoice_number: Option<String>,
    lines: String,
    total_amount_cents: i64,
    refund_amount_cents: i64,
    reason: Option<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<BillReturnRow> for BillReturn {
    type Error = DbError;

    fn try_from(row: BillReturnRow) -> DbResult<Self> {
        let lines: Vec<ReturnLineSnapshot> = serde_json::from_str(&row.lines)
            .map_err(|e| DbError::corrupt("bill_returns.lines", e))?;

        Ok(BillReturn {
            id: row.id,
            bill_id: row.bill_id,
            invoice_number: row.invoice_number,
            lines,
            total_amount_cents: row.total_amount_cents,
            refund_amount_cents: row.refund_amount_cents,
            reason: row.reason,
            note: row.note,
            created_at: row.created_at,
        })
    }
}

const SELECT_RETURN: &str = r#"
    SELECT id, bill_id, invoice_number, lines, total_amount_cents, refund_amount_cents,
           reason, note, created_at
    FROM bill_returns
"#;

#[derive(Debug, Clone)]
pub struct BillReturnRepository {
    pool: SqlitePool,
}

impl BillReturnRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BillReturnRepository { pool }
    }

    /// Appends a return record inside the caller's transaction.
    pub async fn insert(conn: &mut SqliteConnection, record: &BillReturn) -> DbResult<()> {
        debug!(
            id = %record.id,
            bill_id = ?record.bill_id,
            total_amount_cents = record.total_amount_cents,
            "Inserting bill return"
        );

        let lines = serde_json::to_string(&record.lines)
            .map_err(|e| DbError::corrupt("bill_returns.lines", e))?;

        sqlx::query(
            r#"
            INSERT INTO bill_returns (
                id, bill_id, invoice_number, lines, total_amount_cents, refund_amount_cents,
                reason, note, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&record.id)
        .bind(&record.bill_id)
        .bind(&record.invoice_number)
        .bind(lines)
        .bind(record.total_amount_cents)
        .bind(record.refund_amount_cents)
        .bind(&record.reason)
        .bind(&record.note)
        .bind(record.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<BillReturn>> {
        let sql = format!("{SELECT_RETURN} WHERE id = ?1");
        let row: Option<BillReturnRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(BillReturn::try_from).transpose()
    }

    /// Lists the returns of one bill, oldest first.
    pub async fn list_for_bill(&self, bill_id: &str) -> DbResult<Vec<BillReturn>> {
        let sql = format!("{SELECT_RETURN} WHERE bill_id = ?1 ORDER BY created_at, rowid");
        let rows: Vec<BillReturnRow> = sqlx::query_as(&sql)
            .bind(bill_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(BillReturn::try_from).collect()
    }

    /// Lists manual (off-bill) returns, newest first.
    pub async fn list_manual(&self, limit: u32) -> DbResult<Vec<BillReturn>> {
        let sql =
            format!("{SELECT_RETURN} WHERE bill_id IS NULL ORDER BY created_at DESC, rowid DESC LIMIT ?1");
        let rows: Vec<BillReturnRow> = sqlx::query_as(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(BillReturn::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn manual_return(id: &str) -> BillReturn {
        BillReturn {
            id: id.to_string(),
            bill_id: None,
            invoice_number: None,
            lines: vec![ReturnLineSnapshot {
                product_id: "SUGAR-1KG".to_string(),
                warehouse_id: "main".to_string(),
                product_name: "Sugar 1kg".to_string(),
                quantity_boxes: 0,
                quantity_loose: 4,
                items_per_box: 12,
                pieces: 4,
                unit_price_cents: 4_500,
                line_amount_cents: 18_000,
                stock_credited: false,
            }],
            total_amount_cents: 18_000,
            refund_amount_cents: 18_000,
            reason: Some("damaged".to_string()),
            note: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_manual() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let record = manual_return("r1");

        let mut tx = db.begin().await.unwrap();
        BillReturnRepository::insert(&mut tx, &record).await.unwrap();
        tx.commit().await.unwrap();

        let loaded = db.bill_returns().get_by_id("r1").await.unwrap().unwrap();
        assert_eq!(loaded.lines, record.lines);
        assert_eq!(db.bill_returns().list_manual(10).await.unwrap().len(), 1);
        assert!(db.bill_returns().list_for_bill("b1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_records_are_append_only() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        BillReturnRepository::insert(&mut conn, &manual_return("r1"))
            .await
            .unwrap();

        let result = sqlx::query("UPDATE bill_returns SET note = 'edited' WHERE id = 'r1'")
            .execute(&mut *conn)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_rollback_discards_record() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        BillReturnRepository::insert(&mut tx, &manual_return("r1"))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert!(db.bill_returns().get_by_id("r1").await.unwrap().is_none());
    }
}
