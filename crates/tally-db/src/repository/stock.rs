//! # Stock Repository (Quantity Ledger storage)
//!
//! Every mutation is ONE SQL statement, so two writers touching the same
//! (product, warehouse) can never lose an update.
//!
//! ## Atomic Adjust
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ❌ WRONG: read, compute in memory, write back                          │
//! │     SELECT boxes, loose_items ...   (another writer sneaks in here)    │
//! │     UPDATE stock SET boxes = 2, loose_items = 8                        │
//! │                                                                         │
//! │  ✅ CORRECT: guarded single-statement update                            │
//! │     debit:  UPDATE stock SET boxes = (total - n) / ipb, ...            │
//! │             WHERE total >= n RETURNING ...                             │
//! │     credit: INSERT ... ON CONFLICT DO UPDATE SET boxes = (total+n)/ipb │
//! │             RETURNING ...                                              │
//! │                                                                         │
//! │  total = boxes * items_per_box + loose_items                           │
//! │  Normalization happens inside the statement; CHECK constraints back it │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::{Stock, StockKey};

#[derive(Debug, sqlx::FromRow)]
struct StockRow {
    product_id: String,
    warehouse_id: String,
    boxes: i64,
    items_per_box: i64,
    loose_items: i64,
    updated_at: DateTime<Utc>,
}

impl From<StockRow> for Stock {
    fn from(row: StockRow) -> Self {
        Stock {
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            boxes: row.boxes,
            items_per_box: row.items_per_box,
            loose_items: row.loose_items,
            updated_at: row.updated_at,
        }
    }
}

const RETURNING_STOCK: &str =
    "RETURNING product_id, warehouse_id, boxes, items_per_box, loose_items, updated_at";

/// Result of an atomic adjust.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdjustOutcome {
    /// The adjust was applied; the record as it now stands.
    Applied(Stock),
    /// A debit would have driven the record negative. Nothing changed.
    Insufficient { available: i64 },
}

/// Repository for the stock ledger.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Gets the stock record for a (product, warehouse) pair.
    pub async fn get(&self, key: &StockKey) -> DbResult<Option<Stock>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, key).await
    }

    /// Lists every stock record of a warehouse.
    pub async fn list_for_warehouse(&self, warehouse_id: &str) -> DbResult<Vec<Stock>> {
        let rows: Vec<StockRow> = sqlx::query_as(
            r#"
            SELECT product_id, warehouse_id, boxes, items_per_box, loose_items, updated_at
            FROM stock
            WHERE warehouse_id = ?1
            ORDER BY product_id
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Stock::from).collect())
    }

    /// Gets a stock record on an open connection or transaction.
    pub async fn fetch(conn: &mut SqliteConnection, key: &StockKey) -> DbResult<Option<Stock>> {
        let row: Option<StockRow> = sqlx::query_as(
            r#"
            SELECT product_id, warehouse_id, boxes, items_per_box, loose_items, updated_at
            FROM stock
            WHERE product_id = ?1 AND warehouse_id = ?2
            "#,
        )
        .bind(&key.product_id)
        .bind(&key.warehouse_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(Stock::from))
    }

    /// Atomically adds `delta` pieces to a stock record.
    ///
    /// ## Behavior
    /// - `delta >= 0`: credit; creates the record with `items_per_box` if absent
    /// - `delta < 0`: debit; applied only if the record holds at least `-delta`
    ///   pieces, otherwise [`AdjustOutcome::Insufficient`] and nothing changes.
    ///   A missing record counts as zero available.
    ///
    /// `items_per_box` is only used when the record is created; an existing
    /// record keeps its own box size. Callers validate it is at least 1.
    pub async fn adjust(
        conn: &mut SqliteConnection,
        key: &StockKey,
        delta: i64,
        items_per_box: i64,
    ) -> DbResult<AdjustOutcome> {
        debug!(
            product_id = %key.product_id,
            warehouse_id = %key.warehouse_id,
            delta,
            "Adjusting stock"
        );

        if delta >= 0 {
            let stock = Self::upsert_credit(conn, key, delta, items_per_box).await?;
            return Ok(AdjustOutcome::Applied(stock));
        }

        let pieces = -delta;
        let sql = format!(
            r#"
            UPDATE stock SET
                boxes = (boxes * items_per_box + loose_items - ?3) / items_per_box,
                loose_items = (boxes * items_per_box + loose_items - ?3) % items_per_box,
                updated_at = ?4
            WHERE product_id = ?1 AND warehouse_id = ?2
              AND boxes * items_per_box + loose_items >= ?3
            {RETURNING_STOCK}
            "#
        );

        let row: Option<StockRow> = sqlx::query_as(&sql)
            .bind(&key.product_id)
            .bind(&key.warehouse_id)
            .bind(pieces)
            .bind(Utc::now())
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(AdjustOutcome::Applied(row.into())),
            None => {
                // Reporting only; the guard above already refused the debit
                let available = Self::fetch(conn, key)
                    .await?
                    .map(|s| s.total_items())
                    .unwrap_or(0);
                debug!(
                    product_id = %key.product_id,
                    warehouse_id = %key.warehouse_id,
                    available,
                    requested = pieces,
                    "Stock debit refused"
                );
                Ok(AdjustOutcome::Insufficient { available })
            }
        }
    }

    /// Atomically credits an EXISTING record. Returns `None` when there is no
    /// record for the key; nothing is created in that case.
    pub async fn credit_existing(
        conn: &mut SqliteConnection,
        key: &StockKey,
        pieces: i64,
    ) -> DbResult<Option<Stock>> {
        debug!(
            product_id = %key.product_id,
            warehouse_id = %key.warehouse_id,
            pieces,
            "Crediting existing stock"
        );

        let sql = format!(
            r#"
            UPDATE stock SET
                boxes = (boxes * items_per_box + loose_items + ?3) / items_per_box,
                loose_items = (boxes * items_per_box + loose_items + ?3) % items_per_box,
                updated_at = ?4
            WHERE product_id = ?1 AND warehouse_id = ?2
            {RETURNING_STOCK}
            "#
        );

        let row: Option<StockRow> = sqlx::query_as(&sql)
            .bind(&key.product_id)
            .bind(&key.warehouse_id)
            .bind(pieces)
            .bind(Utc::now())
            .fetch_optional(&mut *conn)
            .await?;

        Ok(row.map(Stock::from))
    }

    async fn upsert_credit(
        conn: &mut SqliteConnection,
        key: &StockKey,
        pieces: i64,
        items_per_box: i64,
    ) -> DbResult<Stock> {
        // In DO UPDATE, bare column names refer to the existing row
        let sql = format!(
            r#"
            INSERT INTO stock (product_id, warehouse_id, boxes, items_per_box, loose_items, updated_at)
            VALUES (?1, ?2, ?3 / ?4, ?4, ?3 % ?4, ?5)
            ON CONFLICT (product_id, warehouse_id) DO UPDATE SET
                boxes = (boxes * items_per_box + loose_items + ?3) / items_per_box,
                loose_items = (boxes * items_per_box + loose_items + ?3) % items_per_box,
                updated_at = excluded.updated_at
            {RETURNING_STOCK}
            "#
        );

        let row: StockRow = sqlx::query_as(&sql)
            .bind(&key.product_id)
            .bind(&key.warehouse_id)
            .bind(pieces)
            .bind(items_per_box)
            .bind(Utc::now())
            .fetch_one(&mut *conn)
            .await?;

        Ok(row.into())
    }

    /// Overwrites a record with an absolute quantity (seeding and stock counts).
    ///
    /// Not for sales or returns; those go through [`adjust`](Self::adjust).
    pub async fn set(&self, stock: &Stock) -> DbResult<()> {
        debug!(
            product_id = %stock.product_id,
            warehouse_id = %stock.warehouse_id,
            boxes = stock.boxes,
            loose_items = stock.loose_items,
            "Setting stock"
        );

        sqlx::query(
            r#"
            INSERT INTO stock (product_id, warehouse_id, boxes, items_per_box, loose_items, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (product_id, warehouse_id) DO UPDATE SET
                boxes = excluded.boxes,
                items_per_box = excluded.items_per_box,
                loose_items = excluded.loose_items,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&stock.product_id)
        .bind(&stock.warehouse_id)
        .bind(stock.boxes)
        .bind(stock.items_per_box)
        .bind(stock.loose_items)
        .bind(stock.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};

    async fn seeded(boxes: i64, loose: i64) -> (Database, StockKey) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let key = StockKey::new("RICE-5KG", "main");
        db.stock()
            .set(&Stock {
                product_id: key.product_id.clone(),
                warehouse_id: key.warehouse_id.clone(),
                boxes,
                items_per_box: 10,
                loose_items: loose,
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
        (db, key)
    }

    #[tokio::test]
    async fn test_debit_renormalizes() {
        let (db, key) = seeded(5, 3).await;
        let mut conn = db.pool().acquire().await.unwrap();

        let outcome = StockRepository::adjust(&mut conn, &key, -25, 10).await.unwrap();
        match outcome {
            AdjustOutcome::Applied(stock) => {
                assert_eq!((stock.boxes, stock.loose_items), (2, 8));
                assert_eq!(stock.total_items(), 28);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_debit_refused_when_short() {
        let (db, key) = seeded(2, 0).await;
        let mut conn = db.pool().acquire().await.unwrap();

        let outcome = StockRepository::adjust(&mut conn, &key, -21, 10).await.unwrap();
        assert_eq!(outcome, AdjustOutcome::Insufficient { available: 20 });
        drop(conn);

        let stock = db.stock().get(&key).await.unwrap().unwrap();
        assert_eq!(stock.total_items(), 20);
    }

    #[tokio::test]
    async fn test_debit_on_missing_record() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let key = StockKey::new("nothing", "main");

        let outcome = StockRepository::adjust(&mut conn, &key, -1, 10).await.unwrap();
        assert_eq!(outcome, AdjustOutcome::Insufficient { available: 0 });
        assert!(StockRepository::fetch(&mut conn, &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_credit_creates_record() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let key = StockKey::new("SUGAR-1KG", "annex");

        let outcome = StockRepository::adjust(&mut conn, &key, 27, 12).await.unwrap();
        let AdjustOutcome::Applied(stock) = outcome else {
            panic!("credit must apply");
        };
        assert_eq!((stock.boxes, stock.items_per_box, stock.loose_items), (2, 12, 3));

        // Existing box size wins over the one passed in
        let outcome = StockRepository::adjust(&mut conn, &key, 10, 99).await.unwrap();
        let AdjustOutcome::Applied(stock) = outcome else {
            panic!("credit must apply");
        };
        assert_eq!((stock.boxes, stock.items_per_box, stock.loose_items), (3, 12, 1));
    }

    #[tokio::test]
    async fn test_credit_existing_skips_missing() {
        let (db, key) = seeded(0, 4).await;
        let mut conn = db.pool().acquire().await.unwrap();

        let stock = StockRepository::credit_existing(&mut conn, &key, 25)
            .await
            .unwrap()
            .unwrap();
        assert_eq!((stock.boxes, stock.loose_items), (2, 9));

        let missing = StockKey::new("RICE-5KG", "elsewhere");
        assert!(StockRepository::credit_existing(&mut conn, &missing, 5)
            .await
            .unwrap()
            .is_none());
        assert!(StockRepository::fetch(&mut conn, &missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_check_constraint_rejects_unnormalized_set() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let result = db
            .stock()
            .set(&Stock {
                product_id: "p".to_string(),
                warehouse_id: "w".to_string(),
                boxes: 1,
                items_per_box: 10,
                loose_items: 10,
                updated_at: Utc::now(),
            })
            .await;
        assert!(matches!(result, Err(DbError::QueryFailed(_))));
    }

    #[tokio::test]
    async fn test_list_for_warehouse() {
        let (db, _) = seeded(1, 0).await;
        let listed = db.stock().list_for_warehouse("main").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(db.stock().list_for_warehouse("other").await.unwrap().is_empty());
    }
}
