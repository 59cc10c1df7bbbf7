//! # Quantity Ledger
//!
//! Authoritative available quantity per (product, warehouse). Every mutation
//! goes through [`StockRepository::adjust`], a single guarded statement, so
//! two writers on the same key can never lose an update.
//!
//! ```text
//!   delta < 0 ──► UPDATE ... WHERE total >= -delta     (refused → InsufficientStock)
//!   delta > 0 ──► INSERT ... ON CONFLICT DO UPDATE      (creates the record if absent)
//!   delta = 0 ──► no-op
//! ```

use tracing::{info, warn};

use tally_core::billing::StockDelta;
use tally_core::validation::{validate_count, validate_id, validate_items_per_box};
use tally_core::{CoreError, Stock, StockKey, ValidationError};
use tally_db::{AdjustOutcome, Database, ProductRepository, SqliteConnection, StockRepository};

use crate::error::{EngineError, EngineResult};

/// Stock ledger over an injected database handle.
#[derive(Debug, Clone)]
pub struct QuantityLedger {
    db: Database,
}

impl QuantityLedger {
    pub fn new(db: Database) -> Self {
        QuantityLedger { db }
    }

    /// Current stock for a key, `None` if no record exists.
    pub async fn get(&self, key: &StockKey) -> EngineResult<Option<Stock>> {
        Ok(self.db.stock().get(key).await?)
    }

    /// Every stock record of a warehouse, ordered by product.
    pub async fn list(&self, warehouse_id: &str) -> EngineResult<Vec<Stock>> {
        validate_id("warehouseId", warehouse_id)?;
        Ok(self.db.stock().list_for_warehouse(warehouse_id.trim()).await?)
    }

    /// Adds `delta` pieces (negative deducts) in its own transaction.
    ///
    /// A credit to a missing record creates it with the product's default
    /// box size.
    ///
    /// ## Errors
    /// - `InsufficientStock` if the result would be negative
    /// - `NotFound` if a credit names an unknown product
    pub async fn adjust(&self, key: &StockKey, delta: i64) -> EngineResult<Stock> {
        if delta == 0 {
            return self
                .get(key)
                .await?
                .ok_or_else(|| EngineError::not_found("Stock", key.to_string()));
        }

        let mut tx = self.db.begin().await?;

        let items_per_box = if delta > 0 {
            ProductRepository::fetch(&mut tx, &key.product_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Product", &key.product_id))?
                .items_per_box
        } else {
            // A debit never creates a record
            1
        };

        let stock = apply_delta(
            &mut tx,
            &StockDelta {
                key: key.clone(),
                delta_pieces: delta,
                items_per_box,
            },
        )
        .await?;

        tx.commit().await?;
        Ok(stock)
    }

    /// Purchase intake: credits `pieces` to a key.
    pub async fn restock(&self, key: &StockKey, pieces: i64) -> EngineResult<Stock> {
        if pieces <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "pieces".to_string(),
            }
            .into());
        }
        validate_count("pieces", pieces)?;

        let stock = self.adjust(key, pieces).await?;
        info!(
            product_id = %key.product_id,
            warehouse_id = %key.warehouse_id,
            pieces,
            total = stock.total_items(),
            "Stock restocked"
        );
        Ok(stock)
    }
}

/// Applies one ledger delta on the caller's transaction.
pub(crate) async fn apply_delta(
    conn: &mut SqliteConnection,
    delta: &StockDelta,
) -> EngineResult<Stock> {
    validate_items_per_box(delta.items_per_box)
        .map_err(|_| CoreError::InvalidItemsPerBox(delta.items_per_box))?;

    match StockRepository::adjust(conn, &delta.key, delta.delta_pieces, delta.items_per_box).await? {
        AdjustOutcome::Applied(stock) => Ok(stock),
        AdjustOutcome::Insufficient { available } => Err(CoreError::InsufficientStock {
            product_id: delta.key.product_id.clone(),
            warehouse_id: delta.key.warehouse_id.clone(),
            available,
            requested: -delta.delta_pieces,
        }
        .into()),
    }
}

/// Credits a returned quantity if the stock record exists.
///
/// A missing record is logged and skipped; the caller still settles the
/// money. Returns whether the credit was applied.
pub(crate) async fn credit_returned(
    conn: &mut SqliteConnection,
    key: &StockKey,
    pieces: i64,
) -> EngineResult<bool> {
    match StockRepository::credit_existing(conn, key, pieces).await? {
        Some(_) => Ok(true),
        None => {
            warn!(
                product_id = %key.product_id,
                warehouse_id = %key.warehouse_id,
                pieces,
                "No stock record for returned goods; stock credit skipped"
            );
            Ok(false)
        }
    }
}
