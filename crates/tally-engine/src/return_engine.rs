//! # Return Engine
//!
//! Takes goods back against a bill, or off-bill as a manual return.
//!
//! ```text
//!   ReturnRequest ─► resolve + cap lines (core) ─► credit stock per line
//!        │                                             │ missing record?
//!        │                                             └─► warn, skip credit
//!        ▼
//!   settle money ─► save bill (version check) ─► append BillReturn ─► COMMIT
//! ```
//!
//! Stock credit is the one best-effort step: a line whose stock record is
//! gone is still refunded, and its snapshot says `stockCredited: false`.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use tally_core::dto::{ManualReturnRequest, ReturnRequest};
use tally_core::returns::{apply_return, plan_manual_return, plan_return, settle, ManualReturnLine, ReturnPlan};
use tally_core::{BillReturn, Money, ReturnLineSnapshot, ReturnOutcome};
use tally_db::{BillRepository, BillReturnRepository, Database, ProductRepository, SqliteConnection};

use crate::bill_engine::load_bill;
use crate::error::{EngineError, EngineResult};
use crate::ledger::credit_returned;

#[derive(Debug, Clone)]
pub struct ReturnEngine {
    db: Database,
}

impl ReturnEngine {
    pub fn new(db: Database) -> Self {
        ReturnEngine { db }
    }

    /// Processes a (partial or full) return against a bill.
    ///
    /// ## Errors
    /// - `Validation` for a malformed request or when nothing is returnable
    /// - `NotFound` if the bill or any referenced line does not exist
    pub async fn process_return(
        &self,
        bill_id: &str,
        request: &ReturnRequest,
    ) -> EngineResult<ReturnOutcome> {
        let lines = request.to_lines()?;

        let mut tx = self.db.begin().await?;
        let mut bill = load_bill(&mut tx, bill_id).await?;

        let plan = plan_return(&bill, &lines)?;
        let snapshots = credit_lines(&mut tx, &plan).await?;

        let settlement = settle(
            bill.grand_total(),
            bill.amount_collected(),
            bill.status,
            plan.total_amount,
        )?;
        apply_return(&mut bill, &plan, &settlement);
        bill.updated_at = Utc::now();
        bill.version = BillRepository::save(&mut tx, &bill).await?;

        let record = BillReturn {
            id: Uuid::new_v4().to_string(),
            bill_id: Some(bill.id.clone()),
            invoice_number: Some(bill.invoice_number.clone()),
            lines: snapshots,
            total_amount_cents: plan.total_amount.cents(),
            refund_amount_cents: settlement.refund_amount.cents(),
            reason: clean(request.reason.as_deref()),
            note: clean(request.note.as_deref()),
            created_at: Utc::now(),
        };
        BillReturnRepository::insert(&mut tx, &record).await?;
        tx.commit().await?;

        info!(
            bill_id = %bill.id,
            invoice_number = %bill.invoice_number,
            return_id = %record.id,
            total_amount_cents = record.total_amount_cents,
            refund_amount_cents = record.refund_amount_cents,
            status = %bill.status,
            version = bill.version,
            "Return processed"
        );

        Ok(ReturnOutcome {
            bill_id: bill.id,
            return_id: record.id,
            refund_amount_cents: record.refund_amount_cents,
        })
    }

    /// Takes goods back without a bill. The whole amount is refunded.
    ///
    /// Box size defaults to the product's when the request leaves it out.
    pub async fn process_manual_return(
        &self,
        request: &ManualReturnRequest,
    ) -> EngineResult<BillReturn> {
        request.validate()?;

        let mut tx = self.db.begin().await?;

        let mut lines = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let key = item.key();
            let product = ProductRepository::fetch(&mut tx, &key.product_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Product", &key.product_id))?;

            lines.push(ManualReturnLine {
                key,
                product_name: product.name,
                quantity_boxes: item.quantity_boxes,
                quantity_loose: item.quantity_loose,
                items_per_box: item.items_per_box.unwrap_or(product.items_per_box),
                unit_price: Money::from_cents(item.unit_price_cents),
            });
        }

        let plan = plan_manual_return(&lines)?;
        let snapshots = credit_lines(&mut tx, &plan).await?;

        let record = BillReturn {
            id: Uuid::new_v4().to_string(),
            bill_id: None,
            invoice_number: None,
            lines: snapshots,
            total_amount_cents: plan.total_amount.cents(),
            refund_amount_cents: plan.total_amount.cents(),
            reason: clean(request.reason.as_deref()),
            note: clean(request.note.as_deref()),
            created_at: Utc::now(),
        };
        BillReturnRepository::insert(&mut tx, &record).await?;
        tx.commit().await?;

        info!(
            return_id = %record.id,
            lines = record.lines.len(),
            total_amount_cents = record.total_amount_cents,
            "Manual return processed"
        );

        Ok(record)
    }

    /// Returns recorded against a bill, oldest first.
    pub async fn list_returns(&self, bill_id: &str) -> EngineResult<Vec<BillReturn>> {
        if self.db.bills().get_by_id(bill_id).await?.is_none() {
            return Err(EngineError::not_found("Bill", bill_id));
        }
        Ok(self.db.bill_returns().list_for_bill(bill_id).await?)
    }

    /// Off-bill returns, newest first.
    pub async fn list_manual_returns(&self, limit: u32) -> EngineResult<Vec<BillReturn>> {
        Ok(self.db.bill_returns().list_manual(limit).await?)
    }
}

async fn credit_lines(
    conn: &mut SqliteConnection,
    plan: &ReturnPlan,
) -> EngineResult<Vec<ReturnLineSnapshot>> {
    let mut snapshots = Vec::with_capacity(plan.lines.len());
    for line in &plan.lines {
        let credited = credit_returned(conn, &line.key, line.pieces).await?;
        snapshots.push(line.snapshot(credited));
    }
    Ok(snapshots)
}

fn clean(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
