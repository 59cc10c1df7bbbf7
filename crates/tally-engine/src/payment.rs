//! # Payment Reconciler
//!
//! Payment and delivery transitions on a bill. None of these touch stock.
//!
//! ```text
//!   record_payment    validate split ─► collected/balance ─► PaymentRecorded
//!   dispatch          PENDING | PARTIALLY_PAID ─► OUT_FOR_DELIVERY
//!   confirm_delivery  any ─► DELIVERED, deliveredAt = now
//! ```
//!
//! Delivery never looks at the balance; a later return may move a delivered
//! bill back to PARTIALLY_PAID or PENDING.

use chrono::Utc;
use tracing::info;

use tally_core::dto::RecordPaymentRequest;
use tally_core::payment::apply_payment;
use tally_core::status::{derive_status, BillEvent};
use tally_core::{Bill, BillStatus};
use tally_db::{BillRepository, Database};

use crate::bill_engine::load_bill;
use crate::error::EngineResult;

#[derive(Debug, Clone)]
pub struct PaymentReconciler {
    db: Database,
}

impl PaymentReconciler {
    pub fn new(db: Database) -> Self {
        PaymentReconciler { db }
    }

    /// Replaces the bill's payment with the submitted split.
    ///
    /// A split over the grand total is rejected and the stored bill keeps
    /// every field it had.
    pub async fn record_payment(
        &self,
        bill_id: &str,
        request: &RecordPaymentRequest,
    ) -> EngineResult<Bill> {
        request.validate()?;

        let mut tx = self.db.begin().await?;
        let mut bill = load_bill(&mut tx, bill_id).await?;

        apply_payment(&mut bill, request.payment.to_split())?;
        bill.updated_at = Utc::now();
        bill.version = BillRepository::save(&mut tx, &bill).await?;
        tx.commit().await?;

        info!(
            bill_id = %bill.id,
            invoice_number = %bill.invoice_number,
            amount_collected_cents = bill.amount_collected_cents,
            balance_amount_cents = bill.balance_amount_cents,
            status = %bill.status,
            "Payment recorded"
        );

        Ok(bill)
    }

    /// Marks a bill as out for delivery.
    pub async fn dispatch(&self, bill_id: &str) -> EngineResult<Bill> {
        self.transition(bill_id, BillEvent::Dispatched).await
    }

    /// Marks a bill delivered and stamps the delivery time.
    pub async fn confirm_delivery(&self, bill_id: &str) -> EngineResult<Bill> {
        self.transition(bill_id, BillEvent::DeliveryConfirmed).await
    }

    async fn transition(&self, bill_id: &str, event: BillEvent) -> EngineResult<Bill> {
        let mut tx = self.db.begin().await?;
        let mut bill = load_bill(&mut tx, bill_id).await?;

        let status = derive_status(
            event,
            bill.status,
            bill.balance_amount(),
            bill.amount_collected(),
        )?;
        let now = Utc::now();

        bill.status = status;
        if status == BillStatus::Delivered {
            bill.delivered_at = Some(now);
        }
        bill.updated_at = now;
        bill.version = BillRepository::save(&mut tx, &bill).await?;
        tx.commit().await?;

        info!(
            bill_id = %bill.id,
            invoice_number = %bill.invoice_number,
            event = ?event,
            status = %bill.status,
            "Bill status changed"
        );

        Ok(bill)
    }
}
