//! # Return Computation
//!
//! Turns a return request into capped piece counts, refund amounts and the
//! bill's post-return money state. The engine applies the stock credits.
//!
//! ## Per-line Algorithm
//! ```text
//!   request line ──► resolve bill line (index OR product+warehouse)
//!                         │
//!                         ▼
//!   requested = boxes × line.items_per_box + loose      (bill's box size)
//!   capped    = min(requested, sold − already returned)
//!   refund    = line.selling_price × capped
//! ```
//!
//! ## Settlement
//! ```text
//!   new_grand_total = max(0, grand_total − Σ refund)
//!   refund_owed     = max(0, collected − new_grand_total)
//!   new_collected   = collected − refund_owed
//!   new_balance     = new_grand_total − new_collected
//!   status          = derive_status(ReturnProcessed, ...)
//! ```

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::quantity::total_pieces;
use crate::status::{derive_status, BillEvent};
use crate::types::{Bill, BillStatus, ReturnLineSnapshot, StockKey};

/// How a return line points at a bill line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnLineRef {
    Index(usize),
    Key(StockKey),
}

impl std::fmt::Display for ReturnLineRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReturnLineRef::Index(idx) => write!(f, "index {}", idx),
            ReturnLineRef::Key(key) => write!(f, "{}", key),
        }
    }
}

/// A validated return request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnLine {
    pub reference: ReturnLineRef,
    pub quantity_boxes: i64,
    pub quantity_loose: i64,
}

/// A manual (off-bill) return line; nothing caps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualReturnLine {
    pub key: StockKey,
    pub product_name: String,
    pub quantity_boxes: i64,
    pub quantity_loose: i64,
    pub items_per_box: i64,
    pub unit_price: Money,
}

/// A return line after resolution and capping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedReturnLine {
    /// Bill line this return draws from; None for manual returns.
    pub item_index: Option<usize>,
    pub key: StockKey,
    pub product_name: String,
    pub quantity_boxes: i64,
    pub quantity_loose: i64,
    pub items_per_box: i64,
    pub pieces: i64,
    pub unit_price: Money,
    pub line_amount: Money,
}

impl PlannedReturnLine {
    /// Freezes the line for the audit record.
    pub fn snapshot(&self, stock_credited: bool) -> ReturnLineSnapshot {
        ReturnLineSnapshot {
            product_id: self.key.product_id.clone(),
            warehouse_id: self.key.warehouse_id.clone(),
            product_name: self.product_name.clone(),
            quantity_boxes: self.quantity_boxes,
            quantity_loose: self.quantity_loose,
            items_per_box: self.items_per_box,
            pieces: self.pieces,
            unit_price_cents: self.unit_price.cents(),
            line_amount_cents: self.line_amount.cents(),
            stock_credited,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnPlan {
    pub lines: Vec<PlannedReturnLine>,
    pub total_amount: Money,
}

/// Resolves and caps every line of a bill return.
///
/// ## Errors
/// - `BillItemNotFound` if any line cannot be resolved (whole request fails)
/// - `NothingToReturn` if no line caps to a positive quantity
pub fn plan_return(bill: &Bill, lines: &[ReturnLine]) -> CoreResult<ReturnPlan> {
    // Pieces already planned per bill line in this request
    let mut planned: HashMap<usize, i64> = HashMap::new();
    let mut out = Vec::new();
    let mut total_amount = Money::zero();

    for line in lines {
        let idx = resolve(bill, &line.reference)?;
        let item = &bill.items[idx];

        let requested = total_pieces(line.quantity_boxes, line.quantity_loose, item.items_per_box)?;
        let already = planned.get(&idx).copied().unwrap_or(0);
        let capped = requested.min(item.returnable_items() - already);

        if capped <= 0 {
            continue;
        }

        let line_amount = refund_for(item.selling_price(), capped)?;
        planned.insert(idx, already + capped);
        total_amount = add_refund(total_amount, line_amount)?;

        out.push(PlannedReturnLine {
            item_index: Some(idx),
            key: item.key(),
            product_name: item.product_name.clone(),
            quantity_boxes: line.quantity_boxes,
            quantity_loose: line.quantity_loose,
            items_per_box: item.items_per_box,
            pieces: capped,
            unit_price: item.selling_price(),
            line_amount,
        });
    }

    if out.is_empty() {
        return Err(CoreError::NothingToReturn);
    }

    Ok(ReturnPlan {
        lines: out,
        total_amount,
    })
}

/// Prices a manual return. Lines that come to zero pieces are dropped.
pub fn plan_manual_return(lines: &[ManualReturnLine]) -> CoreResult<ReturnPlan> {
    let mut out = Vec::new();
    let mut total_amount = Money::zero();

    for line in lines {
        let pieces = total_pieces(line.quantity_boxes, line.quantity_loose, line.items_per_box)?;
        if pieces <= 0 {
            continue;
        }

        let line_amount = refund_for(line.unit_price, pieces)?;
        total_amount = add_refund(total_amount, line_amount)?;

        out.push(PlannedReturnLine {
            item_index: None,
            key: line.key.clone(),
            product_name: line.product_name.clone(),
            quantity_boxes: line.quantity_boxes,
            quantity_loose: line.quantity_loose,
            items_per_box: line.items_per_box,
            pieces,
            unit_price: line.unit_price,
            line_amount,
        });
    }

    if out.is_empty() {
        return Err(CoreError::NothingToReturn);
    }

    Ok(ReturnPlan {
        lines: out,
        total_amount,
    })
}

fn refund_for(unit_price: Money, pieces: i64) -> CoreResult<Money> {
    unit_price
        .multiply_quantity(pieces)
        .ok_or_else(|| ValidationError::overflow("refundAmount").into())
}

fn add_refund(total: Money, line_amount: Money) -> CoreResult<Money> {
    total
        .checked_add(line_amount)
        .ok_or_else(|| ValidationError::overflow("refundAmount").into())
}

fn resolve(bill: &Bill, reference: &ReturnLineRef) -> CoreResult<usize> {
    let found = match reference {
        ReturnLineRef::Index(idx) => (*idx < bill.items.len()).then_some(*idx),
        ReturnLineRef::Key(key) => bill.items.iter().position(|item| {
            item.product_id == key.product_id && item.warehouse_id == key.warehouse_id
        }),
    };

    found.ok_or_else(|| CoreError::BillItemNotFound {
        reference: reference.to_string(),
    })
}

// =============================================================================
// Settlement
// =============================================================================

/// Money state of a bill after a return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnSettlement {
    pub grand_total: Money,
    /// Cash owed back to the customer.
    pub refund_amount: Money,
    pub amount_collected: Money,
    pub balance_amount: Money,
    pub status: BillStatus,
}

/// Computes the settlement for returning `total_returned` worth of goods.
///
/// ## Example
/// ```rust
/// # use tally_core::money::Money;
/// # use tally_core::returns::settle;
/// # use tally_core::types::BillStatus;
/// // Bill of 2950.00, fully paid, whole line returned
/// let s = settle(
///     Money::from_cents(295_000),
///     Money::from_cents(295_000),
///     BillStatus::Delivered,
///     Money::from_cents(295_000),
/// )
/// .unwrap();
/// assert_eq!(s.refund_amount.cents(), 295_000);
/// assert!(s.grand_total.is_zero());
/// assert_eq!(s.status, BillStatus::Delivered);
/// ```
pub fn settle(
    grand_total: Money,
    collected: Money,
    prior: BillStatus,
    total_returned: Money,
) -> CoreResult<ReturnSettlement> {
    let new_grand_total = (grand_total - total_returned).clamp_zero();
    let refund_amount = (collected - new_grand_total).clamp_zero();
    let new_collected = collected - refund_amount;
    let new_balance = new_grand_total - new_collected;
    let status = derive_status(BillEvent::ReturnProcessed, prior, new_balance, new_collected)?;

    Ok(ReturnSettlement {
        grand_total: new_grand_total,
        refund_amount,
        amount_collected: new_collected,
        balance_amount: new_balance,
        status,
    })
}

/// Writes a planned return and its settlement onto the bill.
pub fn apply_return(bill: &mut Bill, plan: &ReturnPlan, settlement: &ReturnSettlement) {
    for line in &plan.lines {
        if let Some(idx) = line.item_index {
            bill.items[idx].returned_items += line.pieces;
        }
    }

    bill.returned_amount_cents += plan.total_amount.cents();
    bill.grand_total_cents = settlement.grand_total.cents();
    bill.amount_collected_cents = settlement.amount_collected.cents();
    bill.balance_amount_cents = settlement.balance_amount.cents();
    bill.status = settlement.status;
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{apply_totals, price_item, LineInput};
    use crate::types::{CustomerSnapshot, Discount, PaymentSplit, TaxRate};
    use chrono::{NaiveDate, Utc};

    fn scenario_bill(collected: i64) -> Bill {
        let now = Utc::now();
        let item = price_item(
            StockKey::new("p1", "main"),
            "Basmati Rice 1kg".to_string(),
            &LineInput {
                quantity_boxes: 2,
                quantity_loose: 5,
                items_per_box: 10,
                selling_price: Money::from_cents(11_800),
                tax_rate: TaxRate::from_bps(1800),
                discount: Discount::None,
            },
        )
        .unwrap();

        let mut bill = Bill {
            id: "b1".to_string(),
            invoice_number: "INV-2026-000001".to_string(),
            bill_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            customer: CustomerSnapshot::default(),
            items: vec![item],
            total_items: 0,
            total_before_tax_cents: 0,
            total_tax_cents: 0,
            grand_total_cents: 0,
            returned_amount_cents: 0,
            payment: PaymentSplit::default(),
            amount_collected_cents: collected,
            balance_amount_cents: 0,
            status: BillStatus::Pending,
            delivered_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        apply_totals(&mut bill).unwrap();
        bill.balance_amount_cents = bill.grand_total_cents - collected;
        bill
    }

    fn by_index(idx: usize, boxes: i64, loose: i64) -> ReturnLine {
        ReturnLine {
            reference: ReturnLineRef::Index(idx),
            quantity_boxes: boxes,
            quantity_loose: loose,
        }
    }

    #[test]
    fn test_return_capped_at_sold() {
        let bill = scenario_bill(0);
        let plan = plan_return(&bill, &[by_index(0, 1, 20)]).unwrap();

        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.lines[0].pieces, 25);
        assert_eq!(plan.total_amount.cents(), 295_000);
    }

    #[test]
    fn test_return_by_key() {
        let bill = scenario_bill(0);
        let line = ReturnLine {
            reference: ReturnLineRef::Key(StockKey::new("p1", "main")),
            quantity_boxes: 0,
            quantity_loose: 3,
        };
        let plan = plan_return(&bill, &[line]).unwrap();
        assert_eq!(plan.lines[0].pieces, 3);
        assert_eq!(plan.lines[0].line_amount.cents(), 35_400);
    }

    #[test]
    fn test_unresolvable_line_fails_whole_request() {
        let bill = scenario_bill(0);
        let err = plan_return(&bill, &[by_index(0, 0, 1), by_index(7, 0, 1)]);
        assert!(matches!(err, Err(CoreError::BillItemNotFound { .. })));

        let missing = ReturnLine {
            reference: ReturnLineRef::Key(StockKey::new("p1", "other")),
            quantity_boxes: 0,
            quantity_loose: 1,
        };
        assert!(plan_return(&bill, &[missing]).is_err());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let bill = scenario_bill(0);
        assert!(matches!(
            plan_return(&bill, &[by_index(0, 0, 0)]),
            Err(CoreError::NothingToReturn)
        ));
    }

    #[test]
    fn test_repeat_returns_never_exceed_sold() {
        let mut bill = scenario_bill(0);

        let plan = plan_return(&bill, &[by_index(0, 2, 0)]).unwrap();
        let s = settle(bill.grand_total(), bill.amount_collected(), bill.status, plan.total_amount)
            .unwrap();
        apply_return(&mut bill, &plan, &s);
        assert_eq!(bill.items[0].returned_items, 20);

        let plan = plan_return(&bill, &[by_index(0, 1, 0)]).unwrap();
        assert_eq!(plan.lines[0].pieces, 5);
        let s = settle(bill.grand_total(), bill.amount_collected(), bill.status, plan.total_amount)
            .unwrap();
        apply_return(&mut bill, &plan, &s);
        assert_eq!(bill.items[0].returnable_items(), 0);

        assert!(plan_return(&bill, &[by_index(0, 0, 1)]).is_err());
    }

    #[test]
    fn test_same_line_twice_in_one_request_is_capped_jointly() {
        let bill = scenario_bill(0);
        let plan = plan_return(&bill, &[by_index(0, 2, 0), by_index(0, 2, 0)]).unwrap();
        let pieces: i64 = plan.lines.iter().map(|l| l.pieces).sum();
        assert_eq!(pieces, 25);
    }

    #[test]
    fn test_settlement_refunds_only_overpayment() {
        // Paid 1000.00 of 2950.00, returns 5 pieces (590.00)
        let s = settle(
            Money::from_cents(295_000),
            Money::from_cents(100_000),
            BillStatus::Pending,
            Money::from_cents(59_000),
        )
        .unwrap();

        assert_eq!(s.grand_total.cents(), 236_000);
        assert!(s.refund_amount.is_zero());
        assert_eq!(s.amount_collected.cents(), 100_000);
        assert_eq!(s.balance_amount.cents(), 136_000);
        assert_eq!(s.status, BillStatus::PartiallyPaid);
    }

    #[test]
    fn test_settlement_overwrites_delivered() {
        let s = settle(
            Money::from_cents(10_000),
            Money::zero(),
            BillStatus::Delivered,
            Money::from_cents(1_000),
        )
        .unwrap();
        assert_eq!(s.status, BillStatus::Pending);
    }

    #[test]
    fn test_manual_return_plan() {
        let plan = plan_manual_return(&[ManualReturnLine {
            key: StockKey::new("p9", "main"),
            product_name: "Sugar 1kg".to_string(),
            quantity_boxes: 1,
            quantity_loose: 2,
            items_per_box: 12,
            unit_price: Money::from_cents(4_500),
        }])
        .unwrap();

        assert_eq!(plan.lines[0].pieces, 14);
        assert_eq!(plan.total_amount.cents(), 63_000);
        assert!(plan.lines[0].item_index.is_none());
    }

    #[test]
    fn test_manual_return_overflow_is_an_error() {
        let line = ManualReturnLine {
            key: StockKey::new("p9", "main"),
            product_name: "Sugar 1kg".to_string(),
            quantity_boxes: 0,
            quantity_loose: 2,
            items_per_box: 1,
            unit_price: Money::from_cents(4_611_686_018_427_387_904),
        };
        assert!(matches!(
            plan_manual_return(&[line]),
            Err(CoreError::Validation(ValidationError::Overflow { .. }))
        ));
    }
}
