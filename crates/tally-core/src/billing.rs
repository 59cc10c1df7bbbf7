//! # Bill Arithmetic
//!
//! Line pricing, bill aggregates and the stock delta planner used by bill
//! creation and bill updates.
//!
//! ## Line Computation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  qty   = boxes × items_per_box + loose                                  │
//! │  price = discount.apply(selling_price)        (tax-inclusive, per piece)│
//! │  gross = qty × price                                                    │
//! │  tax   = gross × bps / (10000 + bps)          (extracted, not added)    │
//! │  before = gross − tax                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Delta Planning
//! ```text
//!   old lines            new lines             ledger deltas
//!   ─────────            ─────────             ─────────────
//!   A: 25 pcs   ──┬──►   A: 30 pcs     ──►     A: −5   (deduct the increase)
//!   B: 10 pcs   ──┼──►   B: 10 pcs     ──►     B: none (diff == 0)
//!   C: 12 pcs   ──┘      (removed)     ──►     C: +12  (restock)
//!                        D: 4 pcs      ──►     D: −4   (fresh deduction)
//! ```
//! The planner walks the UNION of old and new keys, so removed lines are
//! restocked. Submitting the same update twice plans no deltas the second time.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::quantity::total_pieces;
use crate::types::{Bill, BillItem, Discount, StockKey, TaxRate};
use crate::MAX_AMOUNT_CENTS;

// =============================================================================
// Line Computation
// =============================================================================

/// Inputs for pricing one bill line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInput {
    pub quantity_boxes: i64,
    pub quantity_loose: i64,
    pub items_per_box: i64,
    /// Tax-inclusive price per piece, before discount.
    pub selling_price: Money,
    pub tax_rate: TaxRate,
    pub discount: Discount,
}

/// Priced amounts of one bill line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    pub total_items: i64,
    /// Per-piece price after discount.
    pub unit_price: Money,
    pub total_before_tax: Money,
    pub tax_amount: Money,
    /// Gross, tax included.
    pub line_total: Money,
}

/// Prices a single line. Pure, no I/O.
///
/// A line whose gross does not fit in MAX_AMOUNT_CENTS fails with
/// `ValidationError::Overflow`.
///
/// ## Example
/// ```rust
/// use tally_core::billing::{compute_line, LineInput};
/// use tally_core::money::Money;
/// use tally_core::types::{Discount, TaxRate};
///
/// let amounts = compute_line(&LineInput {
///     quantity_boxes: 2,
///     quantity_loose: 5,
///     items_per_box: 10,
///     selling_price: Money::from_cents(11_800),
///     tax_rate: TaxRate::from_bps(1800),
///     discount: Discount::None,
/// })
/// .unwrap();
///
/// assert_eq!(amounts.total_items, 25);
/// assert_eq!(amounts.line_total.cents(), 295_000);
/// assert_eq!(amounts.tax_amount.cents(), 45_000);
/// assert_eq!(amounts.total_before_tax.cents(), 250_000);
/// ```
pub fn compute_line(input: &LineInput) -> CoreResult<LineAmounts> {
    let total_items = total_pieces(input.quantity_boxes, input.quantity_loose, input.items_per_box)?;

    let unit_price = input.discount.apply(input.selling_price);
    let line_total = unit_price
        .multiply_quantity(total_items)
        .filter(|total| total.cents() <= MAX_AMOUNT_CENTS)
        .ok_or_else(|| ValidationError::overflow("lineTotal"))?;
    let tax_amount = line_total.extract_inclusive_tax(input.tax_rate);

    Ok(LineAmounts {
        total_items,
        unit_price,
        total_before_tax: line_total - tax_amount,
        tax_amount,
        line_total,
    })
}

/// Builds a priced [`BillItem`] with no returns recorded against it.
pub fn price_item(key: StockKey, product_name: String, input: &LineInput) -> CoreResult<BillItem> {
    let amounts = compute_line(input)?;

    Ok(BillItem {
        product_id: key.product_id,
        warehouse_id: key.warehouse_id,
        product_name,
        selling_price_cents: input.selling_price.cents(),
        tax_rate_bps: input.tax_rate.bps(),
        discount: input.discount,
        quantity_boxes: input.quantity_boxes,
        quantity_loose: input.quantity_loose,
        items_per_box: input.items_per_box,
        total_items: amounts.total_items,
        returned_items: 0,
        total_before_tax_cents: amounts.total_before_tax.cents(),
        tax_amount_cents: amounts.tax_amount.cents(),
        line_total_cents: amounts.line_total.cents(),
    })
}

// =============================================================================
// Bill Aggregates
// =============================================================================

/// Sums over all lines of a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BillTotals {
    pub total_items: i64,
    pub total_before_tax: Money,
    pub total_tax: Money,
    pub gross: Money,
}

impl BillTotals {
    /// Sums the lines, failing with `ValidationError::Overflow` if any
    /// aggregate leaves the `i64` range.
    pub fn from_items(items: &[BillItem]) -> CoreResult<Self> {
        items.iter().try_fold(BillTotals::default(), |acc, item| {
            acc.add_line(item)
                .ok_or_else(|| ValidationError::overflow("grandTotal").into())
        })
    }

    fn add_line(self, item: &BillItem) -> Option<Self> {
        Some(BillTotals {
            total_items: self.total_items.checked_add(item.total_items)?,
            total_before_tax: self
                .total_before_tax
                .checked_add(Money::from_cents(item.total_before_tax_cents))?,
            total_tax: self.total_tax.checked_add(Money::from_cents(item.tax_amount_cents))?,
            gross: self.gross.checked_add(item.line_total())?,
        })
    }
}

/// Recomputes the aggregate fields of a bill from its lines.
///
/// `grand_total = max(0, gross - returned_amount)`. Payment fields are left
/// alone; callers re-validate the payment against the new grand total.
pub fn apply_totals(bill: &mut Bill) -> CoreResult<()> {
    let totals = BillTotals::from_items(&bill.items)?;

    bill.total_items = totals.total_items;
    bill.total_before_tax_cents = totals.total_before_tax.cents();
    bill.total_tax_cents = totals.total_tax.cents();
    bill.grand_total_cents = (totals.gross - Money::from_cents(bill.returned_amount_cents))
        .clamp_zero()
        .cents();
    Ok(())
}

/// Rejects bills that list the same (product, warehouse) twice.
pub fn ensure_unique_keys(items: &[BillItem]) -> CoreResult<()> {
    let mut seen = HashSet::new();
    for item in items {
        let key = item.key();
        if !seen.insert(key.clone()) {
            return Err(ValidationError::Duplicate {
                field: "items".to_string(),
                value: key.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

// =============================================================================
// Stock Delta Planning
// =============================================================================

/// One ledger adjustment. Negative deducts, positive restocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDelta {
    pub key: StockKey,
    pub delta_pieces: i64,
    /// Box size to use if the ledger has to create the record.
    pub items_per_box: i64,
}

/// Deltas for a brand-new bill: every line is a full deduction.
pub fn sale_deltas(items: &[BillItem]) -> Vec<StockDelta> {
    items
        .iter()
        .filter(|item| item.total_items != 0)
        .map(|item| StockDelta {
            key: item.key(),
            delta_pieces: -item.total_items,
            items_per_box: item.items_per_box,
        })
        .collect()
}

/// Plans the ledger deltas that turn `old` into `new`.
///
/// ## Rules
/// - Key only in `new`: deduct the full new quantity
/// - Key in both: deduct `new - old` (a negative diff restocks); zero diff is skipped
/// - Key only in `old`: restock the old quantity
/// - Returned pieces carry over to the new line; a line may not shrink below
///   them, and a line with returns may not be removed
///
/// Both slices must have unique keys (see [`ensure_unique_keys`]).
pub fn plan_update(old: &[BillItem], new: &mut [BillItem]) -> CoreResult<Vec<StockDelta>> {
    let old_by_key: BTreeMap<StockKey, &BillItem> = old.iter().map(|i| (i.key(), i)).collect();
    let new_index: BTreeMap<StockKey, usize> =
        new.iter().enumerate().map(|(idx, i)| (i.key(), idx)).collect();

    let keys: BTreeSet<StockKey> = old_by_key.keys().chain(new_index.keys()).cloned().collect();

    let mut deltas = Vec::new();
    for key in keys {
        match (old_by_key.get(&key), new_index.get(&key)) {
            (None, Some(&idx)) => {
                let line = &new[idx];
                if line.total_items != 0 {
                    deltas.push(StockDelta {
                        key,
                        delta_pieces: -line.total_items,
                        items_per_box: line.items_per_box,
                    });
                }
            }
            (Some(old_line), Some(&idx)) => {
                let line = &mut new[idx];
                if line.total_items < old_line.returned_items {
                    return Err(CoreError::Validation(ValidationError::InvalidRequest(format!(
                        "line {} cannot drop below {} already returned pieces",
                        key, old_line.returned_items
                    ))));
                }
                line.returned_items = old_line.returned_items;

                let diff = line.total_items - old_line.total_items;
                if diff != 0 {
                    deltas.push(StockDelta {
                        key,
                        delta_pieces: -diff,
                        items_per_box: line.items_per_box,
                    });
                }
            }
            (Some(old_line), None) => {
                if old_line.returned_items > 0 {
                    return Err(CoreError::Validation(ValidationError::InvalidRequest(format!(
                        "line {} has returned pieces and cannot be removed",
                        key
                    ))));
                }
                if old_line.total_items != 0 {
                    deltas.push(StockDelta {
                        key,
                        delta_pieces: old_line.total_items,
                        items_per_box: old_line.items_per_box,
                    });
                }
            }
            (None, None) => {}
        }
    }

    Ok(deltas)
}

// =============================================================================
// Unit Tests
// =============================================================================
