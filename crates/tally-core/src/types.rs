//! # Domain Types
//!
//! Core domain types used throughout Tally.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Stock      │   │      Bill       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  product_id  ┐  │   │  invoice_number │       │
//! │  │  items_per_box  │   │  warehouse_id┘  │   │  items[]        │       │
//! │  │  selling_price  │   │  boxes          │   │  grand_total    │       │
//! │  └─────────────────┘   │  loose_items    │   │  payment        │       │
//! │                        └─────────────────┘   │  status         │       │
//! │                                              └────────┬────────┘       │
//! │  ┌─────────────────┐   ┌─────────────────┐            │                │
//! │  │    TaxRate      │   │   BillStatus    │   ┌────────▼────────┐       │
//! │  │  bps (u32)      │   │  Pending        │   │   BillReturn    │       │
//! │  │  1800 = 18%     │   │  OutForDelivery │   │  (append-only)  │       │
//! │  └─────────────────┘   │  Delivered      │   └─────────────────┘       │
//! │                        │  PartiallyPaid  │                              │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A [`BillItem`] copies `items_per_box`, `selling_price_cents` and the product
//! name at line-creation time. Later catalog edits never alter history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1800 bps = 18% GST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage, rounded to the nearest basis point.
    ///
    /// Callers validate the range first (see `validation::validate_percentage`).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round().max(0.0) as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product. Read-only input to the billing engines.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub sku: String,
    /// Default pieces per box, used when a stock record is first created.
    pub items_per_box: i64,
    /// Tax-inclusive price per piece.
    #[serde(rename = "sellingPrice", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub selling_price_cents: i64,
    #[serde(rename = "taxPercent", with = "crate::wire::percent")]
    #[ts(type = "number")]
    pub tax_rate_bps: u32,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }
}

// =============================================================================
// Stock
// =============================================================================

/// Composite identity of a stock record: one per (product, warehouse).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockKey {
    pub product_id: String,
    pub warehouse_id: String,
}

impl StockKey {
    pub fn new(product_id: impl Into<String>, warehouse_id: impl Into<String>) -> Self {
        StockKey {
            product_id: product_id.into(),
            warehouse_id: warehouse_id.into(),
        }
    }
}

impl fmt::Display for StockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.product_id, self.warehouse_id)
    }
}

/// Available quantity of a product in a warehouse.
///
/// ## Invariants
/// - `boxes >= 0`, `items_per_box >= 1`
/// - `0 <= loose_items < items_per_box` after every mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    pub product_id: String,
    pub warehouse_id: String,
    pub boxes: i64,
    pub items_per_box: i64,
    pub loose_items: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Stock {
    /// Total pieces held: `boxes * items_per_box + loose_items`.
    #[inline]
    pub fn total_items(&self) -> i64 {
        self.boxes * self.items_per_box + self.loose_items
    }

    pub fn key(&self) -> StockKey {
        StockKey::new(&self.product_id, &self.warehouse_id)
    }
}

// =============================================================================
// Discount
// =============================================================================

/// Per-piece discount applied before the line gross is computed.
///
/// Serialized as `{"type": "PERCENT", "value": 12.5}` or
/// `{"type": "CASH", "value": 5.0}` (major units).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Discount {
    None,
    /// Percentage off the unit price, in basis points.
    Percent {
        #[serde(rename = "value", with = "crate::wire::percent")]
        #[ts(type = "number")]
        bps: u32,
    },
    /// Flat amount off the unit price, floored at zero.
    Cash {
        #[serde(rename = "value", with = "crate::wire::money")]
        #[ts(type = "number")]
        amount_cents: i64,
    },
}

impl Default for Discount {
    fn default() -> Self {
        Discount::None
    }
}

impl Discount {
    /// Applies the discount to a per-piece price.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    /// use tally_core::types::Discount;
    ///
    /// let price = Money::from_cents(10_000);
    /// assert_eq!(Discount::Percent { bps: 1000 }.apply(price).cents(), 9_000);
    /// assert_eq!(Discount::Cash { amount_cents: 20_000 }.apply(price).cents(), 0);
    /// ```
    pub fn apply(&self, unit_price: Money) -> Money {
        match *self {
            Discount::None => unit_price,
            Discount::Percent { bps } => unit_price.apply_percentage_discount(bps),
            Discount::Cash { amount_cents } => {
                (unit_price - Money::from_cents(amount_cents)).clamp_zero()
            }
        }
    }
}

// =============================================================================
// Payment
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
    Cash,
    Upi,
    Card,
    /// Any combination of the three tenders.
    Split,
}

impl Default for PaymentMode {
    fn default() -> Self {
        PaymentMode::Cash
    }
}

/// How a bill was paid, split across the three tenders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSplit {
    pub mode: PaymentMode,
    #[serde(rename = "cashAmount", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub cash_amount_cents: i64,
    #[serde(rename = "upiAmount", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub upi_amount_cents: i64,
    #[serde(rename = "cardAmount", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub card_amount_cents: i64,
}

impl PaymentSplit {
    /// Sum of all three tenders, or `ValidationError::Overflow`.
    pub fn total(&self) -> CoreResult<Money> {
        Money::checked_sum(
            [self.cash_amount_cents, self.upi_amount_cents, self.card_amount_cents]
                .map(Money::from_cents),
        )
        .ok_or_else(|| ValidationError::overflow("payment").into())
    }
}

// =============================================================================
// Bill Status
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    Pending,
    OutForDelivery,
    Delivered,
    PartiallyPaid,
}

impl Default for BillStatus {
    fn default() -> Self {
        BillStatus::Pending
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BillStatus::Pending => "PENDING",
            BillStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            BillStatus::Delivered => "DELIVERED",
            BillStatus::PartiallyPaid => "PARTIALLY_PAID",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Bill
// =============================================================================

/// Customer details frozen onto the bill.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CustomerSnapshot {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// A line of a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillItem {
    pub product_id: String,
    pub warehouse_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    /// Tax-inclusive price per piece at time of sale (frozen).
    #[serde(rename = "sellingPrice", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub selling_price_cents: i64,
    #[serde(rename = "taxPercent", with = "crate::wire::percent")]
    #[ts(type = "number")]
    pub tax_rate_bps: u32,
    pub discount: Discount,
    pub quantity_boxes: i64,
    pub quantity_loose: i64,
    /// Pieces per box at time of sale (frozen).
    pub items_per_box: i64,
    pub total_items: i64,
    /// Pieces already taken back by returns.
    pub returned_items: i64,
    #[serde(rename = "totalBeforeTax", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub total_before_tax_cents: i64,
    #[serde(rename = "taxAmount", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub tax_amount_cents: i64,
    #[serde(rename = "lineTotal", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub line_total_cents: i64,
}

impl BillItem {
    pub fn key(&self) -> StockKey {
        StockKey::new(&self.product_id, &self.warehouse_id)
    }

    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }

    /// Pieces sold on this line that have not been returned yet.
    #[inline]
    pub fn returnable_items(&self) -> i64 {
        (self.total_items - self.returned_items).max(0)
    }
}

/// A sale document.
///
/// ## Invariants
/// - `amount_collected_cents <= grand_total_cents`
/// - `balance_amount_cents == grand_total_cents - amount_collected_cents`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: String,
    pub invoice_number: String,
    #[ts(as = "String")]
    pub bill_date: NaiveDate,
    pub customer: CustomerSnapshot,
    pub items: Vec<BillItem>,
    pub total_items: i64,
    #[serde(rename = "totalBeforeTax", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub total_before_tax_cents: i64,
    #[serde(rename = "totalTax", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub total_tax_cents: i64,
    #[serde(rename = "grandTotal", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub grand_total_cents: i64,
    /// Refund value of all returns processed against this bill.
    #[serde(rename = "returnedAmount", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub returned_amount_cents: i64,
    pub payment: PaymentSplit,
    #[serde(rename = "amountCollected", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub amount_collected_cents: i64,
    #[serde(rename = "balanceAmount", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub balance_amount_cents: i64,
    pub status: BillStatus,
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped on every save.
    pub version: i64,
}

impl Bill {
    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_cents(self.grand_total_cents)
    }

    #[inline]
    pub fn amount_collected(&self) -> Money {
        Money::from_cents(self.amount_collected_cents)
    }

    #[inline]
    pub fn balance_amount(&self) -> Money {
        Money::from_cents(self.balance_amount_cents)
    }
}

// =============================================================================
// Bill Return
// =============================================================================

/// A returned line, frozen into the return record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReturnLineSnapshot {
    pub product_id: String,
    pub warehouse_id: String,
    pub product_name: String,
    pub quantity_boxes: i64,
    pub quantity_loose: i64,
    pub items_per_box: i64,
    /// Pieces actually taken back after capping.
    pub pieces: i64,
    #[serde(rename = "unitPrice", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub unit_price_cents: i64,
    #[serde(rename = "lineAmount", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub line_amount_cents: i64,
    /// False when the stock record was missing and the credit was skipped.
    pub stock_credited: bool,
}

/// Append-only audit record of one return transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillReturn {
    pub id: String,
    /// None for a manual (off-bill) return.
    pub bill_id: Option<String>,
    pub invoice_number: Option<String>,
    pub lines: Vec<ReturnLineSnapshot>,
    #[serde(rename = "totalAmount", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub total_amount_cents: i64,
    #[serde(rename = "refundAmount", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub refund_amount_cents: i64,
    pub reason: Option<String>,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Response of a processed return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReturnOutcome {
    pub bill_id: String,
    pub return_id: String,
    #[serde(rename = "refundAmount", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub refund_amount_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
