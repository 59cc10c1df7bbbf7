//! # Request DTOs
//!
//! Strongly-typed request bodies. Unknown fields are rejected at
//! deserialization; `validate()` checks ranges and cross-field rules before
//! any business logic runs.
//!
//! ## Bill Request
//! ```json
//! {
//!   "billDate": "2026-10-19",
//!   "customer": { "name": "Ravi Traders" },
//!   "items": [{
//!     "productId": "RICE-5KG", "warehouseId": "main",
//!     "quantityBoxes": 2, "quantityLoose": 5, "itemsPerBox": 10,
//!     "sellingPrice": 118, "taxPercent": 18
//!   }],
//!   "payment": { "mode": "CASH", "cashAmount": 1000 }
//! }
//! ```
//!
//! Money travels as decimal major units and is held as integer minor units
//! once parsed (see [`crate::wire`]).
//!
//! ## Return Request
//! The addressing mode is declared once for the whole request:
//! ```json
//! { "mode": "INDEX", "items": [{ "itemIndex": 0, "quantityBoxes": 1, "quantityLoose": 20 }] }
//! { "mode": "KEY",   "items": [{ "productId": "RICE-5KG", "warehouseId": "main", "quantityLoose": 3 }] }
//! ```

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::billing::LineInput;
use crate::error::ValidationError;
use crate::money::Money;
use crate::returns::{ReturnLine, ReturnLineRef};
use crate::types::{CustomerSnapshot, Discount, PaymentMode, PaymentSplit, StockKey, TaxRate};
use crate::validation::{
    validate_amount_cents, validate_count, validate_id, validate_items_per_box,
    validate_line_count, validate_note, validate_percentage, ValidationResult,
};

// =============================================================================
// Bill
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    #[default]
    None,
    Percent,
    Cash,
}

/// One line of a create/update bill request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BillItemRequest {
    pub product_id: String,
    pub warehouse_id: String,
    #[serde(default)]
    pub quantity_boxes: i64,
    #[serde(default)]
    pub quantity_loose: i64,
    pub items_per_box: i64,
    /// Tax-inclusive price per piece.
    #[serde(rename = "sellingPrice", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub selling_price_cents: i64,
    #[serde(default)]
    pub tax_percent: f64,
    #[serde(default)]
    pub discount_type: DiscountType,
    /// Percent for PERCENT, major units for CASH.
    #[serde(default)]
    pub discount_value: Option<f64>,
}

impl BillItemRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_id("productId", &self.product_id)?;
        validate_id("warehouseId", &self.warehouse_id)?;
        validate_count("quantityBoxes", self.quantity_boxes)?;
        validate_count("quantityLoose", self.quantity_loose)?;
        validate_items_per_box(self.items_per_box)?;
        validate_amount_cents("sellingPrice", self.selling_price_cents)?;
        validate_percentage("taxPercent", self.tax_percent)?;

        match (self.discount_type, self.discount_value) {
            (DiscountType::None, _) => {}
            (_, None) => return Err(ValidationError::required("discountValue")),
            (DiscountType::Percent, Some(pct)) => validate_percentage("discountValue", pct)?,
            (DiscountType::Cash, Some(amount)) => {
                if !amount.is_finite() {
                    return Err(ValidationError::InvalidFormat {
                        field: "discountValue".to_string(),
                        reason: "cash discount must be a finite number".to_string(),
                    });
                }
                validate_amount_cents("discountValue", major_to_cents(amount))?;
            }
        }

        Ok(())
    }

    pub fn key(&self) -> StockKey {
        StockKey::new(self.product_id.trim(), self.warehouse_id.trim())
    }

    pub fn discount(&self) -> Discount {
        let value = self.discount_value.unwrap_or(0.0);
        match self.discount_type {
            DiscountType::None => Discount::None,
            DiscountType::Percent => Discount::Percent {
                bps: TaxRate::from_percentage(value).bps(),
            },
            DiscountType::Cash => Discount::Cash {
                amount_cents: major_to_cents(value),
            },
        }
    }

    /// Pricing inputs for this line. Call after `validate()`.
    pub fn line_input(&self) -> LineInput {
        LineInput {
            quantity_boxes: self.quantity_boxes,
            quantity_loose: self.quantity_loose,
            items_per_box: self.items_per_box,
            selling_price: Money::from_cents(self.selling_price_cents),
            tax_rate: TaxRate::from_percentage(self.tax_percent),
            discount: self.discount(),
        }
    }
}

/// Rounds decimal major units to minor units; saturates far out of range.
fn major_to_cents(major: f64) -> i64 {
    (major * 100.0).round() as i64
}

/// Tender split as submitted by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PaymentRequest {
    pub mode: PaymentMode,
    #[serde(default, rename = "cashAmount", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub cash_amount_cents: i64,
    #[serde(default, rename = "upiAmount", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub upi_amount_cents: i64,
    #[serde(default, rename = "cardAmount", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub card_amount_cents: i64,
}

impl PaymentRequest {
    /// ## Rules
    /// - No negative tender, none above MAX_AMOUNT_CENTS
    /// - A single-tender mode carries no amount in the other two tenders
    pub fn validate(&self) -> ValidationResult<()> {
        validate_amount_cents("cashAmount", self.cash_amount_cents)?;
        validate_amount_cents("upiAmount", self.upi_amount_cents)?;
        validate_amount_cents("cardAmount", self.card_amount_cents)?;

        let [cash, upi, card] = [
            self.cash_amount_cents,
            self.upi_amount_cents,
            self.card_amount_cents,
        ]
        .map(|amount| amount != 0);
        let foreign = match self.mode {
            PaymentMode::Cash => upi || card,
            PaymentMode::Upi => cash || card,
            PaymentMode::Card => cash || upi,
            PaymentMode::Split => false,
        };
        if foreign {
            return Err(ValidationError::InvalidRequest(format!(
                "{:?} payment may only carry its own tender; use SPLIT for mixed payments",
                self.mode
            )));
        }

        Ok(())
    }

    pub fn to_split(&self) -> PaymentSplit {
        PaymentSplit {
            mode: self.mode,
            cash_amount_cents: self.cash_amount_cents,
            upi_amount_cents: self.upi_amount_cents,
            card_amount_cents: self.card_amount_cents,
        }
    }
}

/// Create or update a bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BillRequest {
    #[ts(as = "String")]
    pub bill_date: NaiveDate,
    #[serde(default)]
    pub customer: CustomerSnapshot,
    pub items: Vec<BillItemRequest>,
    #[serde(default)]
    pub payment: PaymentRequest,
}

impl BillRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_line_count("items", self.items.len())?;
        validate_note("customer.name", Some(&self.customer.name))?;

        let mut seen = HashSet::new();
        for item in &self.items {
            item.validate()?;
            let key = item.key();
            if !seen.insert(key.clone()) {
                return Err(ValidationError::Duplicate {
                    field: "items".to_string(),
                    value: key.to_string(),
                });
            }
        }

        self.payment.validate()
    }
}

/// Replace the payment on an existing bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecordPaymentRequest {
    pub payment: PaymentRequest,
}

impl RecordPaymentRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        self.payment.validate()
    }
}

// =============================================================================
// Returns
// =============================================================================

/// How every line of a return request addresses the bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnAddressing {
    Index,
    Key,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReturnItemRequest {
    #[serde(default)]
    pub item_index: Option<usize>,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub warehouse_id: Option<String>,
    #[serde(default)]
    pub quantity_boxes: i64,
    #[serde(default)]
    pub quantity_loose: i64,
}

impl ReturnItemRequest {
    fn to_line(&self, mode: ReturnAddressing) -> ValidationResult<ReturnLine> {
        validate_count("quantityBoxes", self.quantity_boxes)?;
        validate_count("quantityLoose", self.quantity_loose)?;

        let reference = match (mode, &self.item_index, &self.product_id, &self.warehouse_id) {
            (ReturnAddressing::Index, Some(idx), None, None) => ReturnLineRef::Index(*idx),
            (ReturnAddressing::Key, None, Some(product_id), Some(warehouse_id)) => {
                validate_id("productId", product_id)?;
                validate_id("warehouseId", warehouse_id)?;
                ReturnLineRef::Key(StockKey::new(product_id.trim(), warehouse_id.trim()))
            }
            (ReturnAddressing::Index, ..) => {
                return Err(ValidationError::InvalidRequest(
                    "INDEX mode lines need itemIndex and nothing else".to_string(),
                ))
            }
            (ReturnAddressing::Key, ..) => {
                return Err(ValidationError::InvalidRequest(
                    "KEY mode lines need productId and warehouseId and no itemIndex".to_string(),
                ))
            }
        };

        Ok(ReturnLine {
            reference,
            quantity_boxes: self.quantity_boxes,
            quantity_loose: self.quantity_loose,
        })
    }
}

/// Return goods against a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReturnRequest {
    pub mode: ReturnAddressing,
    pub items: Vec<ReturnItemRequest>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl ReturnRequest {
    /// Validates the request and resolves every line's reference.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::dto::ReturnRequest;
    /// use tally_core::returns::ReturnLineRef;
    ///
    /// let req: ReturnRequest = serde_json::from_str(
    ///     r#"{"mode":"INDEX","items":[{"itemIndex":0,"quantityBoxes":1,"quantityLoose":20}]}"#,
    /// )
    /// .unwrap();
    /// let lines = req.to_lines().unwrap();
    /// assert_eq!(lines[0].reference, ReturnLineRef::Index(0));
    /// ```
    pub fn to_lines(&self) -> ValidationResult<Vec<ReturnLine>> {
        validate_line_count("items", self.items.len())?;
        validate_note("reason", self.reason.as_deref())?;
        validate_note("note", self.note.as_deref())?;

        self.items.iter().map(|item| item.to_line(self.mode)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ManualReturnItemRequest {
    pub product_id: String,
    pub warehouse_id: String,
    #[serde(default)]
    pub quantity_boxes: i64,
    #[serde(default)]
    pub quantity_loose: i64,
    /// Box size of the returned goods; the product's default when absent.
    #[serde(default)]
    pub items_per_box: Option<i64>,
    #[serde(rename = "unitPrice", with = "crate::wire::money")]
    #[ts(type = "number")]
    pub unit_price_cents: i64,
}

impl ManualReturnItemRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_id("productId", &self.product_id)?;
        validate_id("warehouseId", &self.warehouse_id)?;
        validate_count("quantityBoxes", self.quantity_boxes)?;
        validate_count("quantityLoose", self.quantity_loose)?;
        if let Some(ipb) = self.items_per_box {
            validate_items_per_box(ipb)?;
        }
        validate_amount_cents("unitPrice", self.unit_price_cents)
    }

    pub fn key(&self) -> StockKey {
        StockKey::new(self.product_id.trim(), self.warehouse_id.trim())
    }
}

/// Return goods that are not tied to any bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ManualReturnRequest {
    pub items: Vec<ManualReturnItemRequest>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl ManualReturnRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_line_count("items", self.items.len())?;
        validate_note("reason", self.reason.as_deref())?;
        validate_note("note", self.note.as_deref())?;

        for item in &self.items {
            item.validate()?;
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn bill_json(extra_item_field: &str) -> String {
        format!(
            r#"{{
                "billDate": "2026-10-19",
                "items": [{{
                    "productId": "RICE-5KG", "warehouseId": "main",
                    "quantityBoxes": 2, "quantityLoose": 5, "itemsPerBox": 10,
                    "sellingPrice": 118, "taxPercent": 18{}
                }}],
                "payment": {{ "mode": "CASH", "cashAmount": 1000 }}
            }}"#,
            extra_item_field
        )
    }

    #[test]
    fn test_bill_request_parses_and_validates() {
        let req: BillRequest = serde_json::from_str(&bill_json("")).unwrap();
        assert!(req.validate().is_ok());

        let input = req.items[0].line_input();
        assert_eq!(input.tax_rate.bps(), 1800);
        assert_eq!(input.discount, Discount::None);
        assert_eq!(req.items[0].selling_price_cents, 11_800);
        assert_eq!(req.payment.to_split().total().unwrap().cents(), 100_000);
    }

    #[test]
    fn test_cents_suffixed_names_rejected() {
        let result: Result<PaymentRequest, _> =
            serde_json::from_str(r#"{"mode": "CASH", "cashAmountCents": 100000}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_huge_price_fails_validation() {
        let mut req: BillRequest = serde_json::from_str(&bill_json("")).unwrap();
        req.items[0].selling_price_cents = 4_611_686_018_427_387_904;
        req.items[0].quantity_boxes = 0;
        req.items[0].quantity_loose = 2;
        req.items[0].items_per_box = 1;
        assert!(matches!(req.validate(), Err(ValidationError::OutOfRange { .. })));

        req.items[0].selling_price_cents = 11_800;
        req.items[0].quantity_loose = i64::MAX;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_priced_line_at_the_caps_does_not_overflow() {
        let mut req: BillRequest = serde_json::from_str(&bill_json("")).unwrap();
        req.items[0].selling_price_cents = crate::MAX_AMOUNT_CENTS;
        req.items[0].quantity_boxes = crate::MAX_QUANTITY;
        req.items[0].quantity_loose = crate::MAX_QUANTITY;
        req.items[0].items_per_box = crate::MAX_ITEMS_PER_BOX;
        assert!(req.validate().is_ok());

        // Validated inputs reach checked arithmetic: an error, never a panic
        assert!(crate::billing::compute_line(&req.items[0].line_input()).is_err());
    }

    #[test]
    fn test_huge_foreign_tenders_rejected_without_overflow() {
        let payment = PaymentRequest {
            mode: PaymentMode::Cash,
            cash_amount_cents: 0,
            upi_amount_cents: i64::MAX,
            card_amount_cents: 1,
        };
        assert!(payment.validate().is_err());

        let split = PaymentRequest {
            mode: PaymentMode::Split,
            ..payment
        };
        assert!(split.validate().is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<BillRequest, _> = serde_json::from_str(&bill_json(r#", "colour": "red""#));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let result: Result<BillRequest, _> =
            serde_json::from_str(r#"{"items": [], "payment": {"mode": "CASH"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_discounts_convert() {
        let mut req: BillRequest = serde_json::from_str(&bill_json("")).unwrap();

        req.items[0].discount_type = DiscountType::Percent;
        req.items[0].discount_value = Some(12.5);
        assert!(req.validate().is_ok());
        assert_eq!(req.items[0].discount(), Discount::Percent { bps: 1250 });

        req.items[0].discount_type = DiscountType::Cash;
        req.items[0].discount_value = Some(5.0);
        assert!(req.validate().is_ok());
        assert_eq!(req.items[0].discount(), Discount::Cash { amount_cents: 500 });

        req.items[0].discount_value = Some(2.5);
        assert!(req.validate().is_ok());
        assert_eq!(req.items[0].discount(), Discount::Cash { amount_cents: 250 });

        req.items[0].discount_value = Some(-1.0);
        assert!(req.validate().is_err());

        req.items[0].discount_value = None;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_duplicate_lines_rejected() {
        let mut req: BillRequest = serde_json::from_str(&bill_json("")).unwrap();
        let dup = req.items[0].clone();
        req.items.push(dup);
        assert!(matches!(req.validate(), Err(ValidationError::Duplicate { .. })));
    }

    #[test]
    fn test_single_tender_mode_is_strict() {
        let payment = PaymentRequest {
            mode: PaymentMode::Cash,
            cash_amount_cents: 100,
            upi_amount_cents: 50,
            card_amount_cents: 0,
        };
        assert!(payment.validate().is_err());

        let split = PaymentRequest {
            mode: PaymentMode::Split,
            ..payment
        };
        assert!(split.validate().is_ok());
    }

    #[test]
    fn test_return_request_key_mode() {
        let req: ReturnRequest = serde_json::from_str(
            r#"{"mode":"KEY","items":[{"productId":"RICE-5KG","warehouseId":"main","quantityLoose":3}],"reason":"damaged"}"#,
        )
        .unwrap();
        let lines = req.to_lines().unwrap();
        assert_eq!(
            lines[0].reference,
            ReturnLineRef::Key(StockKey::new("RICE-5KG", "main"))
        );
        assert_eq!(lines[0].quantity_loose, 3);
    }

    #[test]
    fn test_return_request_rejects_mixed_addressing() {
        let req: ReturnRequest = serde_json::from_str(
            r#"{"mode":"INDEX","items":[{"itemIndex":0,"quantityLoose":1},{"productId":"p","warehouseId":"w","quantityLoose":1}]}"#,
        )
        .unwrap();
        assert!(req.to_lines().is_err());

        let req: ReturnRequest = serde_json::from_str(
            r#"{"mode":"KEY","items":[{"productId":"p","quantityLoose":1}]}"#,
        )
        .unwrap();
        assert!(req.to_lines().is_err());
    }

    #[test]
    fn test_return_request_rejects_negative_quantity() {
        let req: ReturnRequest =
            serde_json::from_str(r#"{"mode":"INDEX","items":[{"itemIndex":0,"quantityLoose":-1}]}"#)
                .unwrap();
        assert!(req.to_lines().is_err());
    }

    #[test]
    fn test_manual_return_request() {
        let req: ManualReturnRequest = serde_json::from_str(
            r#"{"items":[{"productId":"SUGAR-1KG","warehouseId":"main","quantityLoose":4,"unitPrice":45}]}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.items[0].items_per_box, None);
        assert_eq!(req.items[0].unit_price_cents, 4_500);

        let empty: ManualReturnRequest = serde_json::from_str(r#"{"items":[]}"#).unwrap();
        assert!(empty.validate().is_err());
    }
}
