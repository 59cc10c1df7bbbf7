//! # Payment Reconciliation
//!
//! Validates a tender split against a bill's grand total and derives
//! `amount_collected`, `balance_amount` and the resulting status.
//!
//! ```text
//!  cash + upi + card ──► sum ──► sum <= grand_total (+ tolerance)?
//!                                   │                  │
//!                                  yes                 no ──► PaymentExceedsTotal
//!                                   │                         (bill untouched)
//!                                   ▼
//!                 collected = sum, balance = grand_total - sum
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::status::{derive_status, BillEvent};
use crate::types::{Bill, PaymentSplit};

/// Accepted overpayment, in minor units.
///
/// Tax extraction happens in integer minor units, so there is no sub-unit
/// rounding residue left to absorb.
pub const PAYMENT_TOLERANCE_CENTS: i64 = 0;

/// Validates a payment split and returns the amount it collects.
///
/// ## Rules
/// - Every tender must be non-negative
/// - The tender sum must fit in `i64`
/// - `cash + upi + card <= grand_total + PAYMENT_TOLERANCE_CENTS`
///
/// ## Example
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::payment::validate_payment;
/// use tally_core::types::{PaymentMode, PaymentSplit};
///
/// let payment = PaymentSplit {
///     mode: PaymentMode::Split,
///     cash_amount_cents: 100_000,
///     upi_amount_cents: 95_000,
///     card_amount_cents: 0,
/// };
/// let collected = validate_payment(&payment, Money::from_cents(295_000)).unwrap();
/// assert_eq!(collected.cents(), 195_000);
/// ```
pub fn validate_payment(payment: &PaymentSplit, grand_total: Money) -> CoreResult<Money> {
    for (field, amount) in [
        ("cashAmount", payment.cash_amount_cents),
        ("upiAmount", payment.upi_amount_cents),
        ("cardAmount", payment.card_amount_cents),
    ] {
        if amount < 0 {
            return Err(ValidationError::must_not_be_negative(field).into());
        }
    }

    let paid = payment.total()?;
    if paid.cents() > grand_total.cents() + PAYMENT_TOLERANCE_CENTS {
        return Err(CoreError::PaymentExceedsTotal {
            paid_cents: paid.cents(),
            grand_total_cents: grand_total.cents(),
        });
    }

    // Never record more than the bill is worth, even inside the tolerance
    Ok(if paid > grand_total { grand_total } else { paid })
}

/// Applies a payment to a bill.
///
/// Validation runs first; on error the bill is left exactly as it was.
pub fn apply_payment(bill: &mut Bill, payment: PaymentSplit) -> CoreResult<()> {
    let collected = validate_payment(&payment, bill.grand_total())?;
    let balance = bill.grand_total() - collected;
    let status = derive_status(BillEvent::PaymentRecorded, bill.status, balance, collected)?;

    bill.payment = payment;
    bill.amount_collected_cents = collected.cents();
    bill.balance_amount_cents = balance.cents();
    bill.status = status;

    Ok(())
}
