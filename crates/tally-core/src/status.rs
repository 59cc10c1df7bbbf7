//! # Bill Status Transitions
//!
//! One table decides every status change. Inputs are the event, the prior
//! status and the signs of the balance and collected amounts.
//!
//! ```text
//! ┌──────────────────┬──────────────────────┬────────────────────┬──────────────────┐
//! │ Event            │ Prior                │ Money state        │ Result           │
//! ├──────────────────┼──────────────────────┼────────────────────┼──────────────────┤
//! │ PaymentRecorded  │ OutForDelivery       │ any                │ OutForDelivery   │
//! │ PaymentRecorded  │ Delivered            │ any                │ Delivered        │
//! │ PaymentRecorded  │ Pending/PartiallyPaid│ balance <= 0       │ Delivered        │
//! │ PaymentRecorded  │ Pending/PartiallyPaid│ collected > 0      │ PartiallyPaid    │
//! │ PaymentRecorded  │ Pending/PartiallyPaid│ otherwise          │ Pending          │
//! │ ReturnProcessed  │ any                  │ balance <= 0       │ Delivered        │
//! │ ReturnProcessed  │ any                  │ collected > 0      │ PartiallyPaid    │
//! │ ReturnProcessed  │ any                  │ otherwise          │ Pending          │
//! │ Dispatched       │ Pending/PartiallyPaid│ any                │ OutForDelivery   │
//! │ Dispatched       │ OutForDelivery       │ any                │ OutForDelivery   │
//! │ Dispatched       │ Delivered            │ any                │ error            │
//! │ DeliveryConfirmed│ any                  │ any                │ Delivered        │
//! └──────────────────┴──────────────────────┴────────────────────┴──────────────────┘
//! ```
//!
//! Payments on open bills and all returns share one settlement rule
//! ([`settlement_status`]), so a bill settled by either path lands on the same
//! status. A return overwrites a DELIVERED status when money is still owed.
//! Delivery itself never looks at the balance.

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::BillStatus;

/// Something that happened to a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillEvent {
    PaymentRecorded,
    ReturnProcessed,
    Dispatched,
    DeliveryConfirmed,
}

impl BillEvent {
    fn action(&self) -> &'static str {
        match self {
            BillEvent::PaymentRecorded => "record payment",
            BillEvent::ReturnProcessed => "process return",
            BillEvent::Dispatched => "dispatch",
            BillEvent::DeliveryConfirmed => "confirm delivery",
        }
    }
}

/// Status implied by the money state alone.
///
/// `balance <= 0` is settled (Delivered), otherwise any collection makes the
/// bill PartiallyPaid, otherwise it is Pending.
pub fn settlement_status(balance: Money, collected: Money) -> BillStatus {
    if !balance.is_positive() {
        BillStatus::Delivered
    } else if collected.is_positive() {
        BillStatus::PartiallyPaid
    } else {
        BillStatus::Pending
    }
}

/// Derives the status that follows `event`.
///
/// ## Example
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::status::{derive_status, BillEvent};
/// use tally_core::types::BillStatus;
///
/// let next = derive_status(
///     BillEvent::ReturnProcessed,
///     BillStatus::Delivered,
///     Money::from_cents(500),
///     Money::from_cents(1000),
/// )
/// .unwrap();
/// assert_eq!(next, BillStatus::PartiallyPaid);
/// ```
pub fn derive_status(
    event: BillEvent,
    prior: BillStatus,
    balance: Money,
    collected: Money,
) -> CoreResult<BillStatus> {
    use BillEvent::*;
    use BillStatus::*;

    let next = match (event, prior) {
        (PaymentRecorded, OutForDelivery) => OutForDelivery,
        (PaymentRecorded, Delivered) => Delivered,
        (PaymentRecorded, Pending | PartiallyPaid) => settlement_status(balance, collected),
        (ReturnProcessed, _) => settlement_status(balance, collected),

        (Dispatched, Pending | PartiallyPaid | OutForDelivery) => OutForDelivery,
        (Dispatched, Delivered) => {
            return Err(CoreError::InvalidStatusTransition {
                current_status: prior.to_string(),
                action: event.action().to_string(),
            })
        }

        (DeliveryConfirmed, _) => Delivered,
    };

    Ok(next)
}
