//! # Box/Loose Quantities
//!
//! Every quantity in Tally is held in two denominations: whole boxes and
//! loose pieces. This module converts between that pair and a flat piece
//! count.
//!
//! ```text
//!   53 pieces, 10 per box
//!        │
//!        ▼  normalize
//!   ┌──────────┬──────────┐
//!   │ boxes: 5 │ loose: 3 │      5 × 10 + 3 == 53
//!   └──────────┴──────────┘
//! ```
//!
//! Input quantities (bill lines, return requests) may carry `loose >= items_per_box`;
//! only stored stock is required to be normalized.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};

/// A normalized box/loose pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxQuantity {
    pub boxes: i64,
    pub loose: i64,
}

/// Splits a piece count into whole boxes and a loose remainder.
///
/// ## Rules
/// - `items_per_box` must be at least 1
/// - `total_pieces` must not be negative (`NegativeQuantity`)
/// - `0 <= loose < items_per_box` on success
///
/// ## Example
/// ```rust
/// use tally_core::quantity::normalize;
///
/// let q = normalize(28, 10).unwrap();
/// assert_eq!((q.boxes, q.loose), (2, 8));
/// ```
pub fn normalize(total_pieces: i64, items_per_box: i64) -> CoreResult<BoxQuantity> {
    if items_per_box < 1 {
        return Err(CoreError::InvalidItemsPerBox(items_per_box));
    }
    if total_pieces < 0 {
        return Err(CoreError::NegativeQuantity {
            pieces: total_pieces,
        });
    }

    Ok(BoxQuantity {
        boxes: total_pieces / items_per_box,
        loose: total_pieces % items_per_box,
    })
}

/// Flattens a box/loose pair into pieces: `boxes * items_per_box + loose`.
///
/// Fails with `ValidationError::Overflow` instead of wrapping.
///
/// ## Example
/// ```rust
/// use tally_core::quantity::total_pieces;
///
/// assert_eq!(total_pieces(2, 5, 10).unwrap(), 25);
/// ```
pub fn total_pieces(boxes: i64, loose: i64, items_per_box: i64) -> CoreResult<i64> {
    if items_per_box < 1 {
        return Err(CoreError::InvalidItemsPerBox(items_per_box));
    }

    boxes
        .checked_mul(items_per_box)
        .and_then(|pieces| pieces.checked_add(loose))
        .ok_or_else(|| ValidationError::overflow("quantity").into())
}
