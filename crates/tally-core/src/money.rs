//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TAX-INCLUSIVE PRICES AND FLOATS DON'T MIX                              │
//! │                                                                         │
//! │  Extracting 18% GST from a tax-inclusive gross in floating point:       │
//! │    2950.0 * 18.0 / 118.0 = 449.99999999999994  ❌                       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (paise/cents)                        │
//! │    295000 * 1800 / 11800 = 45000                                        │
//! │    Rounding happens exactly once, in one documented place               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::types::TaxRate;
//!
//! let gross = Money::from_cents(295_000);
//! let tax = gross.extract_inclusive_tax(TaxRate::from_bps(1800));
//! assert_eq!(tax.cents(), 45_000);
//! assert_eq!((gross - tax).cents(), 250_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Where Money is Used
/// ```text
/// BillItem.selling_price ──► line gross ──► tax extraction ──► line before-tax
///                                │
///                                ▼
///                  Bill.grand_total ──► payment validation ──► balance
///                                │
///                                ▼
///                  return refund ──► new grand total ──► refund owed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from the smallest currency unit.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let price = Money::from_cents(11_800); // 118.00
    /// assert_eq!(price.cents(), 11_800);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in the smallest currency unit.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative values to zero.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-10).clamp_zero(), Money::zero());
    /// assert_eq!(Money::from_cents(10).clamp_zero().cents(), 10);
    /// ```
    #[inline]
    pub const fn clamp_zero(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Recovers the tax contained in a tax-inclusive amount.
    ///
    /// ## Formula
    /// ```text
    /// tax = gross × bps / (10000 + bps)
    /// ```
    /// Rounded half-up on the absolute value. The before-tax part is always
    /// derived as `gross - tax` so the two parts add back to the gross exactly.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    /// use tally_core::types::TaxRate;
    ///
    /// // 100.00 inclusive of 5% GST contains 4.76 of tax
    /// let tax = Money::from_cents(10_000).extract_inclusive_tax(TaxRate::from_bps(500));
    /// assert_eq!(tax.cents(), 476);
    /// ```
    pub fn extract_inclusive_tax(&self, rate: TaxRate) -> Money {
        if rate.bps() == 0 {
            return Money::zero();
        }

        // i128 keeps large gross × bps products from overflowing
        let divisor = 10_000i128 + rate.bps() as i128;
        let numerator = (self.0 as i128).abs() * rate.bps() as i128;
        let tax = (numerator + divisor / 2) / divisor;

        if self.0 < 0 {
            Money::from_cents(-(tax as i64))
        } else {
            Money::from_cents(tax as i64)
        }
    }

    /// Multiplies a per-piece price by a piece count.
    ///
    /// Returns `None` when the product does not fit in `i64`.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(11_800);
    /// assert_eq!(unit_price.multiply_quantity(25).unwrap().cents(), 295_000);
    /// assert!(Money::from_cents(i64::MAX / 2).multiply_quantity(3).is_none());
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sums amounts, returning `None` if any partial sum overflows.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(iter: I) -> Option<Self> {
        iter.into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ## Arguments
    /// * `discount_bps` - Discount in basis points (1000 = 10%)
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let price = Money::from_cents(10_000);
    /// assert_eq!(price.apply_percentage_discount(1000).cents(), 9_000);
    /// ```
    pub fn apply_percentage_discount(&self, discount_bps: u32) -> Money {
        let discount_amount = (self.0 as i128 * discount_bps as i128 + 5000) / 10000;
        Money::from_cents(self.0 - discount_amount as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented display, two decimal places, no currency symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
