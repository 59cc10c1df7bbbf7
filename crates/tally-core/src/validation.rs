//! # Validation Module
//!
//! Input validation utilities for Tally request DTOs.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  ├── Unknown fields rejected (deny_unknown_fields)                     │
//! │  └── Missing required fields rejected                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: DTO validate() → THIS MODULE                                 │
//! │  ├── Ranges, signs, lengths                                            │
//! │  └── Cross-field rules (addressing modes, duplicates)                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on stock                                        │
//! │  └── UNIQUE invoice numbers                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_AMOUNT_CENTS, MAX_BILL_LINES, MAX_ITEMS_PER_BOX, MAX_NOTE_LENGTH, MAX_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an entity identifier (product, warehouse, bill).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 64 characters
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_id;
///
/// assert!(validate_id("productId", "RICE-5KG").is_ok());
/// assert!(validate_id("productId", "  ").is_err());
/// ```
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::required(field));
    }

    if id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Validates an optional free-text note (reason, note).
pub fn validate_note(field: &str, note: Option<&str>) -> ValidationResult<()> {
    match note {
        Some(text) if text.len() > MAX_NOTE_LENGTH => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTE_LENGTH,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a box or loose count.
///
/// ## Rules
/// - Must not be negative (zero is allowed: "0 boxes + 7 loose")
/// - At most MAX_QUANTITY
pub fn validate_count(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::must_not_be_negative(field));
    }

    if value > MAX_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a box size.
///
/// ## Rules
/// - Between 1 and MAX_ITEMS_PER_BOX
pub fn validate_items_per_box(items_per_box: i64) -> ValidationResult<()> {
    if !(1..=MAX_ITEMS_PER_BOX).contains(&items_per_box) {
        return Err(ValidationError::OutOfRange {
            field: "itemsPerBox".to_string(),
            min: 1,
            max: MAX_ITEMS_PER_BOX,
        });
    }

    Ok(())
}

/// Validates a money amount in minor units.
///
/// ## Rules
/// - Must not be negative
/// - At most MAX_AMOUNT_CENTS
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_amount_cents;
///
/// assert!(validate_amount_cents("sellingPrice", 11_800).is_ok());
/// assert!(validate_amount_cents("sellingPrice", 0).is_ok());
/// assert!(validate_amount_cents("sellingPrice", -1).is_err());
/// assert!(validate_amount_cents("sellingPrice", i64::MAX).is_err());
/// ```
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::must_not_be_negative(field));
    }

    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a percentage given as a decimal number.
///
/// ## Rules
/// - Finite, between 0 and 100 inclusive
pub fn validate_percentage(field: &str, pct: f64) -> ValidationResult<()> {
    if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in a bill or return request.
///
/// ## Rules
/// - At least one line
/// - At most MAX_BILL_LINES
pub fn validate_line_count(field: &str, lines: usize) -> ValidationResult<()> {
    if lines == 0 {
        return Err(ValidationError::required(field));
    }

    if lines > MAX_BILL_LINES {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_BILL_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("productId", "p-1").is_ok());
        assert!(validate_id("productId", "").is_err());
        assert!(validate_id("productId", &"x".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_count() {
        assert!(validate_count("quantityBoxes", 0).is_ok());
        assert!(validate_count("quantityBoxes", 12).is_ok());
        assert!(validate_count("quantityBoxes", -1).is_err());
        assert!(validate_count("quantityBoxes", MAX_QUANTITY).is_ok());
        assert!(matches!(
            validate_count("quantityLoose", MAX_QUANTITY + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_amount_cents_bounds() {
        assert!(validate_amount_cents("cashAmount", MAX_AMOUNT_CENTS).is_ok());
        assert!(validate_amount_cents("cashAmount", MAX_AMOUNT_CENTS + 1).is_err());
        assert!(validate_amount_cents("cashAmount", 4_611_686_018_427_387_904).is_err());
    }

    #[test]
    fn test_validate_items_per_box() {
        assert!(validate_items_per_box(1).is_ok());
        assert!(validate_items_per_box(24).is_ok());
        assert!(validate_items_per_box(0).is_err());
        assert!(validate_items_per_box(MAX_ITEMS_PER_BOX + 1).is_err());
    }

    #[test]
    fn test_validate_percentage() {
        assert!(validate_percentage("taxPercent", 0.0).is_ok());
        assert!(validate_percentage("taxPercent", 18.0).is_ok());
        assert!(validate_percentage("taxPercent", 100.0).is_ok());
        assert!(validate_percentage("taxPercent", -0.5).is_err());
        assert!(validate_percentage("taxPercent", f64::NAN).is_err());
    }

    #[test]
    fn test_validate_line_count() {
        assert!(validate_line_count("items", 1).is_ok());
        assert!(validate_line_count("items", 0).is_err());
        assert!(validate_line_count("items", MAX_BILL_LINES + 1).is_err());
    }

    #[test]
    fn test_validate_note() {
        assert!(validate_note("reason", None).is_ok());
        assert!(validate_note("reason", Some("damaged")).is_ok());
        assert!(validate_note("reason", Some(&"x".repeat(MAX_NOTE_LENGTH + 1))).is_err());
    }
}
