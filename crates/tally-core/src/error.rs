//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Malformed or out-of-range input                │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  tally-engine errors                                                   │
//! │  ├── EngineError      - Core + Db, one per operation                   │
//! │  └── ApiError         - What the HTTP caller sees: {error: msg}        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → ApiError            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A stock deduction would drive the ledger below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Bill line: 2 boxes + 5 loose (25 pieces)
    ///      │
    ///      ▼
    /// Ledger: 20 pieces available
    ///      │
    ///      ▼
    /// InsufficientStock { available: 20, requested: 25 }
    ///      │
    ///      ▼
    /// Whole bill rejected, nothing deducted
    /// ```
    #[error("Insufficient stock for {product_id} in {warehouse_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        warehouse_id: String,
        available: i64,
        requested: i64,
    },

    /// A piece count that must not be negative was.
    #[error("Quantity must not be negative: {pieces} pieces")]
    NegativeQuantity { pieces: i64 },

    /// Box size must be at least one piece.
    #[error("Invalid items per box: {0} (must be at least 1)")]
    InvalidItemsPerBox(i64),

    /// Payment tenders add up to more than the bill is worth.
    #[error("Payment {paid_cents} exceeds grand total {grand_total_cents}")]
    PaymentExceedsTotal {
        paid_cents: i64,
        grand_total_cents: i64,
    },

    /// A return line could not be matched to a bill line.
    #[error("Bill line not found: {reference}")]
    BillItemNotFound { reference: String },

    /// Every return line capped to zero pieces.
    #[error("Nothing to return: no line has returnable quantity")]
    NothingToReturn,

    /// The bill's status does not allow the requested transition.
    #[error("Bill is {current_status}, cannot {action}")]
    InvalidStatusTransition {
        current_status: String,
        action: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised by request DTO validation before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Arithmetic on otherwise valid inputs left the representable range.
    #[error("{field} is too large")]
    Overflow { field: String },

    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },

    /// Request shape is inconsistent (e.g., mixed return addressing modes).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn must_not_be_negative(field: impl Into<String>) -> Self {
        ValidationError::MustNotBeNegative {
            field: field.into(),
        }
    }

    pub fn overflow(field: impl Into<String>) -> Self {
        ValidationError::Overflow {
            field: field.into(),
        }
    }
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
