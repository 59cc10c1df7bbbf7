//! # Engine and API Errors
//!
//! `EngineError` joins the core and database error types for the engines.
//! `ApiError` is what a caller outside the process sees.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Tally                                  │
//! │                                                                         │
//! │  BillEngine::create(request)                                            │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Result<Bill, EngineError>                                       │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Core Error? ─── CoreError::InsufficientStock ───┐               │  │
//! │  │         │                                        │               │  │
//! │  │         ▼                                        ▼               │  │
//! │  │  Database Error? ─ DbError::ConcurrencyConflict ─ ApiError ─────►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ───────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  409 {"error": "Insufficient stock for RICE-5KG in main: ..."}          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error aborts the operation; the open transaction is dropped and rolls
//! back, so nothing is left half-written.

use serde::Serialize;
use thiserror::Error;

use tally_core::{CoreError, ValidationError};
use tally_db::DbError;

// =============================================================================
// Engine Error
// =============================================================================

/// Errors returned by the engines.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Business rule or validation failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Persistence failure, including lost-update conflicts.
    #[error(transparent)]
    Db(#[from] DbError),

    /// A bill or product the operation depends on does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },
}

impl EngineError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True when retrying the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Db(DbError::ConcurrencyConflict { .. }))
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Db(err.into())
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// API Error
// =============================================================================

/// Error as reported to a caller.
///
/// ## Serialization
/// The full error carries a machine-readable code:
/// ```json
/// { "code": "INSUFFICIENT_STOCK", "message": "Insufficient stock for ..." }
/// ```
/// The response body is just the message, see [`ApiError::body`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error categories and their HTTP status.
///
/// ```text
/// ValidationError      400
/// NotFound             404
/// InsufficientStock    409
/// PaymentExceedsTotal  409
/// ConcurrencyConflict  409  (retry)
/// InvalidState         409
/// DatabaseError        500
/// Internal             500
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    InsufficientStock,
    PaymentExceedsTotal,
    ConcurrencyConflict,
    /// The bill's status forbids the action
    InvalidState,
    DatabaseError,
    Internal,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 400,
            ErrorCode::NotFound => 404,
            ErrorCode::InsufficientStock
            | ErrorCode::PaymentExceedsTotal
            | ErrorCode::ConcurrencyConflict
            | ErrorCode::InvalidState => 409,
            ErrorCode::DatabaseError | ErrorCode::Internal => 500,
        }
    }
}

/// `{ "error": <message> }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.message.clone(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            err @ DbError::ConcurrencyConflict { .. } => {
                ApiError::new(ErrorCode::ConcurrencyConflict, err.to_string())
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::Corrupt { column, message } => {
                tracing::error!(column = %column, "Corrupt stored data: {}", message);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::PaymentExceedsTotal { .. } => ErrorCode::PaymentExceedsTotal,
            CoreError::BillItemNotFound { .. } => ErrorCode::NotFound,
            CoreError::InvalidStatusTransition { .. } => ErrorCode::InvalidState,
            CoreError::InvalidItemsPerBox(_)
            | CoreError::NegativeQuantity { .. }
            | CoreError::NothingToReturn
            | CoreError::Validation(_) => ErrorCode::ValidationError,
        };

        let message = match err {
            CoreError::Validation(e) => e.to_string(),
            other => other.to_string(),
        };

        ApiError::new(code, message)
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Core(e) => e.into(),
            EngineError::Db(e) => e.into(),
            EngineError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_by_category() {
        let insufficient: ApiError = CoreError::InsufficientStock {
            product_id: "RICE-5KG".to_string(),
            warehouse_id: "main".to_string(),
            available: 20,
            requested: 25,
        }
        .into();
        assert_eq!(insufficient.code, ErrorCode::InsufficientStock);
        assert_eq!(insufficient.http_status(), 409);

        let overpaid: ApiError = CoreError::PaymentExceedsTotal {
            paid_cents: 300_000,
            grand_total_cents: 295_000,
        }
        .into();
        assert_eq!(overpaid.http_status(), 409);

        let invalid: ApiError = EngineError::from(ValidationError::required("items")).into();
        assert_eq!(invalid.http_status(), 400);

        let negative: ApiError = CoreError::NegativeQuantity { pieces: -3 }.into();
        assert_eq!(negative.code, ErrorCode::ValidationError);
        assert_eq!(negative.http_status(), 400);

        let missing: ApiError = EngineError::not_found("Bill", "b1").into();
        assert_eq!(missing.http_status(), 404);
        assert_eq!(missing.message, "Bill not found: b1");

        let conflict: ApiError = DbError::conflict("Bill", "b1").into();
        assert_eq!(conflict.code, ErrorCode::ConcurrencyConflict);
        assert_eq!(conflict.http_status(), 409);

        let broken: ApiError = DbError::QueryFailed("syntax error".to_string()).into();
        assert_eq!(broken.http_status(), 500);
        assert_eq!(broken.message, "Database operation failed");
    }

    #[test]
    fn test_body_is_error_object() {
        let err = ApiError::validation("items: required");
        let json = serde_json::to_value(err.body()).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "items: required" }));
    }

    #[test]
    fn test_retryable() {
        assert!(EngineError::Db(DbError::conflict("Bill", "b1")).is_retryable());
        assert!(!EngineError::not_found("Bill", "b1").is_retryable());
    }
}
