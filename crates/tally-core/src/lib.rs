//! # tally-core: Pure Billing & Stock Logic for Tally
//!
//! This crate holds every rule of the billing and stock reconciliation
//! engine as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Caller (CLI / HTTP layer)                       │   │
//! │  │      JSON request ──► DTO ──► engine ──► JSON response          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-engine                                 │   │
//! │  │   Ledger, Sequencer, Bill, Return and Payment engines           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │ quantity │ │ billing  │ │ returns  │ │ payment  │          │   │
//! │  │   │ box/loose│ │ lines    │ │ capping  │ │ tenders  │          │   │
//! │  │   │ normalize│ │ deltas   │ │ refunds  │ │ status   │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │          SQLite queries, migrations, atomic stock updates       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Stock, Bill, BillReturn)
//! - [`money`] - Money type with integer arithmetic
//! - [`quantity`] - Box/loose normalization
//! - [`billing`] - Line pricing, bill totals, update delta planning
//! - [`returns`] - Return capping, refund and settlement
//! - [`payment`] - Payment validation
//! - [`status`] - Bill status transition table
//! - [`invoice`] - Invoice number formatting
//! - [`dto`] - Request bodies and their validation
//! - [`error`] - Domain error types
//! - [`validation`] - Field validators
//! - [`wire`] - Serde adapters for decimal amounts and percentages
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::types::TaxRate;
//!
//! // 25 pieces at 118.00 each, 18% tax included
//! let gross = Money::from_cents(11_800).multiply_quantity(25).unwrap();
//! let tax = gross.extract_inclusive_tax(TaxRate::from_bps(1800));
//!
//! assert_eq!(gross.cents(), 295_000);
//! assert_eq!(tax.cents(), 45_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod dto;
pub mod error;
pub mod invoice;
pub mod money;
pub mod payment;
pub mod quantity;
pub mod returns;
pub mod status;
pub mod types;
pub mod validation;
pub mod wire;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines in a single bill or return request.
pub const MAX_BILL_LINES: usize = 200;

/// Largest accepted box size.
///
/// ## Business Reason
/// Catches typos such as an item count entered as a barcode.
pub const MAX_ITEMS_PER_BOX: i64 = 10_000;

/// Largest box or loose count on a single line.
pub const MAX_QUANTITY: i64 = 1_000_000;

/// Largest single money amount, in minor units (100 billion major units).
///
/// Keeps every bill aggregate far inside `i64` and exact as a JSON number.
pub const MAX_AMOUNT_CENTS: i64 = 10_000_000_000_000;

/// Maximum length of free-text fields (return reason, note, customer name).
pub const MAX_NOTE_LENGTH: usize = 500;
