//! # tally-db: Database Layer for Tally
//!
//! SQLite persistence for the billing and stock reconciliation engine, built
//! on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  BillEngine::create(request)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ StockRepo      │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ BillRepo       │    │  _schema.sql │  │   │
//! │  │   │ begin() → tx  │    │ BillReturnRepo │    │              │  │   │
//! │  │   │               │    │ InvoiceCounter │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  │                          ./tally.db                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig, StockRepository};
//!
//! let db = Database::new(DbConfig::new("./tally.db")).await?;
//!
//! let mut tx = db.begin().await?;
//! StockRepository::adjust(&mut tx, &key, -25, 10).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::bill::BillRepository;
pub use repository::bill_return::BillReturnRepository;
pub use repository::invoice::InvoiceCounterRepository;
pub use repository::product::ProductRepository;
pub use repository::stock::{AdjustOutcome, StockRepository};

// Transactions are handed to repository functions as plain connections
pub use sqlx::{Sqlite, SqliteConnection, Transaction};
