//! # Repository Module
//!
//! Database repository implementations for Tally.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways In                                          │
//! │                                                                         │
//! │  Reads outside a transaction:                                          │
//! │       db.bills().get_by_id("...")          (&self, uses the pool)      │
//! │                                                                         │
//! │  Anything inside a transaction:                                        │
//! │       let mut tx = db.begin().await?;                                  │
//! │       StockRepository::adjust(&mut tx, ...)  (takes the connection)    │
//! │       BillRepository::insert(&mut tx, ...)                             │
//! │       tx.commit().await?;                                              │
//! │                                                                         │
//! │  Never mix the two while a transaction is open: an in-memory pool has  │
//! │  exactly one connection and the transaction is holding it.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog lookups and inserts
//! - [`StockRepository`](stock::StockRepository) - Atomic quantity ledger
//! - [`BillRepository`](bill::BillRepository) - Bills, lines and versioned saves
//! - [`BillReturnRepository`](bill_return::BillReturnRepository) - Append-only return records
//! - [`InvoiceCounterRepository`](invoice::InvoiceCounterRepository) - Atomic counters

pub mod bill;
pub mod bill_return;
pub mod invoice;
pub mod product;
pub mod stock;
