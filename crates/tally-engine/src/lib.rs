//! # tally-engine: Billing & Stock Reconciliation
//!
//! Runs tally-core arithmetic against tally-db persistence. Every mutation is
//! one database transaction.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        tally-engine                                     │
//! │                                                                         │
//! │   ┌──────────────┐   ┌───────────────┐   ┌──────────────────────┐      │
//! │   │  BillEngine  │   │ ReturnEngine  │   │  PaymentReconciler   │      │
//! │   │ create/update│   │ bill + manual │   │ pay/dispatch/deliver │      │
//! │   └──┬────────┬──┘   └──────┬────────┘   └──────────┬───────────┘      │
//! │      │        │             │                       │                   │
//! │      │        ▼             ▼                       │                   │
//! │      │   ┌─────────────────────────┐                │                   │
//! │      │   │     QuantityLedger      │                │                   │
//! │      │   │ atomic adjust / restock │                │                   │
//! │      │   └─────────────────────────┘                │                   │
//! │      ▼                                              ▼                   │
//! │   ┌──────────────────┐          ┌──────────────────────────────────┐   │
//! │   │ InvoiceSequencer │          │  Database (injected, pooled)     │   │
//! │   └──────────────────┘          └──────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let config = EngineConfig::load()?;
//! telemetry::init_tracing(config.log_filter.as_deref());
//!
//! let tally = Tally::open(&config).await?;
//! let bill = tally.bills.create(&request).await?;
//! ```

pub mod bill_engine;
pub mod config;
pub mod error;
pub mod ledger;
pub mod payment;
pub mod return_engine;
pub mod sequencer;
pub mod telemetry;

pub use bill_engine::BillEngine;
pub use config::{ConfigError, EngineConfig};
pub use error::{ApiError, EngineError, EngineResult, ErrorBody, ErrorCode};
pub use ledger::QuantityLedger;
pub use payment::PaymentReconciler;
pub use return_engine::ReturnEngine;
pub use sequencer::InvoiceSequencer;

use tally_db::Database;

/// All engines over one shared database handle.
#[derive(Debug, Clone)]
pub struct Tally {
    pub db: Database,
    pub ledger: QuantityLedger,
    pub sequencer: InvoiceSequencer,
    pub bills: BillEngine,
    pub returns: ReturnEngine,
    pub payments: PaymentReconciler,
}

impl Tally {
    pub fn new(db: Database, config: &EngineConfig) -> Self {
        let sequencer = InvoiceSequencer::from_config(db.clone(), config);

        Tally {
            ledger: QuantityLedger::new(db.clone()),
            bills: BillEngine::new(db.clone(), sequencer.clone()),
            returns: ReturnEngine::new(db.clone()),
            payments: PaymentReconciler::new(db.clone()),
            sequencer,
            db,
        }
    }

    /// Connects to the configured database, running migrations.
    pub async fn open(config: &EngineConfig) -> EngineResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(Self::new(db, config))
    }
}
