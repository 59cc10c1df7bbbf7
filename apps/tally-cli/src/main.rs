//! # Tally CLI
//!
//! JSON in, JSON out. Request bodies are read from a file argument, or from
//! stdin when the argument is missing or `-`.
//!
//! ## Usage
//! ```bash
//! tally bill create bill.json
//! tally bill update <BILL_ID> bill.json
//! tally bill get <BILL_ID>
//! tally bill find INV-2026-000042
//! tally bill list --limit 50
//!
//! tally return apply <BILL_ID> return.json
//! tally return manual return.json
//! tally return list <BILL_ID>
//! tally return list-manual
//!
//! echo '{"payment":{"mode":"CASH","cashAmount":500}}' | tally pay <BILL_ID>
//! tally dispatch <BILL_ID>
//! tally deliver <BILL_ID>
//!
//! tally stock get RICE-5KG main
//! tally stock list main
//! tally stock restock RICE-5KG main 120
//! tally invoice next
//! tally invoice current
//! ```
//!
//! Failures print `{"error": "..."}` and exit with status 1.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use tally_core::dto::{BillRequest, ManualReturnRequest, RecordPaymentRequest, ReturnRequest};
use tally_core::StockKey;
use tally_engine::telemetry::init_tracing;
use tally_engine::{ApiError, EngineConfig, Tally};

#[derive(Debug, Parser)]
#[command(
    name = "tally",
    version,
    about = "Billing & stock reconciliation",
    after_help = "Environment: TALLY_DB_PATH, TALLY_DB_MAX_CONNECTIONS, TALLY_INVOICE_COUNTER, \
                  TALLY_INVOICE_PREFIX, TALLY_LOG"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Bill creation, updates and lookups
    Bill {
        #[command(subcommand)]
        action: BillAction,
    },
    /// Returns against a bill or off-bill
    Return {
        #[command(subcommand)]
        action: ReturnAction,
    },
    /// Replace the payment on a bill
    Pay {
        bill_id: String,
        /// Request body (or - for stdin)
        input: Option<String>,
    },
    /// Mark a bill out for delivery
    Dispatch { bill_id: String },
    /// Confirm delivery of a bill
    Deliver { bill_id: String },
    /// Quantity ledger
    Stock {
        #[command(subcommand)]
        action: StockAction,
    },
    /// Invoice number counter
    Invoice {
        #[command(subcommand)]
        action: InvoiceAction,
    },
}

#[derive(Debug, Subcommand)]
enum BillAction {
    /// Create a bill and deduct its lines from stock
    Create {
        /// Request body (or - for stdin)
        input: Option<String>,
    },
    /// Replace a bill's lines and payment
    Update {
        bill_id: String,
        /// Request body (or - for stdin)
        input: Option<String>,
    },
    Get { bill_id: String },
    /// Look a bill up by invoice number
    Find { invoice_number: String },
    /// Most recent bills first
    List {
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
}

#[derive(Debug, Subcommand)]
enum ReturnAction {
    /// Return goods against a bill
    Apply {
        bill_id: String,
        /// Request body (or - for stdin)
        input: Option<String>,
    },
    /// Return goods without a bill
    Manual {
        /// Request body (or - for stdin)
        input: Option<String>,
    },
    /// Returns recorded against a bill
    List { bill_id: String },
    /// Off-bill returns, newest first
    ListManual {
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
}

#[derive(Debug, Subcommand)]
enum StockAction {
    Get {
        product_id: String,
        warehouse_id: String,
    },
    /// Every stock record of a warehouse
    List { warehouse_id: String },
    /// Purchase intake, in pieces
    Restock {
        product_id: String,
        warehouse_id: String,
        pieces: i64,
    },
}

#[derive(Debug, Subcommand)]
enum InvoiceAction {
    /// Allocate the next invoice number
    Next,
    /// Show the last sequence number handed out
    Current,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = EngineConfig::load().context("loading configuration")?;
    init_tracing(config.log_filter.as_deref());
    debug!(command = ?cli.command, db_path = %config.db_path.display(), "Running command");

    let tally = Tally::open(&config)
        .await
        .context("opening database")?;

    let result = execute(&tally, cli.command).await;
    tally.db.close().await;

    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&err.body())?);
            std::process::exit(1);
        }
    }
}

async fn execute(tally: &Tally, command: Commands) -> Result<Value, ApiError> {
    match command {
        Commands::Bill { action } => match action {
            BillAction::Create { input } => {
                let request: BillRequest = read_body(input_path(input).as_deref())?;
                to_json(&tally.bills.create(&request).await?)
            }
            BillAction::Update { bill_id, input } => {
                let request: BillRequest = read_body(input_path(input).as_deref())?;
                to_json(&tally.bills.update(&bill_id, &request).await?)
            }
            BillAction::Get { bill_id } => to_json(&tally.bills.get(&bill_id).await?),
            BillAction::Find { invoice_number } => {
                to_json(&tally.bills.get_by_invoice_number(&invoice_number).await?)
            }
            BillAction::List { limit } => to_json(&tally.bills.list_recent(limit).await?),
        },

        Commands::Return { action } => match action {
            ReturnAction::Apply { bill_id, input } => {
                let request: ReturnRequest = read_body(input_path(input).as_deref())?;
                to_json(&tally.returns.process_return(&bill_id, &request).await?)
            }
            ReturnAction::Manual { input } => {
                let request: ManualReturnRequest = read_body(input_path(input).as_deref())?;
                to_json(&tally.returns.process_manual_return(&request).await?)
            }
            ReturnAction::List { bill_id } => to_json(&tally.returns.list_returns(&bill_id).await?),
            ReturnAction::ListManual { limit } => {
                to_json(&tally.returns.list_manual_returns(limit).await?)
            }
        },

        Commands::Pay { bill_id, input } => {
            let request: RecordPaymentRequest = read_body(input_path(input).as_deref())?;
            to_json(&tally.payments.record_payment(&bill_id, &request).await?)
        }
        Commands::Dispatch { bill_id } => to_json(&tally.payments.dispatch(&bill_id).await?),
        Commands::Deliver { bill_id } => to_json(&tally.payments.confirm_delivery(&bill_id).await?),

        Commands::Stock { action } => match action {
            StockAction::Get {
                product_id,
                warehouse_id,
            } => {
                let key = StockKey::new(product_id, warehouse_id);
                match tally.ledger.get(&key).await? {
                    Some(stock) => to_json(&stock),
                    None => Err(ApiError::not_found("Stock", &key.to_string())),
                }
            }
            StockAction::List { warehouse_id } => to_json(&tally.ledger.list(&warehouse_id).await?),
            StockAction::Restock {
                product_id,
                warehouse_id,
                pieces,
            } => {
                let key = StockKey::new(product_id, warehouse_id);
                to_json(&tally.ledger.restock(&key, pieces).await?)
            }
        },

        Commands::Invoice { action } => match action {
            InvoiceAction::Next => Ok(json!({ "invoiceNumber": tally.sequencer.next().await? })),
            InvoiceAction::Current => Ok(json!({
                "counter": tally.sequencer.counter(),
                "seq": tally.sequencer.current().await?,
            })),
        },
    }
}

/// `None` and `-` both mean stdin.
fn input_path(arg: Option<String>) -> Option<PathBuf> {
    arg.filter(|a| a != "-").map(PathBuf::from)
}

fn read_body<T: DeserializeOwned>(input: Option<&Path>) -> Result<T, ApiError> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            ApiError::validation(format!("cannot read {}: {}", path.display(), e))
        })?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| ApiError::validation(format!("cannot read stdin: {}", e)))?;
            buf
        }
    };

    serde_json::from_str(&raw)
        .map_err(|e| ApiError::validation(format!("invalid request body: {}", e)))
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::internal(e.to_string()))
}
