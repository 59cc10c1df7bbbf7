//! # Invoice Sequencer
//!
//! Hands out `INV-<year>-<seq>` numbers from one named counter. The counter
//! advance is a single increment-and-fetch statement, so concurrent callers
//! always receive distinct values.

use chrono::{Datelike, Utc};
use tracing::debug;

use tally_core::invoice::format_invoice_number;
use tally_db::{Database, InvoiceCounterRepository, SqliteConnection};

use crate::config::EngineConfig;
use crate::error::EngineResult;

#[derive(Debug, Clone)]
pub struct InvoiceSequencer {
    db: Database,
    counter: String,
    prefix: String,
}

impl InvoiceSequencer {
    pub fn new(db: Database, counter: impl Into<String>, prefix: impl Into<String>) -> Self {
        InvoiceSequencer {
            db,
            counter: counter.into(),
            prefix: prefix.into(),
        }
    }

    pub fn from_config(db: Database, config: &EngineConfig) -> Self {
        Self::new(db, &config.invoice_counter, &config.invoice_prefix)
    }

    /// Allocates the next invoice number on its own.
    pub async fn next(&self) -> EngineResult<String> {
        let seq = self.db.invoice_counters().next(&self.counter).await?;
        Ok(self.format(seq))
    }

    /// Allocates the next invoice number inside the caller's transaction.
    ///
    /// If the transaction rolls back, the number is handed out again.
    pub async fn next_in(&self, conn: &mut SqliteConnection) -> EngineResult<String> {
        let seq = InvoiceCounterRepository::next_in(conn, &self.counter).await?;
        Ok(self.format(seq))
    }

    /// Last sequence number handed out, `None` before the first invoice.
    pub async fn current(&self) -> EngineResult<Option<i64>> {
        Ok(self.db.invoice_counters().current(&self.counter).await?)
    }

    pub fn counter(&self) -> &str {
        &self.counter
    }

    fn format(&self, seq: i64) -> String {
        let number = format_invoice_number(&self.prefix, Utc::now().year(), seq);
        debug!(invoice_number = %number, "Allocated invoice number");
        number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::invoice::parse_invoice_number;
    use tally_db::DbConfig;

    #[tokio::test]
    async fn test_numbers_are_sequential_and_formatted() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sequencer = InvoiceSequencer::new(db, "invoice", "INV");

        let first = sequencer.next().await.unwrap();
        let second = sequencer.next().await.unwrap();

        let year = Utc::now().year();
        assert_eq!(first, format!("INV-{}-000001", year));
        assert_eq!(parse_invoice_number(&second).unwrap().seq, 2);
        assert_eq!(sequencer.current().await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_current_before_first_invoice() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sequencer = InvoiceSequencer::new(db, "invoice", "INV");
        assert_eq!(sequencer.current().await.unwrap(), None);
        assert_eq!(sequencer.counter(), "invoice");
    }

    #[tokio::test]
    async fn test_counters_are_independent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let invoices = InvoiceSequencer::new(db.clone(), "invoice", "INV");
        let credit_notes = InvoiceSequencer::new(db, "credit-note", "CN");

        invoices.next().await.unwrap();
        invoices.next().await.unwrap();
        let cn = credit_notes.next().await.unwrap();
        assert!(cn.starts_with("CN-"));
        assert!(cn.ends_with("-000001"));
    }
}
