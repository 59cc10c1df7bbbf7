//! # Invoice Counter Repository
//!
//! Named counters advanced by a single increment-and-fetch statement. The
//! first call for a name creates the counter at 1.
//!
//! ```text
//!   INSERT INTO invoice_counters (name, seq) VALUES ('invoice', 1)
//!   ON CONFLICT (name) DO UPDATE SET seq = seq + 1
//!   RETURNING seq
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

const NEXT_SEQ: &str = r#"
    INSERT INTO invoice_counters (name, seq) VALUES (?1, 1)
    ON CONFLICT (name) DO UPDATE SET seq = seq + 1
    RETURNING seq
"#;

#[derive(Debug, Clone)]
pub struct InvoiceCounterRepository {
    pool: SqlitePool,
}

impl InvoiceCounterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceCounterRepository { pool }
    }

    /// Advances the counter and returns its new value.
    pub async fn next(&self, name: &str) -> DbResult<i64> {
        let seq: i64 = sqlx::query_scalar(NEXT_SEQ)
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        debug!(counter = %name, seq, "Advanced invoice counter");
        Ok(seq)
    }

    /// Advances the counter inside the caller's transaction.
    ///
    /// A rollback gives the number back, so committed bills stay gapless.
    pub async fn next_in(conn: &mut SqliteConnection, name: &str) -> DbResult<i64> {
        let seq: i64 = sqlx::query_scalar(NEXT_SEQ)
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;

        debug!(counter = %name, seq, "Advanced invoice counter");
        Ok(seq)
    }

    /// Current value of the counter, `None` if it was never advanced.
    pub async fn current(&self, name: &str) -> DbResult<Option<i64>> {
        let seq: Option<i64> = sqlx::query_scalar("SELECT seq FROM invoice_counters WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(seq)
    }
}
