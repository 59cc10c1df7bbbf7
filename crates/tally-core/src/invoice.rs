//! # Invoice Numbers
//!
//! Formatting and parsing of `<PREFIX>-<year>-<seq>` identifiers. The
//! sequence itself comes from an atomic counter in the database; this module
//! only turns it into text.
//!
//! ```text
//!   prefix "INV", year 2026, seq 42  ──►  "INV-2026-000042"
//! ```

use crate::error::ValidationError;
use crate::validation::ValidationResult;

/// Digits the sequence is zero-padded to. Larger sequences are printed in full.
pub const INVOICE_SEQ_WIDTH: usize = 6;

/// Default prefix for invoice numbers.
pub const DEFAULT_INVOICE_PREFIX: &str = "INV";

/// Formats an invoice number.
///
/// ## Example
/// ```rust
/// use tally_core::invoice::format_invoice_number;
///
/// assert_eq!(format_invoice_number("INV", 2026, 1), "INV-2026-000001");
/// assert_eq!(format_invoice_number("INV", 2026, 1_234_567), "INV-2026-1234567");
/// ```
pub fn format_invoice_number(prefix: &str, year: i32, seq: i64) -> String {
    format!("{}-{}-{:0width$}", prefix, year, seq, width = INVOICE_SEQ_WIDTH)
}

/// Parsed components of an invoice number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceNumber {
    pub prefix: String,
    pub year: i32,
    pub seq: i64,
}

/// Parses an invoice number produced by [`format_invoice_number`].
pub fn parse_invoice_number(value: &str) -> ValidationResult<InvoiceNumber> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "invoiceNumber".to_string(),
        reason: reason.to_string(),
    };

    // Split from the right so prefixes may contain dashes
    let mut parts = value.rsplitn(3, '-');
    let seq_part = parts.next().ok_or_else(|| invalid("missing sequence"))?;
    let year_part = parts.next().ok_or_else(|| invalid("missing year"))?;
    let prefix = parts.next().ok_or_else(|| invalid("missing prefix"))?;

    if prefix.is_empty() {
        return Err(invalid("missing prefix"));
    }
    if year_part.len() != 4 {
        return Err(invalid("year must have 4 digits"));
    }
    if seq_part.len() < INVOICE_SEQ_WIDTH {
        return Err(invalid("sequence is not zero-padded"));
    }

    let year = year_part
        .parse::<i32>()
        .map_err(|_| invalid("year is not a number"))?;
    let seq = seq_part
        .parse::<i64>()
        .map_err(|_| invalid("sequence is not a number"))?;

    if seq < 1 {
        return Err(invalid("sequence starts at 1"));
    }

    Ok(InvoiceNumber {
        prefix: prefix.to_string(),
        year,
        seq,
    })
}
