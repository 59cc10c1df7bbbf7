//! # Wire Units
//!
//! Serde adapters between the integer units Tally computes in and the decimal
//! numbers callers send and receive.
//!
//! ```text
//!   Rust field                 JSON
//!   ──────────                 ────
//!   selling_price_cents 11800  "sellingPrice": 118.0     (money::*)
//!   tax_rate_bps        1800   "taxPercent":   18.0      (percent::*)
//! ```
//!
//! Decimals are rounded to the nearest unit on the way in. Values too large
//! for `i64`/`u32` saturate, and the range checks in [`crate::validation`]
//! reject them.

/// Minor units (`i64`) carried as decimal major units.
///
/// ## Example
/// ```rust
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Line {
///     #[serde(rename = "sellingPrice", with = "tally_core::wire::money")]
///     selling_price_cents: i64,
/// }
///
/// let line: Line = serde_json::from_str(r#"{"sellingPrice": 118.5}"#).unwrap();
/// assert_eq!(line.selling_price_cents, 11_850);
/// assert_eq!(serde_json::to_string(&line).unwrap(), r#"{"sellingPrice":118.5}"#);
/// ```
pub mod money {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(cents: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(*cents as f64 / 100.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let major = f64::deserialize(deserializer)?;
        if !major.is_finite() {
            return Err(de::Error::custom("amount must be a finite number"));
        }

        Ok((major * 100.0).round() as i64)
    }
}

/// Basis points (`u32`) carried as a decimal percentage.
pub mod percent {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bps: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(*bps as f64 / 100.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let pct = f64::deserialize(deserializer)?;
        if !pct.is_finite() || pct < 0.0 {
            return Err(de::Error::custom("percentage must be a non-negative number"));
        }

        Ok((pct * 100.0).round() as u32)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Amounts {
        #[serde(with = "super::money")]
        price: i64,
        #[serde(with = "super::percent")]
        rate: u32,
    }

    #[test]
    fn test_decimal_amounts_become_minor_units() {
        let parsed: Amounts = serde_json::from_str(r#"{"price": 2950, "rate": 18}"#).unwrap();
        assert_eq!(parsed, Amounts { price: 295_000, rate: 1800 });

        let parsed: Amounts = serde_json::from_str(r#"{"price": 0.1, "rate": 8.25}"#).unwrap();
        assert_eq!(parsed, Amounts { price: 10, rate: 825 });
    }

    #[test]
    fn test_minor_units_serialize_as_decimals() {
        let json = serde_json::to_string(&Amounts { price: 1234, rate: 500 }).unwrap();
        assert_eq!(json, r#"{"price":12.34,"rate":5.0}"#);
    }

    #[test]
    fn test_huge_amount_saturates_instead_of_wrapping() {
        let parsed: Amounts = serde_json::from_str(r#"{"price": 1e300, "rate": 0}"#).unwrap();
        assert_eq!(parsed.price, i64::MAX);
    }

    #[test]
    fn test_negative_percent_rejected() {
        let parsed: Result<Amounts, _> = serde_json::from_str(r#"{"price": 1, "rate": -5}"#);
        assert!(parsed.is_err());
    }
}
