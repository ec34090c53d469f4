//! Exact decimal parsing for backend amount fields.
//!
//! Backends deliver values as JSON strings or numbers of varying
//! precision. Values are kept as their literal text until parsed into a
//! [`Decimal`] here; binary floating point never enters the amount path,
//! so the zero-filter and balance-sum comparisons cannot be skewed by
//! rounding.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parse a raw JSON amount into an exact decimal.
///
/// Accepts strings and numbers; anything else is a shape change in the
/// backend and reported as such rather than coerced.
pub fn decimal_from_value(value: &Value) -> Result<Decimal, String> {
    match value {
        Value::String(s) => parse_literal(s),
        Value::Number(n) => parse_literal(&n.to_string()),
        other => Err(format!("unsupported amount representation: {other}")),
    }
}

fn parse_literal(raw: &str) -> Result<Decimal, String> {
    let literal = raw.trim();
    literal
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(literal))
        .map_err(|e| format!("malformed amount {literal:?}: {e}"))
}

/// Serde adapter for string-or-number amount fields.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    decimal_from_value(&value).map_err(serde::de::Error::custom)
}
