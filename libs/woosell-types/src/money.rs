//! Conversions between integer minor units (cents) and decimal amounts.
//!
//! Amounts are stored and summed as `i64` minor units. Decimal strings only
//! appear at the edges: parsing inbound payloads and formatting responses.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("not a decimal amount: {0}")]
    NotANumber(String),

    #[error("amount must not be negative")]
    Negative,

    #[error("amount out of range")]
    OutOfRange,
}

/// Convert a decimal amount to minor units, rounding half away from zero to 2 places.
pub fn decimal_to_minor_units(amount: Decimal) -> Result<i64, MoneyError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(MoneyError::Negative);
    }
    let cents = amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or(MoneyError::OutOfRange)?
        .trunc();
    i64::try_from(cents).map_err(|_| MoneyError::OutOfRange)
}

/// Parse a decimal string such as `"42.00"` or `"7"` into minor units.
pub fn parse_minor_units(raw: &str) -> Result<i64, MoneyError> {
    let trimmed = raw.trim();
    let amount = Decimal::from_str(trimmed).map_err(|_| MoneyError::NotANumber(trimmed.to_string()))?;
    decimal_to_minor_units(amount)
}

/// Parse a JSON number into minor units. The number's textual form is used so
/// that `42.1` becomes 4210 without passing through binary floating point.
pub fn number_to_minor_units(number: &serde_json::Number) -> Result<i64, MoneyError> {
    parse_minor_units(&number.to_string())
}

/// Format minor units with exactly two decimals: `450` -> `"4.50"`.
pub fn format_minor_units(minor: i64) -> String {
    Decimal::new(minor, 2).to_string()
}
