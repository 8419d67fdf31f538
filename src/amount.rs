//! Conversion between dollar amounts and the integer cents used for storage and
//! query parameters.
//!
//! Dollar amounts go through [Decimal] so conversions are exact for every
//! amount that fits in an `i64` number of cents.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::Deserialize;

use crate::Error;

/// Round `dollars` to whole cents, half away from zero, and convert to cents.
fn decimal_to_cents(dollars: Decimal) -> Option<i64> {
    dollars
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(Decimal::ONE_HUNDRED)?
        .to_i64()
}

/// Parse a decimal dollar string, e.g. "200", "86.47" or "$1,000.50", into cents.
///
/// Digits past the second decimal place are rounded half away from zero, so
/// "0.005" is one cent.
///
/// # Errors
/// Returns [Error::InvalidAmount] if the text is not a non-negative decimal
/// number or if the amount does not fit in an `i64` number of cents.
pub fn parse_dollars(text: &str) -> Result<i64, Error> {
    let invalid = || Error::InvalidAmount(format!("\"{text}\" is not a valid dollar amount"));

    let trimmed = text.trim();
    if trimmed.starts_with('-') {
        return Err(Error::InvalidAmount(format!(
            "\"{text}\" is negative, amounts must be at least $0.00"
        )));
    }

    let digits: String = trimmed
        .strip_prefix('$')
        .unwrap_or(trimmed)
        .chars()
        .filter(|c| *c != ',')
        .collect();

    // Decimal also accepts signs, underscores and exponents, dollar amounts do not.
    let is_plain_decimal = digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1;
    if !is_plain_decimal {
        return Err(invalid());
    }

    let digits = match (digits.starts_with('.'), digits.ends_with('.')) {
        (true, _) => format!("0{digits}"),
        (_, true) => format!("{digits}0"),
        _ => digits,
    };

    let dollars = Decimal::from_str(&digits)
        .map_err(|_| Error::InvalidAmount(format!("\"{text}\" is too large")))?;

    decimal_to_cents(dollars)
        .ok_or_else(|| Error::InvalidAmount(format!("\"{text}\" is too large")))
}

/// Convert a numeric dollar amount into cents, rounding to the nearest cent.
///
/// # Errors
/// Returns [Error::InvalidAmount] if `dollars` is negative, not finite, or too
/// large to represent in cents.
pub fn dollars_to_cents(dollars: f64) -> Result<i64, Error> {
    let invalid = || Error::InvalidAmount(format!("{dollars} is not a valid dollar amount"));

    if dollars < 0.0 {
        return Err(invalid());
    }

    Decimal::from_f64_retain(dollars)
        .and_then(decimal_to_cents)
        .ok_or_else(invalid)
}

/// Parse a minor-unit (cents) query parameter.
///
/// # Errors
/// Returns [Error::InvalidAmount] if `text` is not a non-negative integer.
pub fn parse_cents(text: &str) -> Result<i64, Error> {
    let cents: i64 = text
        .trim()
        .parse()
        .map_err(|_| Error::InvalidAmount(format!("\"{text}\" is not a whole number of cents")))?;

    if cents < 0 {
        return Err(Error::InvalidAmount(format!(
            "{cents} is negative, amount bounds must be at least 0"
        )));
    }

    Ok(cents)
}

/// Format an amount of cents as dollars, e.g. 8647 as "$86.47" and 100000 as "$1,000.00".
pub fn format_cents(cents: i64) -> String {
    let dollars = Decimal::new(cents, 2);
    let sign = if dollars.is_sign_negative() { "-" } else { "" };
    let text = dollars.abs().to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{sign}${grouped}.{fraction}")
}

/// A dollar amount sent by a client, either as a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DollarAmount {
    /// A numeric amount, e.g. `86.47`.
    Number(f64),
    /// A textual amount, e.g. `"86.47"` or `"$1,000"`.
    Text(String),
}

impl DollarAmount {
    /// Convert the amount to cents.
    ///
    /// # Errors
    /// Returns [Error::InvalidAmount] if the amount is negative or malformed.
    pub fn to_cents(&self) -> Result<i64, Error> {
        match self {
            DollarAmount::Number(dollars) => dollars_to_cents(*dollars),
            DollarAmount::Text(text) => parse_dollars(text),
        }
    }
}
