//! Input validation helpers
//!
//! Text length limits and money/number rules applied to uploaded cells.
//! Each helper returns the error kind plus a human-readable detail, the
//! caller attaches the column and row.

use rust_decimal::prelude::*;
use serde_json::Value;
use shared::models::ErrorKind;

// ── Text length limits ──────────────────────────────────────────────

/// Entity names: category, item, variant, addon, group
pub const MAX_NAME_LEN: usize = 200;

/// Descriptions
pub const MAX_NOTE_LEN: usize = 500;

/// Short identifiers: external_id, parent tokens
pub const MAX_SHORT_TEXT_LEN: usize = 100;

// ── Numeric limits ──────────────────────────────────────────────────

/// Money values keep at most two decimal places
pub const MONEY_DECIMAL_PLACES: u32 = 2;

/// Maximum allowed price / charge
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Maximum tax rate percentage
pub const MAX_TAX_RATE: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Maximum selection bound for addon groups
pub const MAX_SELECTION: i64 = 100;

pub type Rejection = (ErrorKind, String);

/// Validate that an optional string is within the length limit.
pub fn validate_text_len(value: &str, max_len: usize) -> Result<(), Rejection> {
    let len = value.chars().count();
    if len > max_len {
        return Err((
            ErrorKind::TooLong,
            format!("too long ({len} chars, max {max_len})"),
        ));
    }
    Ok(())
}

/// Parse a money value: non-negative, at most two decimal places, bounded.
///
/// The result is normalized (`"12.50"` → `12.5`).
pub fn parse_money(raw: &str, max: Decimal) -> Result<Decimal, Rejection> {
    let value = Decimal::from_str(raw)
        .map_err(|_| (ErrorKind::InvalidNumber, format!("'{raw}' is not a number")))?;

    if value.is_sign_negative() && !value.is_zero() {
        return Err((
            ErrorKind::OutOfRange,
            format!("must be non-negative, got {raw}"),
        ));
    }
    if value.normalize().scale() > MONEY_DECIMAL_PLACES {
        return Err((
            ErrorKind::InvalidNumber,
            format!("at most {MONEY_DECIMAL_PLACES} decimal places allowed, got {raw}"),
        ));
    }
    if value > max {
        return Err((
            ErrorKind::OutOfRange,
            format!("exceeds maximum allowed ({max}), got {raw}"),
        ));
    }

    Ok(value.normalize())
}

/// Parse an integer within `[min, max]`.
pub fn parse_bounded_int(raw: &str, min: i64, max: i64) -> Result<i64, Rejection> {
    let value: i64 = raw
        .parse()
        .map_err(|_| (ErrorKind::InvalidNumber, format!("'{raw}' is not an integer")))?;
    if value < min || value > max {
        return Err((
            ErrorKind::OutOfRange,
            format!("must be between {min} and {max}, got {value}"),
        ));
    }
    Ok(value)
}

/// Attribute form of an amount: canonical decimal string ("50", "12.5")
pub fn money_value(amount: Decimal) -> Value {
    Value::String(amount.normalize().to_string())
}

/// Read a stored amount, either a decimal string or a JSON number
pub fn money_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

/// Render a stored money value with at most two decimals ("50", "12.5").
pub fn format_money(value: &Value) -> String {
    money_from_value(value)
        .map(|d| d.round_dp(MONEY_DECIMAL_PLACES).normalize().to_string())
        .unwrap_or_default()
}
