//! Field coercion for listing records
//!
//! Listing APIs send prices as Brazilian-formatted text or plain numbers,
//! timestamps as epoch milliseconds or RFC 3339 text, and free-text fields
//! that are sometimes empty. These helpers turn them into typed values.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Reads a price from a JSON value
///
/// Returns None for anything that is not a finite, non-negative amount.
///
/// # Examples
///
/// ```
/// use listing_ripple::processing::coerce::parse_price;
/// use serde_json::json;
///
/// assert_eq!(parse_price(&json!(1500.0)), Some(1500.0));
/// assert_eq!(parse_price(&json!("R$ 1.500,00")), Some(1500.0));
/// assert_eq!(parse_price(&json!("consulte")), None);
/// ```
pub fn parse_price(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_price_text(s)?,
        _ => return None,
    };
    (amount.is_finite() && amount >= 0.0).then_some(amount)
}

/// Parses Brazilian price text
///
/// With a comma present, dots group thousands and the comma is the decimal
/// point. Without one, dots group thousands only when every group after the
/// first has exactly three digits (`1.500`, `12.000.000`); otherwise a
/// single dot is a decimal point.
pub fn parse_price_text(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .replace("R$", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    if !cleaned.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }

    let numeric = if cleaned.contains(',') {
        if cleaned.matches(',').count() > 1 {
            return None;
        }
        cleaned.replace('.', "").replace(',', ".")
    } else if is_thousands_grouped(&cleaned) {
        cleaned.replace('.', "")
    } else {
        cleaned
    };

    if !numeric.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    numeric.parse::<f64>().ok()
}

/// `d{1,3}(.ddd)+`
fn is_thousands_grouped(text: &str) -> bool {
    let mut groups = text.split('.');
    let Some(head) = groups.next() else {
        return false;
    };
    if head.is_empty() || head.len() > 3 {
        return false;
    }
    let mut tail_count = 0;
    for group in groups {
        if group.len() != 3 {
            return false;
        }
        tail_count += 1;
    }
    tail_count > 0
}

/// Reads an epoch-milliseconds timestamp sent as an integer or numeric text
pub fn parse_epoch_millis(value: &Value) -> Option<DateTime<Utc>> {
    let millis = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            trimmed.parse::<i64>().ok()?
        }
        _ => return None,
    };
    Utc.timestamp_millis_opt(millis).single()
}

/// Reads a timestamp that is either RFC 3339 text or epoch milliseconds
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    if let Value::String(s) = value {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(s.trim()) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    parse_epoch_millis(value)
}

/// Normalizes a Brazilian state code
///
/// Returns the trimmed, upper-cased code when it is exactly two ASCII
/// letters; anything else is absent.
pub fn normalize_state(raw: Option<&str>) -> Option<String> {
    let code = raw?.trim().to_ascii_uppercase();
    (code.len() == 2 && code.chars().all(|c| c.is_ascii_uppercase())).then_some(code)
}

/// Trims a text field, mapping blank text to absent
pub fn non_empty(raw: Option<String>) -> Option<String> {
    let raw = raw?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == raw.len() {
        Some(raw)
    } else {
        Some(trimmed.to_string())
    }
}
