//! Request parsing shared by the handlers.
//!
//! The frontend sends ids as numbers or numeric strings and dates in several
//! shapes, so bodies are read loosely and validated here into typed values.

use axum::extract::FromRequest;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// JSON body extractor whose rejections become `400 {"error": ...}`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Parse a positive integer id from a path or query string.
///
/// # Errors
///
/// Returns `AppError::BadRequest` naming `field` if the value is not a positive integer.
pub fn parse_id(raw: &str, field: &str) -> AppResult<i32> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid or missing {field}")))
}

/// Positive integer id from a JSON value (number or numeric string).
#[must_use]
pub fn json_id(value: Option<&Value>) -> Option<i32> {
    let id = match value? {
        Value::Number(n) => n.as_i64().and_then(|id| i32::try_from(id).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    };
    id.filter(|id| *id > 0)
}

/// Finite number from a JSON value (number or numeric string).
#[must_use]
pub fn json_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// Trimmed, non-empty text.
#[must_use]
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Normalize a date given as `YYYY-MM-DD`, an ISO datetime, or epoch millis
/// to its UTC calendar day.
#[must_use]
pub fn json_date(value: Option<&Value>) -> Option<NaiveDate> {
    match value? {
        Value::String(s) => parse_date(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        _ => None,
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}
