//! Service diagnostics extraction and failure classification
//!
//! The remote engine attaches status attributes to every response frame,
//! successful or not. This module normalizes the handful that matter for
//! troubleshooting into [`DiagnosticAttributes`] and maps failures onto
//! [`ErrorKind`]. It never retries anything itself.

use crate::{DiagnosticAttributes, ErrorKind, ServiceError, StatusAttributes};
use serde_json::Value;
use std::time::Duration;

/// Service status code, HTTP semantics
pub const STATUS_CODE: &str = "x-ms-status-code";
/// Request units consumed by the operation
pub const TOTAL_REQUEST_CHARGE: &str = "x-ms-total-request-charge";
/// Milliseconds to wait after throttling
pub const RETRY_AFTER_MS: &str = "x-ms-retry-after-ms";
/// Unique identifier of the operation
pub const ACTIVITY_ID: &str = "x-ms-activity-id";

/// Status code the service uses to signal throttling
pub const THROTTLED_STATUS: u16 = 429;

/// Extract diagnostics from the attributes of a successful response
pub fn extract(attributes: &StatusAttributes) -> DiagnosticAttributes {
    DiagnosticAttributes {
        status_code: attributes.get(STATUS_CODE).and_then(status_code_value),
        request_charge: attributes.get(TOTAL_REQUEST_CHARGE).and_then(number_value),
        retry_after: attributes.get(RETRY_AFTER_MS).and_then(retry_after_value),
        correlation_id: attributes.get(ACTIVITY_ID).and_then(string_value),
    }
}

/// Classify a service error and extract its diagnostics.
///
/// The status code comes from `x-ms-status-code` when present, otherwise
/// from the protocol status of the response.
pub fn classify(error: &ServiceError) -> (ErrorKind, DiagnosticAttributes) {
    let mut diagnostics = extract(&error.attributes);
    if diagnostics.status_code.is_none() {
        diagnostics.status_code = error.status_code;
    }

    let kind = match diagnostics.status_code {
        None => ErrorKind::ClientSideRejected,
        Some(THROTTLED_STATUS) => ErrorKind::Throttled,
        Some(_) => ErrorKind::Rejected,
    };

    (kind, diagnostics)
}

fn status_code_value(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// The retry hint arrives either as milliseconds (number or numeric
/// string) or as a .NET `TimeSpan` string such as `00:00:01.2345678`.
fn retry_after_value(value: &Value) -> Option<Duration> {
    match value {
        Value::Number(n) => parse_millis(&n.to_string())
            .or_else(|| n.as_f64().and_then(|ms| Duration::try_from_secs_f64(ms / 1000.0).ok())),
        Value::String(s) if s.contains(':') => parse_timespan(s.trim()),
        Value::String(s) => parse_millis(s.trim()),
        _ => None,
    }
}

/// Parse a non-negative decimal millisecond count without going through
/// floating point. Digits beyond nanosecond precision are dropped.
fn parse_millis(text: &str) -> Option<Duration> {
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let millis: u64 = whole.parse().ok()?;
    let nanos = fraction_to_units(fraction, 6)?;
    Duration::from_millis(millis).checked_add(Duration::from_nanos(nanos))
}

/// Parse `[d.]hh:mm:ss[.fffffff]`
fn parse_timespan(text: &str) -> Option<Duration> {
    let (days, clock) = match text.split_once('.') {
        Some((days, rest)) if !days.contains(':') => (days.parse::<u64>().ok()?, rest),
        _ => (0, text),
    };

    let mut parts = clock.splitn(3, ':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds_part = parts.next()?;
    let (seconds, fraction) = seconds_part.split_once('.').unwrap_or((seconds_part, ""));
    let seconds: u64 = seconds.parse().ok()?;
    if minutes >= 60 || seconds >= 60 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let total_secs = days
        .checked_mul(86_400)?
        .checked_add(hours.checked_mul(3_600)?)?
        .checked_add(minutes * 60 + seconds)?;
    let nanos = fraction_to_units(fraction, 9)?;
    Some(Duration::new(total_secs, u32::try_from(nanos).ok()?))
}

/// Interpret fractional digits as a count of `10^-digits` units
fn fraction_to_units(fraction: &str, digits: usize) -> Option<u64> {
    let kept: String = fraction
        .chars()
        .chain(std::iter::repeat('0'))
        .take(digits)
        .collect();
    kept.parse().ok()
}
