//! Textual forms shared by the encoder, decoder and tree serialization.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike,
};

use crate::error::ValueError;
use crate::tree::TreeValue;
use crate::value::DateTimeValue;

/// Text form of an encoded mapping key. Only scalars qualify.
pub(crate) fn scalar_key(key: &TreeValue) -> Option<String> {
    match key {
        TreeValue::Text(text) => Some(text.clone()),
        TreeValue::Int(value) => Some(value.to_string()),
        TreeValue::Float(value) => Some(value.to_string()),
        TreeValue::Bool(value) => Some(value.to_string()),
        _ => None,
    }
}

pub(crate) fn encode_bytes(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode base64 text, ignoring embedded whitespace and line breaks.
pub(crate) fn decode_bytes(text: &str) -> Result<Vec<u8>, ValueError> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| ValueError::invalid("bytes", err))
}

fn push_fraction(out: &mut String, nanosecond: u32) {
    let micros = (nanosecond % 1_000_000_000) / 1_000;
    if micros != 0 {
        out.push_str(&format!(".{micros:06}"));
    }
}

pub(crate) fn datetime_iso(value: &DateTimeValue) -> String {
    match value {
        DateTimeValue::Naive(dt) => {
            let mut out = dt.format("%Y-%m-%dT%H:%M:%S").to_string();
            push_fraction(&mut out, dt.nanosecond());
            out
        }
        DateTimeValue::Aware(dt) => {
            let mut out = dt.format("%Y-%m-%dT%H:%M:%S").to_string();
            push_fraction(&mut out, dt.nanosecond());
            out.push_str(&dt.format("%:z").to_string());
            out
        }
    }
}

pub(crate) fn date_iso(value: &NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub(crate) fn time_iso(value: &NaiveTime) -> String {
    let mut out = value.format("%H:%M:%S").to_string();
    push_fraction(&mut out, value.nanosecond());
    out
}

pub(crate) fn parse_datetime(text: &str) -> Result<DateTimeValue, ValueError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(DateTimeValue::Aware(dt));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(text, pattern) {
            return Ok(DateTimeValue::Aware(dt));
        }
    }
    for pattern in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, pattern) {
            return Ok(DateTimeValue::Naive(dt));
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(DateTimeValue::Naive(midnight));
    }
    Err(ValueError::invalid(
        "datetime",
        format!("'{text}' is not an ISO-8601 datetime"),
    ))
}

pub(crate) fn parse_date(text: &str) -> Result<NaiveDate, ValueError> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|_| ValueError::invalid("date", format!("'{text}' is not an ISO-8601 date")))
}

pub(crate) fn parse_time(text: &str) -> Result<NaiveTime, ValueError> {
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .map_err(|_| ValueError::invalid("time", format!("'{text}' is not an ISO-8601 time")))
}

/// Total seconds, rounded to microsecond precision.
pub(crate) fn duration_seconds(value: &TimeDelta) -> f64 {
    let micros = value
        .num_microseconds()
        .unwrap_or_else(|| value.num_milliseconds().saturating_mul(1_000));
    micros as f64 / 1_000_000.0
}

pub(crate) fn duration_from_seconds(seconds: f64) -> Result<TimeDelta, ValueError> {
    if !seconds.is_finite() {
        return Err(ValueError::out_of_range("duration", seconds));
    }
    let micros = (seconds * 1_000_000.0).round();
    if micros.abs() >= i64::MAX as f64 {
        return Err(ValueError::out_of_range("duration", seconds));
    }
    Ok(TimeDelta::microseconds(micros as i64))
}

/// `UTC` for a zero offset, `UTC+HH:MM` / `UTC-HH:MM` otherwise.
pub(crate) fn timezone_name(offset: &FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    if seconds == 0 {
        return "UTC".to_owned();
    }
    let sign = if seconds < 0 { '-' } else { '+' };
    let seconds = seconds.unsigned_abs();
    let (hours, minutes, rest) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if rest == 0 {
        format!("UTC{sign}{hours:02}:{minutes:02}")
    } else {
        format!("UTC{sign}{hours:02}:{minutes:02}:{rest:02}")
    }
}

pub(crate) fn parse_timezone(text: &str) -> Result<FixedOffset, ValueError> {
    let invalid = || ValueError::invalid("timezone", format!("'{text}' is not a timezone name"));

    let offset = text.strip_prefix("UTC").ok_or_else(invalid)?;
    if offset.is_empty() {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }
    let (sign, rest) = if let Some(rest) = offset.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = offset.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(invalid());
    };
    let mut parts = rest.split(':').map(|part| {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        part.parse::<u32>().map_err(|_| invalid())
    });
    let hours = parts.next().ok_or_else(invalid)??;
    let minutes = parts.next().transpose()?.unwrap_or(0);
    let seconds = parts.next().transpose()?.unwrap_or(0);
    if parts.next().is_some() || hours >= 24 || minutes >= 60 || seconds >= 60 {
        return Err(invalid());
    }
    let total = i64::from(hours) * 3600 + i64::from(minutes) * 60 + i64::from(seconds);
    let total = i32::try_from(sign * total).map_err(|_| invalid())?;
    FixedOffset::east_opt(total).ok_or_else(invalid)
}
