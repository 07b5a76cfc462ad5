// Field-level checks shared by the entity rules.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

use crate::error::{SchemaError, SchemaResult};

pub(crate) fn non_empty(entity: &'static str, field: &str, value: &str) -> SchemaResult<()> {
    if value.trim().is_empty() {
        return Err(SchemaError::validation(
            entity,
            format!("{} must be a non-empty string", field),
        ));
    }
    Ok(())
}

pub(crate) fn optional_non_empty(
    entity: &'static str,
    field: &str,
    value: Option<&str>,
) -> SchemaResult<()> {
    match value {
        Some(v) => non_empty(entity, field, v),
        None => Ok(()),
    }
}

/// Percentages must be finite and within [0, 100].
pub(crate) fn percent(entity: &'static str, field: &str, value: f64) -> SchemaResult<()> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(SchemaError::validation(
            entity,
            format!("{} must be within [0, 100], got {}", field, value),
        ));
    }
    Ok(())
}

pub(crate) fn optional_percent(
    entity: &'static str,
    field: &str,
    value: Option<f64>,
) -> SchemaResult<()> {
    match value {
        Some(v) => percent(entity, field, v),
        None => Ok(()),
    }
}

pub(crate) fn timestamp(
    entity: &'static str,
    field: &str,
    value: &str,
) -> SchemaResult<DateTime<Utc>> {
    parse_timestamp(value).ok_or_else(|| {
        SchemaError::validation(
            entity,
            format!("{} must be an ISO-8601 timestamp, got {:?}", field, value),
        )
    })
}

pub(crate) fn optional_timestamp(
    entity: &'static str,
    field: &str,
    value: Option<&str>,
) -> SchemaResult<Option<DateTime<Utc>>> {
    value.map(|v| timestamp(entity, field, v)).transpose()
}

/// Accepts RFC 3339 (any offset), a naive date-time taken as UTC, or a bare date at midnight UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Upper bound of a date range. A bare date covers the whole day.
pub fn parse_end_bound(value: &str) -> Option<DateTime<Utc>> {
    let start = parse_timestamp(value)?;
    if NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").is_ok() {
        Some(start + TimeDelta::days(1) - TimeDelta::milliseconds(1))
    } else {
        Some(start)
    }
}

/// Canonical wire form for timestamps produced by this service.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
