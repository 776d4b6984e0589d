//! Query parameter parsing and validation.

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::models::{Dimensions, StatisticKind};
use crate::{MonitorError, Result};

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const DEFAULT_PERIOD: u64 = 300;
const MAX_NAME_LENGTH: usize = 255;

pub fn tenant_id(headers: &HeaderMap) -> Result<String> {
    headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| MonitorError::Unauthorized(format!("Missing {} header", TENANT_HEADER)))
}

fn check_length(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(MonitorError::InvalidQuery(format!("{} must not be empty", field)));
    }
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(MonitorError::InvalidQuery(format!(
            "{} {} must be {} characters or less",
            field, value, MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

pub fn parse_name(name: Option<&str>) -> Result<Option<String>> {
    match name.map(str::trim) {
        Some(name) => {
            check_length("Metric name", name)?;
            Ok(Some(name.to_string()))
        }
        None => Ok(None),
    }
}

/// Parse `name:value[,name:value]*`. A blank string means no filter.
pub fn parse_dimensions(dimensions: Option<&str>) -> Result<Option<Dimensions>> {
    let raw = match dimensions.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(None),
    };

    let mut parsed = Dimensions::new();
    for pair in raw.split(',') {
        let (name, value) = pair.split_once(':').ok_or_else(|| {
            MonitorError::InvalidQuery(format!("Invalid dimension {}", pair.trim()))
        })?;
        let (name, value) = (name.trim(), value.trim());
        check_length("Dimension name", name)?;
        check_length("Dimension value", value)?;
        parsed.insert(name.to_string(), value.to_string());
    }
    Ok(Some(parsed))
}

pub fn parse_time(value: Option<&str>, field: &str) -> Result<Option<DateTime<Utc>>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|_| {
                MonitorError::InvalidQuery(format!(
                    "{} ({}) must be an ISO 8601 formatted time",
                    field, value
                ))
            }),
        None => Ok(None),
    }
}

pub fn require_time(value: Option<&str>, field: &str) -> Result<DateTime<Utc>> {
    parse_time(value, field)?
        .ok_or_else(|| MonitorError::InvalidQuery(format!("{} is required", field)))
}

pub fn validate_times(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<()> {
    match end {
        Some(end) if end <= start => Err(MonitorError::InvalidQuery(
            "start_time must be before end_time".to_string(),
        )),
        _ => Ok(()),
    }
}

pub fn parse_statistics(statistics: Option<&str>) -> Result<BTreeSet<StatisticKind>> {
    let kinds = statistics
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<StatisticKind>)
        .collect::<Result<BTreeSet<StatisticKind>>>()?;
    if kinds.is_empty() {
        return Err(MonitorError::InvalidQuery("statistics is required".to_string()));
    }
    Ok(kinds)
}

pub fn parse_period(period: Option<&str>) -> Result<u64> {
    match period.map(str::trim).filter(|p| !p.is_empty()) {
        Some(raw) => match raw.parse::<u64>() {
            Ok(period) if period > 0 => Ok(period),
            _ => Err(MonitorError::InvalidQuery(format!(
                "period ({}) must be a positive number of seconds",
                raw
            ))),
        },
        None => Ok(DEFAULT_PERIOD),
    }
}
