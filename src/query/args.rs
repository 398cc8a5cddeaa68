//! Parsing of user-supplied query arguments.

use super::QueryError;
use crate::engine::TimeWindow;
use crate::records::timestamp::{parse_date_only, parse_timestamp};
use chrono::{DateTime, Utc};

/// Largest accepted trailing-month count (one century).
pub const MAX_TRAILING_MONTHS: u32 = 1200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Start,
    End,
}

/// Parses a result-count limit. Negative values mean "nothing".
pub fn parse_limit(value: &str) -> Result<usize, QueryError> {
    let parsed = parse_integer(value, "limit")?;
    if parsed < 0 {
        return Ok(0);
    }
    Ok(usize::try_from(parsed).unwrap_or(usize::MAX))
}

/// Parses a trailing-month count. Negative values mean "no months".
pub fn parse_months(value: &str) -> Result<u32, QueryError> {
    let parsed = parse_integer(value, "months")?;
    if parsed < 0 {
        return Ok(0);
    }
    match u32::try_from(parsed) {
        Ok(months) if months <= MAX_TRAILING_MONTHS => Ok(months),
        _ => Err(QueryError::InvalidArgument(format!(
            "months must be at most {}, got {}",
            MAX_TRAILING_MONTHS, parsed
        ))),
    }
}

fn parse_integer(value: &str, what: &str) -> Result<i64, QueryError> {
    value.trim().parse::<i64>().map_err(|_| {
        QueryError::InvalidArgument(format!("{} must be an integer, got \"{}\"", what, value))
    })
}

/// Parses a window boundary. A plain date used as an end boundary stands for
/// the last instant of that day.
pub fn parse_boundary(value: &str, boundary: Boundary) -> Result<DateTime<Utc>, QueryError> {
    let value = value.trim();
    if boundary == Boundary::End {
        if let Some(date) = parse_date_only(value) {
            if let Some(last) = date.and_hms_nano_opt(23, 59, 59, 999_999_999) {
                return Ok(last.and_utc());
            }
        }
    }
    parse_timestamp(value)
        .ok_or_else(|| QueryError::InvalidArgument(format!("unparseable date \"{}\"", value)))
}

pub fn parse_window(start: &str, end: &str) -> Result<TimeWindow, QueryError> {
    Ok(TimeWindow::new(
        parse_boundary(start, Boundary::Start)?,
        parse_boundary(end, Boundary::End)?,
    ))
}
