//! Request validation.
//!
//! Rules are checked in a fixed order and the first failure wins; callers
//! surface the message verbatim as a 400. The ordering is a contract: a
//! request missing `start_date` reports exactly that, no matter how many
//! other fields are also invalid.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::params::ReportParams;

/// Longest permitted inclusive date range.
pub const MAX_RANGE_DAYS: i64 = 365;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 24-hour wall-clock time, zero-padded.
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d:[0-5]\d$").expect("valid time regex"));

/// Validate a resolved parameter set.
///
/// Returns the parsed date pair so downstream day-count math never reparses.
pub fn validate(params: &ReportParams) -> Result<(NaiveDate, NaiveDate), String> {
    let start_raw = present(params.start_date.as_deref())
        .ok_or_else(|| missing("start_date"))?;
    let end_raw = present(params.end_date.as_deref()).ok_or_else(|| missing("end_date"))?;
    present(params.subscription_id.as_deref()).ok_or_else(|| missing("subscription_id"))?;

    let start = parse_date(start_raw)?;
    let end = parse_date(end_raw)?;

    if end < start {
        return Err("end_date must not be earlier than start_date".to_string());
    }
    if (end - start).num_days() > MAX_RANGE_DAYS {
        return Err(format!("Date range must not exceed {MAX_RANGE_DAYS} days"));
    }
    if !TIME_RE.is_match(&params.start_time) || !TIME_RE.is_match(&params.end_time) {
        return Err("Invalid time format, expected HH:MM:SS".to_string());
    }
    if params.granularity != "Daily" && params.granularity != "Monthly" {
        return Err("granularity must be either 'Daily' or 'Monthly'".to_string());
    }

    Ok((start, end))
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn missing(name: &str) -> String {
    format!("Missing required parameter: {name}")
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| format!("Invalid date format: {raw:?}, expected YYYY-MM-DD"))
}
