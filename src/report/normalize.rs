//! Cost record normalization.
//!
//! Turns the columnar query result into flat [`CostRecord`]s. Column
//! positions are resolved by name once per response, then rows are indexed
//! arithmetically. Every lookup is total: a missing column or a malformed
//! cell degrades to a fallback value, never an error.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::azure::costs::{COST_COLUMN, QueryProperties};

/// Fallback for absent string fields.
pub const FIELD_FALLBACK: &str = "N/A";
/// Fallback for an undecodable usage date.
pub const UNKNOWN_DATE: &str = "Unknown";

const DATE_COLUMN: &str = "UsageDate";
const RESOURCE_ID_COLUMN: &str = "ResourceId";
const SERVICE_COLUMN: &str = "ServiceName";
const RESOURCE_GROUP_COLUMN: &str = "ResourceGroupName";
const RESOURCE_TYPE_COLUMN: &str = "ResourceType";

/// One flat cost line, immutable once built (the joiner fills `tags` before
/// the record is published).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostRecord {
    /// `"DD-MM-YYYY"` or `"Unknown"`.
    pub date: String,
    /// Rounded to the cent, half away from zero.
    pub cost: f64,
    pub service_name: String,
    /// Last `/`-segment of the resource id, `"N/A"` for an empty id.
    pub resource_name: String,
    /// Raw resource id; empty string when the column is absent.
    pub resource_id: String,
    pub resource_group_name: String,
    pub resource_type: String,
    /// `"K=V; K2=V2"` or `"No tags"`, filled by the joiner.
    pub tags: String,
}

/// Normalization output: records in row order plus the accumulated total.
#[derive(Debug, Default)]
pub struct NormalizedCosts {
    pub records: Vec<CostRecord>,
    /// Sum of the per-row costs, each rounded before accumulation. This is
    /// NOT the same as rounding one running sum at the end, and the
    /// difference is visible at cent level; callers must not "fix" it.
    pub total_cost: f64,
}

/// Flatten the columnar response into one record per row (order-preserving).
pub fn normalize(response: &QueryProperties) -> NormalizedCosts {
    let index: HashMap<&str, usize> = response
        .columns
        .iter()
        .enumerate()
        .map(|(position, column)| (column.name.as_str(), position))
        .collect();

    let date_col = index.get(DATE_COLUMN).copied();
    let cost_col = index.get(COST_COLUMN).copied();
    let resource_id_col = index.get(RESOURCE_ID_COLUMN).copied();
    let service_col = index.get(SERVICE_COLUMN).copied();
    let resource_group_col = index.get(RESOURCE_GROUP_COLUMN).copied();
    let resource_type_col = index.get(RESOURCE_TYPE_COLUMN).copied();

    let mut records = Vec::with_capacity(response.rows.len());
    let mut total_cost = 0.0_f64;

    for row in &response.rows {
        let cost = round2(cell(row, cost_col).and_then(numeric).unwrap_or(0.0));
        total_cost += cost;

        let resource_id = cell(row, resource_id_col)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        records.push(CostRecord {
            date: cell(row, date_col)
                .map(decode_usage_date)
                .unwrap_or_else(|| UNKNOWN_DATE.to_string()),
            cost,
            service_name: string_cell(row, service_col),
            resource_name: display_name(&resource_id),
            resource_id,
            resource_group_name: string_cell(row, resource_group_col),
            resource_type: string_cell(row, resource_type_col),
            tags: String::new(),
        });
    }

    NormalizedCosts {
        records,
        total_cost,
    }
}

/// Sort contract for published records: date string ascending, then cost
/// descending within a date. The date key is `"DD-MM-YYYY"`, so this is
/// lexicographic, not chronological; the ordering is pinned by tests and
/// must not be silently corrected.
pub fn sort_records(records: &mut [CostRecord]) {
    records.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| b.cost.total_cmp(&a.cost))
    });
}

/// Round to two decimal places, half away from zero at the cent.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Decode an 8-digit `YYYYMMDD` cell (integer or string) to `"DD-MM-YYYY"`.
pub fn decode_usage_date(value: &Value) -> String {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return UNKNOWN_DATE.to_string(),
    };
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}-{}-{}", &raw[6..8], &raw[4..6], &raw[0..4])
    } else {
        UNKNOWN_DATE.to_string()
    }
}

/// Display name derived from a resource id path.
pub fn display_name(resource_id: &str) -> String {
    if resource_id.is_empty() {
        return FIELD_FALLBACK.to_string();
    }
    resource_id
        .rsplit('/')
        .next()
        .unwrap_or(FIELD_FALLBACK)
        .to_string()
}

fn cell(row: &[Value], column: Option<usize>) -> Option<&Value> {
    column.and_then(|position| row.get(position))
}

fn string_cell(row: &[Value], column: Option<usize>) -> String {
    cell(row, column)
        .and_then(Value::as_str)
        .unwrap_or(FIELD_FALLBACK)
        .to_string()
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
