//! Request parameter resolution.
//!
//! Merges the JSON body and the query string into a single [`ReportParams`],
//! body fields winning over query fields for every parameter. A body that
//! failed to parse is handed in as an empty map upstream of this module, so
//! resolution itself can never fail.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

pub const DEFAULT_START_TIME: &str = "00:00:00";
pub const DEFAULT_END_TIME: &str = "23:59:59";
pub const DEFAULT_GRANULARITY: &str = "Daily";

/// The normalized parameter set for one report request.
///
/// Dates stay as raw strings here; the validator parses them and owns the
/// format rules. Serialized verbatim into the response metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ReportParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub subscription_id: Option<String>,
    pub include_tags: bool,
    pub granularity: String,
}

/// Merge body and query parameters, applying defaults.
pub fn resolve(
    body: &Map<String, Value>,
    query: &HashMap<String, String>,
    default_subscription: Option<&str>,
) -> ReportParams {
    ReportParams {
        start_date: string_param(body, query, "start_date"),
        end_date: string_param(body, query, "end_date"),
        start_time: string_param(body, query, "start_time")
            .unwrap_or_else(|| DEFAULT_START_TIME.to_string()),
        end_time: string_param(body, query, "end_time")
            .unwrap_or_else(|| DEFAULT_END_TIME.to_string()),
        subscription_id: string_param(body, query, "subscription_id")
            .or_else(|| default_subscription.map(str::to_string)),
        include_tags: include_tags(body, query),
        granularity: string_param(body, query, "granularity")
            .unwrap_or_else(|| DEFAULT_GRANULARITY.to_string()),
    }
}

/// A string-valued parameter: body first, then query. JSON numbers are
/// accepted and rendered as their decimal text; null counts as absent.
fn string_param(
    body: &Map<String, Value>,
    query: &HashMap<String, String>,
    key: &str,
) -> Option<String> {
    match body.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => query.get(key).cloned(),
    }
}

/// `include_tags` defaults to true and is only falsified by an explicit
/// non-truthy value. Truthy means JSON `true` or the string `"true"`.
fn include_tags(body: &Map<String, Value>, query: &HashMap<String, String>) -> bool {
    if let Some(value) = body.get("include_tags") {
        return truthy(value);
    }
    match query.get("include_tags") {
        Some(value) => value == "true",
        None => true,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        _ => false,
    }
}
