//! Tag joining.
//!
//! Merges the resource-id-keyed tag map into the cost records, rendering
//! each record's tags as a single display string.

use serde_json::{Map, Value};

use crate::azure::resources::TagMap;
use crate::report::normalize::CostRecord;

pub const NO_TAGS: &str = "No tags";

/// Fill every record's `tags` field.
///
/// With `include_tags` off the map is ignored entirely. A record without a
/// resource id never triggers a lookup.
pub fn join_tags(records: &mut [CostRecord], tags: &TagMap, include_tags: bool) {
    for record in records.iter_mut() {
        record.tags = if !include_tags || record.resource_id.is_empty() {
            NO_TAGS.to_string()
        } else {
            match tags.get(&record.resource_id) {
                Some(map) if !map.is_empty() => format_tags(map),
                _ => NO_TAGS.to_string(),
            }
        };
    }
}

/// `"K1=V1; K2=V2"` in the map's insertion order.
fn format_tags(tags: &Map<String, Value>) -> String {
    tags.iter()
        .map(|(key, value)| format!("{key}={}", render(value)))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Tag values are strings upstream; anything else renders as its JSON text.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
