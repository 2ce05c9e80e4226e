//! Resource Graph tag query client.
//!
//! Fetches `{id, tags}` pairs for every resource in the subscription and
//! flattens them into a [`TagMap`]. A failure here is recoverable: the
//! report handler degrades to an empty map and every record shows
//! `"No tags"`.

use std::collections::HashMap;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{config::AzureConfig, error::UpstreamError};

const API_VERSION: &str = "2021-03-01";

const TAG_QUERY: &str = "Resources | project id, tags";

/// Resource id → tag key/value pairs.
///
/// The inner map is `serde_json::Map`, which with the `preserve_order`
/// feature keeps tags in the order the upstream emitted them; the joiner
/// relies on that when formatting.
pub type TagMap = HashMap<String, Map<String, Value>>;

#[derive(Debug, Serialize)]
struct GraphRequest<'a> {
    subscriptions: [&'a str; 1],
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct GraphResponse {
    #[serde(default)]
    data: Vec<GraphRow>,
}

#[derive(Debug, Deserialize)]
struct GraphRow {
    id: String,
    #[serde(default)]
    tags: Option<Map<String, Value>>,
}

/// Fetch the tag map for one subscription.
pub async fn query_tags(
    client: &Client,
    azure: &AzureConfig,
    token: &str,
    subscription_id: &str,
) -> Result<TagMap, UpstreamError> {
    let url = format!(
        "{}/providers/Microsoft.ResourceGraph/resources?api-version={}",
        azure.management_url, API_VERSION
    );

    let request = GraphRequest {
        subscriptions: [subscription_id],
        query: TAG_QUERY,
    };

    let response = client
        .post(&url)
        .bearer_auth(token)
        .json(&request)
        .send()
        .await
        .map_err(UpstreamError::TagRequest)?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(UpstreamError::TagRejected { status, body });
    }

    let parsed: GraphResponse = response.json().await.map_err(UpstreamError::TagRequest)?;
    tracing::debug!(
        subscription_id,
        resources = parsed.data.len(),
        "tag query returned"
    );

    Ok(parsed
        .data
        .into_iter()
        .map(|row| (row.id, row.tags.unwrap_or_default()))
        .collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn graph_rows_flatten_into_a_tag_map() {
        let parsed: GraphResponse = serde_json::from_value(json!({
            "data": [
                {"id": "/r1", "tags": {"Env": "PRD", "Team": "Eng"}},
                {"id": "/r2", "tags": null},
                {"id": "/r3"}
            ]
        }))
        .unwrap();

        let map: TagMap = parsed
            .data
            .into_iter()
            .map(|row| (row.id, row.tags.unwrap_or_default()))
            .collect();

        assert_eq!(map["/r1"].len(), 2);
        assert!(map["/r2"].is_empty());
        assert!(map["/r3"].is_empty());
    }
}
