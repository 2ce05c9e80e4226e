//! Cost Management query client.
//!
//! Issues the ActualCost query grouped by the four dimensions the report
//! surfaces and returns the API's columnar shape untouched; turning it into
//! flat records is the normalizer's job.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{config::AzureConfig, error::UpstreamError, params::ReportParams};

const API_VERSION: &str = "2023-03-01";

/// The cost column requested from the API and resolved by the normalizer.
pub const COST_COLUMN: &str = "PreTaxCost";

const GROUPING_DIMENSIONS: [&str; 4] = [
    "ServiceName",
    "ResourceId",
    "ResourceGroupName",
    "ResourceType",
];

/// Column-oriented query result: field names once, values per row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryProperties {
    #[serde(default)]
    pub columns: Vec<QueryColumn>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryColumn {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    properties: QueryProperties,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    timeframe: &'a str,
    time_period: TimePeriod,
    dataset: Dataset<'a>,
}

#[derive(Debug, Serialize)]
struct TimePeriod {
    from: String,
    to: String,
}

#[derive(Debug, Serialize)]
struct Dataset<'a> {
    granularity: &'a str,
    aggregation: Aggregation<'a>,
    grouping: Vec<Grouping<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Aggregation<'a> {
    total_cost: AggregationFunction<'a>,
}

#[derive(Debug, Serialize)]
struct AggregationFunction<'a> {
    name: &'a str,
    function: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Grouping<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    name: &'a str,
}

/// Run the cost query for one subscription and date range.
pub async fn query(
    client: &Client,
    azure: &AzureConfig,
    token: &str,
    subscription_id: &str,
    params: &ReportParams,
) -> Result<QueryProperties, UpstreamError> {
    let url = format!(
        "{}/subscriptions/{}/providers/Microsoft.CostManagement/query?api-version={}",
        azure.management_url, subscription_id, API_VERSION
    );

    // start_date/end_date were validated before any upstream call.
    let from = timestamp(params.start_date.as_deref(), &params.start_time);
    let to = timestamp(params.end_date.as_deref(), &params.end_time);

    let request = QueryRequest {
        kind: "ActualCost",
        timeframe: "Custom",
        time_period: TimePeriod { from, to },
        dataset: Dataset {
            granularity: params.granularity.as_str(),
            aggregation: Aggregation {
                total_cost: AggregationFunction {
                    name: COST_COLUMN,
                    function: "Sum",
                },
            },
            grouping: GROUPING_DIMENSIONS
                .iter()
                .map(|&name| Grouping {
                    kind: "Dimension",
                    name,
                })
                .collect(),
        },
    };

    let response = client
        .post(&url)
        .bearer_auth(token)
        .json(&request)
        .send()
        .await
        .map_err(UpstreamError::CostRequest)?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(UpstreamError::CostRejected { status, body });
    }

    let parsed: QueryResponse = response.json().await.map_err(UpstreamError::CostRequest)?;
    tracing::debug!(
        subscription_id,
        rows = parsed.properties.rows.len(),
        "cost query returned"
    );
    Ok(parsed.properties)
}

/// `"{date}T{time}Z"`, matching what the query API accepts for custom
/// time periods.
fn timestamp(date: Option<&str>, time: &str) -> String {
    format!("{}T{}Z", date.unwrap_or_default(), time)
}
