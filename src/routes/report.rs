//! The cost report handler.
//!
//! Resolves parameters from body and query, validates them, fans out to the
//! cost and tag APIs, and assembles the response envelope. The tag fetch is
//! best-effort: on failure the report proceeds with an empty tag map.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Query, State},
};
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::{
    AppState,
    azure::{
        costs,
        resources::{self, TagMap},
        token,
    },
    error::AppError,
    params::{self, ReportParams},
    report::{self, ResponseEnvelope},
    validation,
};

/// GET/POST `/api/cost-report`.
pub async fn cost_report(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Json<ResponseEnvelope>, AppError> {
    let body_fields = parse_body(&body);
    let params = params::resolve(
        &body_fields,
        &query,
        state.config.azure.default_subscription_id.as_deref(),
    );
    let range = validation::validate(&params).map_err(AppError::Validation)?;

    // Validated non-empty above.
    let subscription_id = params.subscription_id.clone().unwrap_or_default();

    tracing::info!(
        %subscription_id,
        start_date = params.start_date.as_deref().unwrap_or_default(),
        end_date = params.end_date.as_deref().unwrap_or_default(),
        granularity = %params.granularity,
        include_tags = params.include_tags,
        "building cost report"
    );

    let azure = &state.config.azure;
    let bearer = token::acquire(&state.http_client, azure).await?;

    let (cost_response, tag_map) =
        fetch_upstreams(&state, &bearer, &subscription_id, &params).await?;

    let envelope = report::build(&cost_response, &tag_map, &params, range);
    tracing::info!(
        %subscription_id,
        total_records = envelope.metadata.total_records,
        total_cost = envelope.summary.total_cost,
        "cost report ready"
    );

    Ok(Json(envelope))
}

/// Fan-out/fan-in over the two independent upstream queries.
///
/// The calls have no data dependency, so they run concurrently. A cost
/// failure aborts the request; a tag failure degrades to an empty map. When
/// tags are excluded the tag query is skipped outright.
async fn fetch_upstreams(
    state: &AppState,
    bearer: &str,
    subscription_id: &str,
    params: &ReportParams,
) -> Result<(costs::QueryProperties, TagMap), AppError> {
    let azure = &state.config.azure;
    let cost_future = costs::query(&state.http_client, azure, bearer, subscription_id, params);

    if !params.include_tags {
        return Ok((cost_future.await?, TagMap::new()));
    }

    let tag_future = resources::query_tags(&state.http_client, azure, bearer, subscription_id);
    let (cost_result, tag_result) = tokio::join!(cost_future, tag_future);

    let tag_map = tag_result.unwrap_or_else(|error| {
        tracing::warn!(%error, "tag query failed, reporting costs without tags");
        TagMap::new()
    });

    Ok((cost_result?, tag_map))
}

/// Parse the raw body as a JSON object. Absent, empty or malformed bodies
/// all resolve to an empty map; a bad body is never a request error.
fn parse_body(body: &Bytes) -> Map<String, Value> {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| value.as_object().cloned())
        .unwrap_or_default()
}
