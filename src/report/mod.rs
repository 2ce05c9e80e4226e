//! The report pipeline: normalize → join tags → sort → aggregate → assemble.

pub mod normalize;
pub mod summary;
pub mod tags;

use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::Serialize;

use crate::{
    azure::{costs::QueryProperties, resources::TagMap},
    params::ReportParams,
    report::{
        normalize::{CostRecord, NormalizedCosts},
        summary::SummaryStatistics,
    },
};

/// The success response: summary + itemized records + echoed parameters.
#[derive(Debug, Serialize)]
pub struct ResponseEnvelope {
    pub summary: SummaryStatistics,
    pub detailed_costs: Vec<CostRecord>,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    #[serde(flatten)]
    pub parameters: ReportParams,
    pub total_records: usize,
    /// RFC 3339 UTC generation timestamp.
    pub generated_at: String,
}

/// Run the full pipeline over one cost response and tag map.
pub fn build(
    costs: &QueryProperties,
    tag_map: &TagMap,
    params: &ReportParams,
    range: (NaiveDate, NaiveDate),
) -> ResponseEnvelope {
    let NormalizedCosts {
        mut records,
        total_cost,
    } = normalize::normalize(costs);

    tags::join_tags(&mut records, tag_map, params.include_tags);
    normalize::sort_records(&mut records);

    let summary = summary::summarize(&records, total_cost, range.0, range.1);
    let metadata = ReportMetadata {
        parameters: params.clone(),
        total_records: records.len(),
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    };

    ResponseEnvelope {
        summary,
        detailed_costs: records,
        metadata,
    }
}
