//! Cost aggregation.
//!
//! Computes the summary view over an already-sorted record sequence: total,
//! average per day, unique-entity counts, top-N rankings and the per-day
//! breakdown. Pure function of its inputs; re-running it over the same
//! records yields identical output.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::report::normalize::{CostRecord, FIELD_FALLBACK, round2};

pub const CURRENCY: &str = "USD";
pub const TOP_SERVICES_LIMIT: usize = 5;
pub const TOP_RESOURCES_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceCost {
    pub service: String,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceCost {
    pub resource: String,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCost {
    pub date: String,
    pub cost: f64,
}

/// The summary block of the response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub total_cost: f64,
    pub currency: &'static str,
    pub average_daily_cost: f64,
    pub unique_services: usize,
    pub unique_resources: usize,
    pub unique_resource_groups: usize,
    pub top_services: Vec<ServiceCost>,
    pub top_resources: Vec<ResourceCost>,
    /// Sorted by date string ascending; same lexicographic `"DD-MM-YYYY"`
    /// ordering as the detailed records.
    pub daily_breakdown: Vec<DailyCost>,
}

impl SummaryStatistics {
    /// The all-zero default for a report with no records.
    fn empty() -> Self {
        Self {
            total_cost: 0.0,
            currency: CURRENCY,
            average_daily_cost: 0.0,
            unique_services: 0,
            unique_resources: 0,
            unique_resource_groups: 0,
            top_services: Vec::new(),
            top_resources: Vec::new(),
            daily_breakdown: Vec::new(),
        }
    }
}

/// Aggregate the record sequence.
///
/// `total_cost` is the normalizer's per-row-rounded accumulation; the date
/// pair bounds the inclusive day count for the daily average.
pub fn summarize(
    records: &[CostRecord],
    total_cost: f64,
    start: NaiveDate,
    end: NaiveDate,
) -> SummaryStatistics {
    // Explicit short-circuit: no records means every aggregate is its zero
    // default, regardless of how long the requested range was.
    if records.is_empty() {
        return SummaryStatistics::empty();
    }

    let day_span = (end - start).num_days() + 1;
    let average_daily_cost = round2(total_cost / day_span as f64);

    let mut services: HashSet<&str> = HashSet::new();
    let mut resources: HashSet<&str> = HashSet::new();
    let mut resource_groups: HashSet<&str> = HashSet::new();

    let mut per_service: HashMap<&str, f64> = HashMap::new();
    let mut per_resource: HashMap<String, f64> = HashMap::new();
    let mut per_day: HashMap<&str, f64> = HashMap::new();

    for record in records {
        if record.service_name != FIELD_FALLBACK {
            services.insert(&record.service_name);
            *per_service.entry(&record.service_name).or_default() += record.cost;
        }
        if !record.resource_id.is_empty() {
            resources.insert(&record.resource_id);
        }
        if record.resource_group_name != FIELD_FALLBACK {
            resource_groups.insert(&record.resource_group_name);
        }
        if record.resource_name != FIELD_FALLBACK {
            let key = format!("{} ({})", record.resource_name, record.service_name);
            *per_resource.entry(key).or_default() += record.cost;
        }
        *per_day.entry(&record.date).or_default() += record.cost;
    }

    let mut top_services: Vec<ServiceCost> = per_service
        .into_iter()
        .map(|(service, cost)| ServiceCost {
            service: service.to_string(),
            cost: round2(cost),
        })
        .collect();
    top_services.sort_by(|a, b| {
        b.cost
            .total_cmp(&a.cost)
            .then_with(|| a.service.cmp(&b.service))
    });
    top_services.truncate(TOP_SERVICES_LIMIT);

    let mut top_resources: Vec<ResourceCost> = per_resource
        .into_iter()
        .map(|(resource, cost)| ResourceCost {
            resource,
            cost: round2(cost),
        })
        .collect();
    top_resources.sort_by(|a, b| {
        b.cost
            .total_cmp(&a.cost)
            .then_with(|| a.resource.cmp(&b.resource))
    });
    top_resources.truncate(TOP_RESOURCES_LIMIT);

    let mut daily_breakdown: Vec<DailyCost> = per_day
        .into_iter()
        .map(|(date, cost)| DailyCost {
            date: date.to_string(),
            cost: round2(cost),
        })
        .collect();
    daily_breakdown.sort_by(|a, b| a.date.cmp(&b.date));

    SummaryStatistics {
        total_cost: round2(total_cost),
        currency: CURRENCY,
        average_daily_cost,
        unique_services: services.len(),
        unique_resources: resources.len(),
        unique_resource_groups: resource_groups.len(),
        top_services,
        top_resources,
        daily_breakdown,
    }
}
