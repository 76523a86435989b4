use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use connector_core::{ReportingWindow, UsageRecord, format_record_time, usage_record_id};

/// A backend capability that measures consumption of one resource type
/// within a reporting window.
pub trait Consumption {
    fn collect(
        &self,
        subscription_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<f64, ConsumptionError>;
}

/// Source for resources that must be reported even when nothing was consumed.
pub struct ZeroUsage;

impl Consumption for ZeroUsage {
    fn collect(
        &self,
        _subscription_id: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<f64, ConsumptionError> {
        Ok(0.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("consumption collection failed for `{resource_id}`: {message}")]
pub struct ConsumptionError {
    pub resource_id: String,
    pub message: String,
}

impl ConsumptionError {
    pub fn new(resource_id: &str, message: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.to_string(),
            message: message.into(),
        }
    }
}

/// Builds one usage record per subscription item that has a registered
/// consumption source. Items without a source are silently skipped.
///
/// A failing source aborts the whole collection; nothing is submitted for
/// the window in that case.
pub fn collect_usage_records(
    sources: &HashMap<String, Box<dyn Consumption>>,
    items: &[String],
    subscription_id: &str,
    window: ReportingWindow,
) -> Result<Vec<UsageRecord>, ConsumptionError> {
    let mut records = Vec::new();
    for item in items {
        let Some(source) = sources.get(item) else {
            continue;
        };
        let value = source.collect(subscription_id, window.start, window.end)?;
        info!(resource = %item, value, "adding usage record");
        records.push(UsageRecord {
            usage_record_id: usage_record_id(subscription_id, window.end, item),
            item_search_criteria: "item.mpn".to_string(),
            item_search_value: item.clone(),
            amount: value,
            quantity: value,
            start_time_utc: format_record_time(window.start),
            end_time_utc: format_record_time(window.end),
            asset_search_criteria: "parameter.asset_id".to_string(),
            asset_search_value: subscription_id.to_string(),
        });
    }
    Ok(records)
}
