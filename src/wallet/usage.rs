//! API usage statistics for the customer dashboard.
//!
//! The usage endpoint is the worst envelope offender: depending on the
//! deployment the stats arrive under `data.data.usage`, `data.usage`, or as
//! the data object itself. The probing happens once, here.

use crate::api::{ApiClient, ApiError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_cost: f64,
}

/// Usage stats from any of the known envelope shapes, `None` when nothing
/// recognizable is present.
#[must_use]
pub fn extract_usage(value: &Value) -> Option<UsageStats> {
    let candidates = [
        &value["data"]["data"]["usage"],
        &value["data"]["usage"],
        &value["usage"],
        &value["data"],
    ];

    candidates
        .into_iter()
        .find(|candidate| candidate.is_object() && !candidate["totalRequests"].is_null())
        .and_then(|candidate| serde_json::from_value(candidate.clone()).ok())
}

/// Fetch usage statistics for the dashboard.
pub async fn fetch_usage(client: &ApiClient) -> Result<Option<UsageStats>, ApiError> {
    let value = client.get(&client.prefixed("/usage")).await?;
    Ok(extract_usage(&value))
}
