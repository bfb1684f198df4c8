//! Response models owned by the HTTP layer.
//!
//! Marketplace items and pages come from `plugin_catalog_core::present`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInfo {
    pub created_at: DateTime<Utc>,
    pub ttl_secs: u64,
    pub age_secs: u64,
    pub trending: usize,
    pub recently_updated: usize,
    pub all: usize,
    pub degraded: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}
