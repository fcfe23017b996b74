//! Aggregate metrics

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Totals for the authenticated user, as returned by `/metrics/summary`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_jobs: u64,
    pub total_findings: u64,
    #[serde(default)]
    pub findings_by_severity: BTreeMap<String, u64>,
    #[serde(default)]
    pub findings_by_tool: BTreeMap<String, u64>,
}

/// Findings of one severity; every severity is listed, zero counts included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCount {
    pub severity: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCount {
    pub tool: String,
    pub count: u64,
}

/// Jobs created and findings reported on one day (UTC)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub jobs: u64,
    pub findings: u64,
}

/// A target ranked by the number of findings across its jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCount {
    pub target_id: Uuid,
    pub target_url: String,
    pub count: u64,
}

/// Envelope of the per-dimension metrics endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsData<T> {
    pub data: Vec<T>,
}
