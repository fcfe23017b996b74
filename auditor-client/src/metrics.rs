//! Metrics endpoints

use crate::AuditorClient;
use crate::error::Result;
use auditor_core::domain::metrics::{
    MetricsData, MetricsSummary, SeverityCount, TargetCount, TimelinePoint, ToolCount,
};
use reqwest::Method;

impl AuditorClient {
    /// Get job and finding totals for the current user
    pub async fn metrics_summary(&self) -> Result<MetricsSummary> {
        let response = self
            .request(Method::GET, "/metrics/summary")
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get finding counts per severity
    pub async fn metrics_by_severity(&self) -> Result<Vec<SeverityCount>> {
        let response = self
            .request(Method::GET, "/metrics/by-severity")
            .send()
            .await?;

        let body: MetricsData<SeverityCount> = self.handle_response(response).await?;
        Ok(body.data)
    }

    /// Get finding counts per scanner
    pub async fn metrics_by_tool(&self) -> Result<Vec<ToolCount>> {
        let response = self
            .request(Method::GET, "/metrics/by-tool")
            .send()
            .await?;

        let body: MetricsData<ToolCount> = self.handle_response(response).await?;
        Ok(body.data)
    }

    /// Get daily job and finding counts over the last `days` days, oldest first
    pub async fn metrics_timeline(&self, days: u32) -> Result<Vec<TimelinePoint>> {
        let response = self
            .request(Method::GET, "/metrics/timeline")
            .query(&[("days", days)])
            .send()
            .await?;

        let body: MetricsData<TimelinePoint> = self.handle_response(response).await?;
        Ok(body.data)
    }

    /// Get the `limit` targets with the most findings
    pub async fn top_targets(&self, limit: u32) -> Result<Vec<TargetCount>> {
        let response = self
            .request(Method::GET, "/metrics/top-targets")
            .query(&[("limit", limit)])
            .send()
            .await?;

        let body: MetricsData<TargetCount> = self.handle_response(response).await?;
        Ok(body.data)
    }
}
