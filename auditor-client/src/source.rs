//! Read-side contract used by pollers
//!
//! Pollers only need to read jobs, findings and targets. Depending on this
//! trait instead of [`AuditorClient`] lets them run against in-memory fakes.

use async_trait::async_trait;
use auditor_core::domain::finding::Finding;
use auditor_core::domain::job::Job;
use auditor_core::domain::target::Target;
use auditor_core::dto::job::{FindingQuery, JobListQuery};
use uuid::Uuid;

use crate::AuditorClient;
use crate::error::Result;

/// Source of remote job state
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Fetches a single job
    async fn fetch_job(&self, job_id: Uuid) -> Result<Job>;

    /// Fetches the findings of a job
    async fn fetch_findings(&self, job_id: Uuid, query: FindingQuery) -> Result<Vec<Finding>>;

    /// Fetches a target, used to label a job
    async fn fetch_target(&self, target_id: Uuid) -> Result<Target>;

    /// Fetches a job listing
    async fn fetch_jobs(&self, query: JobListQuery) -> Result<Vec<Job>>;
}

#[async_trait]
impl JobSource for AuditorClient {
    async fn fetch_job(&self, job_id: Uuid) -> Result<Job> {
        self.get_job(job_id).await
    }

    async fn fetch_findings(&self, job_id: Uuid, query: FindingQuery) -> Result<Vec<Finding>> {
        self.get_findings(job_id, query).await
    }

    async fn fetch_target(&self, target_id: Uuid) -> Result<Target> {
        self.get_target(target_id).await
    }

    async fn fetch_jobs(&self, query: JobListQuery) -> Result<Vec<Job>> {
        self.list_jobs(query).await
    }
}
