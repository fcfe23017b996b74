//! Job-related API endpoints

use crate::AuditorClient;
use crate::error::{ClientError, Result};
use auditor_core::domain::finding::Finding;
use auditor_core::domain::job::Job;
use auditor_core::dto::job::{CreateJob, FindingQuery, JobListQuery};
use reqwest::Method;
use uuid::Uuid;

impl AuditorClient {
    // =============================================================================
    // Job Lifecycle
    // =============================================================================

    /// Launch a new scan job
    ///
    /// The request is checked locally first; an empty or unknown tool list
    /// fails with a validation error without contacting the API.
    ///
    /// # Example
    /// ```no_run
    /// # use auditor_client::AuditorClient;
    /// # use auditor_core::dto::job::CreateJob;
    /// # use uuid::Uuid;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = AuditorClient::new("http://localhost:8000");
    /// let job = client.create_job(CreateJob {
    ///     target_id: Uuid::new_v4(),
    ///     tools_used: vec!["ZAP".to_string()],
    /// }).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_job(&self, req: CreateJob) -> Result<Job> {
        req.validate().map_err(ClientError::invalid)?;

        let response = self
            .request(Method::POST, "/jobs")
            .json(&req)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// List jobs, newest first, optionally filtered by status
    pub async fn list_jobs(&self, query: JobListQuery) -> Result<Vec<Job>> {
        let response = self
            .request(Method::GET, "/jobs")
            .query(&query)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get a job by ID
    pub async fn get_job(&self, job_id: Uuid) -> Result<Job> {
        let response = self
            .request(Method::GET, &format!("/jobs/{}", job_id))
            .send()
            .await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Findings
    // =============================================================================

    /// Get the findings of a job, optionally filtered by severity
    ///
    /// The API returns them most severe first.
    pub async fn get_findings(&self, job_id: Uuid, query: FindingQuery) -> Result<Vec<Finding>> {
        let response = self
            .request(Method::GET, &format!("/jobs/{}/findings", job_id))
            .query(&query)
            .send()
            .await?;

        self.handle_response(response).await
    }
}
