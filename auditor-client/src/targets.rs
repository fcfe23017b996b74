//! Target-related API endpoints

use crate::AuditorClient;
use crate::error::Result;
use auditor_core::domain::target::Target;
use auditor_core::dto::target::CreateTarget;
use reqwest::Method;
use uuid::Uuid;

impl AuditorClient {
    // =============================================================================
    // Target Management
    // =============================================================================

    /// Register a new target URL
    ///
    /// The API refuses private, loopback and non-whitelisted hosts with a
    /// validation error.
    pub async fn create_target(&self, req: CreateTarget) -> Result<Target> {
        let response = self
            .request(Method::POST, "/targets")
            .json(&req)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// List all targets of the current user
    pub async fn list_targets(&self) -> Result<Vec<Target>> {
        let response = self.request(Method::GET, "/targets").send().await?;

        self.handle_response(response).await
    }

    /// Get a target by ID
    pub async fn get_target(&self, target_id: Uuid) -> Result<Target> {
        let response = self
            .request(Method::GET, &format!("/targets/{}", target_id))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Delete a target
    ///
    /// Jobs that reference the target are kept.
    pub async fn delete_target(&self, target_id: Uuid) -> Result<()> {
        let response = self
            .request(Method::DELETE, &format!("/targets/{}", target_id))
            .send()
            .await?;

        self.handle_empty_response(response).await
    }
}
