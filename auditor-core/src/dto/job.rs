//! Job DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::finding::Severity;
use crate::domain::job::JobStatus;

/// Scanners the API knows how to run
pub const KNOWN_TOOLS: [&str; 3] = ["ZAP", "Nuclei", "SSLyze"];

/// Request to launch a new scan job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    pub target_id: Uuid,
    pub tools_used: Vec<String>,
}

impl CreateJob {
    /// Rejects requests the API would refuse anyway
    ///
    /// At least one tool is required and every tool must be a known scanner.
    pub fn validate(&self) -> Result<(), String> {
        if self.tools_used.is_empty() {
            return Err("at least one tool must be selected".to_string());
        }

        let unknown: Vec<&str> = self
            .tools_used
            .iter()
            .map(String::as_str)
            .filter(|tool| !KNOWN_TOOLS.contains(tool))
            .collect();

        if !unknown.is_empty() {
            return Err(format!(
                "unknown tools: {} (valid tools: {})",
                unknown.join(", "),
                KNOWN_TOOLS.join(", ")
            ));
        }

        Ok(())
    }
}

/// Query parameters of `GET /jobs`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_filter: Option<JobStatus>,
}

impl JobListQuery {
    /// Stable key identifying this list as a polling subject
    pub fn subject_key(&self) -> String {
        match self.status_filter {
            Some(status) => format!("jobs?status_filter={}", status),
            None => "jobs".to_string(),
        }
    }
}

/// Query parameters of `GET /jobs/{id}/findings`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FindingQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_filter: Option<Severity>,
}
