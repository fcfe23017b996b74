//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::target::Target;

/// One scan execution against a target
///
/// Jobs are created by the API and advanced by the server-side scanners.
/// The client observes them, it never writes `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub target_id: Uuid,
    pub status: JobStatus,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tools_used: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Job lifecycle status
///
/// `queued -> running -> (done | failed)`. Both `done` and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Done,
        JobStatus::Failed,
    ];

    /// Whether no further transition can happen from this status
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    /// Wire name, as used in `status_filter`
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    fn rank(self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Running => 1,
            JobStatus::Done | JobStatus::Failed => 2,
        }
    }

    /// Whether moving from `previous` to `self` is a legal forward step
    ///
    /// Staying in the same status counts as legal.
    pub fn follows(self, previous: JobStatus) -> bool {
        if previous.is_terminal() {
            return self == previous;
        }
        self.rank() >= previous.rank()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            "done" => Ok(JobStatus::Done),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!(
                "unknown job status '{}' (expected queued, running, done or failed)",
                other
            )),
        }
    }
}

impl Job {
    /// Whether the job reached `done` or `failed`
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// First 8 characters of the id, for compact listings
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }

    /// Wall time between start and finish, once both are known
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.finished_at) {
            (Some(started), Some(finished)) => Some(finished.signed_duration_since(started)),
            _ => None,
        }
    }

    /// Display label for the job's target
    ///
    /// Targets can be deleted without removing their jobs, so the stored
    /// `target_id` is used when the target is no longer resolvable.
    pub fn target_label(&self, target: Option<&Target>) -> String {
        match target {
            Some(target) if target.id == self.target_id => target.url.clone(),
            _ => self.target_id.to_string(),
        }
    }

    /// Checks the timestamp invariants of the lifecycle
    ///
    /// `started_at` must be absent while queued and `finished_at` must be
    /// present exactly when the status is terminal.
    pub fn check_timestamps(&self) -> Result<(), String> {
        if self.status == JobStatus::Queued && self.started_at.is_some() {
            return Err(format!("job {} is queued but has started_at", self.id));
        }
        if self.status.is_terminal() != self.finished_at.is_some() {
            return Err(format!(
                "job {} is {} but finished_at is {}",
                self.id,
                self.status,
                if self.finished_at.is_some() { "set" } else { "missing" }
            ));
        }
        Ok(())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
