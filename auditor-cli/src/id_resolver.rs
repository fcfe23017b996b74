//! ID resolver module
//!
//! Resolves short id prefixes (as printed by the list commands) to full ids
//! by listing the resource and looking for a unique match.

use anyhow::{Context, Result, anyhow};
use auditor_core::dto::job::JobListQuery;
use uuid::Uuid;

use crate::context::App;
use crate::types::IdOrPrefix;

/// Resolve a job ID or prefix to a full UUID
pub async fn resolve_job_id(app: &App, id: &IdOrPrefix) -> Result<Uuid> {
    if let Some(uuid) = id.as_uuid() {
        return Ok(uuid);
    }

    let jobs = app
        .check(app.client.list_jobs(JobListQuery::default()).await)
        .context("Failed to fetch jobs for ID resolution")?;

    unique_match("job", id, jobs.iter().map(|job| job.id))
}

/// Resolve a target ID or prefix to a full UUID
pub async fn resolve_target_id(app: &App, id: &IdOrPrefix) -> Result<Uuid> {
    if let Some(uuid) = id.as_uuid() {
        return Ok(uuid);
    }

    let targets = app
        .check(app.client.list_targets().await)
        .context("Failed to fetch targets for ID resolution")?;

    unique_match("target", id, targets.iter().map(|target| target.id))
}

/// Picks the only candidate matching `id`
///
/// Fails when nothing or more than one candidate matches.
fn unique_match(kind: &str, id: &IdOrPrefix, candidates: impl Iterator<Item = Uuid>) -> Result<Uuid> {
    let matches: Vec<Uuid> = candidates.filter(|candidate| id.matches(candidate)).collect();

    match matches.as_slice() {
        [] => Err(anyhow!("No {} found with ID starting with '{}'", kind, id)),
        [only] => Ok(*only),
        _ => {
            let ids: Vec<String> = matches.iter().map(Uuid::to_string).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple {}s: {}",
                id,
                kind,
                ids.join(", ")
            ))
        }
    }
}
