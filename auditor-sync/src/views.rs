//! Job detail and job list views
//!
//! Both views are thin bindings of [`PollingScheduler`]: they supply the
//! fetch function, the terminal predicate and the subject key, and expose
//! the resulting [`JobStateStore`].

use auditor_client::{JobSource, Result};
use auditor_core::domain::finding::{Finding, Severity};
use auditor_core::domain::job::{Job, JobStatus};
use auditor_core::domain::target::Target;
use auditor_core::dto::job::{FindingQuery, JobListQuery};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::lock;
use crate::scheduler::{PollConfig, PollingScheduler};
use crate::session::SessionGuard;
use crate::store::{JobStateStore, ViewState};

/// A job together with its findings, taken from one poll
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub job: Job,
    /// Sorted most severe first
    pub findings: Vec<Finding>,
    /// `None` when the target was deleted or could not be loaded
    pub target: Option<Target>,
}

impl JobSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.job.is_terminal()
    }

    /// Whether the findings can be presented as the final result
    ///
    /// A running job may still produce findings.
    pub fn findings_final(&self) -> bool {
        self.job.is_terminal()
    }

    pub fn target_label(&self) -> String {
        self.job.target_label(self.target.as_ref())
    }
}

/// Whether every job in a listing is terminal
///
/// An empty listing counts as terminal: there is nothing left to watch.
pub fn all_terminal(jobs: &[Job]) -> bool {
    jobs.iter().all(Job::is_terminal)
}

/// Last target lookup of a view
///
/// A target the API reported missing is remembered as `None`, so a deleted
/// target is not requested again on every tick. Other lookup failures are
/// not cached.
#[derive(Debug, Default)]
pub struct TargetCache {
    entry: Mutex<Option<(Uuid, Option<Target>)>>,
}

impl TargetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached answer for `target_id`, `Some(None)` if it is known to be gone
    fn get(&self, target_id: Uuid) -> Option<Option<Target>> {
        lock(&self.entry)
            .as_ref()
            .filter(|(id, _)| *id == target_id)
            .map(|(_, target)| target.clone())
    }

    fn put(&self, target_id: Uuid, target: Option<Target>) {
        *lock(&self.entry) = Some((target_id, target));
    }
}

/// Fetches a job and its findings concurrently and labels the target
pub async fn fetch_job_snapshot(
    source: &dyn JobSource,
    job_id: Uuid,
    query: FindingQuery,
    target_cache: &TargetCache,
) -> Result<JobSnapshot> {
    let (job, mut findings) = tokio::try_join!(
        source.fetch_job(job_id),
        source.fetch_findings(job_id, query)
    )?;

    if let Err(problem) = job.check_timestamps() {
        warn!("Job {} has inconsistent timestamps: {}", job.id, problem);
    }

    Finding::sort_for_display(&mut findings);
    let target = resolve_target(source, &job, target_cache).await?;

    Ok(JobSnapshot {
        job,
        findings,
        target,
    })
}

async fn resolve_target(
    source: &dyn JobSource,
    job: &Job,
    cache: &TargetCache,
) -> Result<Option<Target>> {
    if let Some(cached) = cache.get(job.target_id) {
        return Ok(cached);
    }

    match source.fetch_target(job.target_id).await {
        Ok(target) => {
            cache.put(job.target_id, Some(target.clone()));
            Ok(Some(target))
        }
        Err(err) if err.is_auth() => Err(err),
        Err(err) if err.is_not_found() => {
            debug!("Target {} no longer exists: {}", job.target_id, err);
            cache.put(job.target_id, None);
            Ok(None)
        }
        Err(err) => {
            debug!("Target {} not resolvable: {}", job.target_id, err);
            Ok(None)
        }
    }
}

/// Live view of one job and its findings
pub struct JobDetailView {
    source: Arc<dyn JobSource>,
    job_id: Uuid,
    query: FindingQuery,
    config: PollConfig,
    target_cache: Arc<TargetCache>,
    scheduler: PollingScheduler<JobSnapshot>,
}

impl JobDetailView {
    /// Opens the view and starts observing the job
    pub fn open(
        source: Arc<dyn JobSource>,
        session: SessionGuard,
        job_id: Uuid,
        query: FindingQuery,
        config: PollConfig,
    ) -> Self {
        let mut view = Self {
            source,
            job_id,
            query,
            config,
            target_cache: Arc::new(TargetCache::new()),
            scheduler: PollingScheduler::new(JobStateStore::new(), session),
        };
        view.start();
        view
    }

    /// Polling subject of a job under a findings filter
    pub fn subject_key(job_id: Uuid, query: FindingQuery) -> String {
        match query.severity_filter {
            Some(severity) => format!("job:{}?severity_filter={}", job_id, severity),
            None => format!("job:{}", job_id),
        }
    }

    fn start(&mut self) {
        let source = Arc::clone(&self.source);
        let cache = Arc::clone(&self.target_cache);
        let (job_id, query) = (self.job_id, self.query);

        self.scheduler.start(
            Self::subject_key(job_id, query),
            move || {
                let source = Arc::clone(&source);
                let cache = Arc::clone(&cache);
                async move { fetch_job_snapshot(source.as_ref(), job_id, query, &cache).await }
            },
            JobSnapshot::is_terminal,
            self.config,
        );
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn query(&self) -> FindingQuery {
        self.query
    }

    pub fn store(&self) -> &JobStateStore<JobSnapshot> {
        self.scheduler.store()
    }

    pub fn current(&self) -> ViewState<JobSnapshot> {
        self.scheduler.store().current()
    }

    pub fn is_active(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn is_polling(&self) -> bool {
        self.scheduler.is_polling()
    }

    /// Changes the findings filter and observes again from scratch
    pub fn set_severity_filter(&mut self, severity: Option<Severity>) {
        if self.query.severity_filter == severity && self.scheduler.is_active() {
            return;
        }
        self.query = FindingQuery {
            severity_filter: severity,
        };
        self.start();
    }

    /// Fetches again now, re-arming the timer if the job is still running
    pub fn refresh(&mut self) {
        self.start();
    }

    /// Stops observing; the last snapshot stays readable
    pub fn close(&mut self) {
        self.scheduler.stop();
    }
}

/// Live view of the job listing
pub struct JobListView {
    source: Arc<dyn JobSource>,
    query: JobListQuery,
    config: PollConfig,
    scheduler: PollingScheduler<Vec<Job>>,
}

impl JobListView {
    /// Opens the view and starts observing the listing
    pub fn open(
        source: Arc<dyn JobSource>,
        session: SessionGuard,
        query: JobListQuery,
        config: PollConfig,
    ) -> Self {
        let mut view = Self {
            source,
            query,
            config,
            scheduler: PollingScheduler::new(JobStateStore::new(), session),
        };
        view.start();
        view
    }

    fn start(&mut self) {
        let source = Arc::clone(&self.source);
        let query = self.query;

        self.scheduler.start(
            query.subject_key(),
            move || {
                let source = Arc::clone(&source);
                async move { source.fetch_jobs(query).await }
            },
            |jobs: &Vec<Job>| all_terminal(jobs),
            self.config,
        );
    }

    pub fn query(&self) -> JobListQuery {
        self.query
    }

    pub fn store(&self) -> &JobStateStore<Vec<Job>> {
        self.scheduler.store()
    }

    pub fn current(&self) -> ViewState<Vec<Job>> {
        self.scheduler.store().current()
    }

    pub fn is_active(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn is_polling(&self) -> bool {
        self.scheduler.is_polling()
    }

    /// Changes the status filter and observes the new listing
    pub fn set_status_filter(&mut self, status: Option<JobStatus>) {
        if self.query.status_filter == status && self.scheduler.is_active() {
            return;
        }
        self.query = JobListQuery {
            status_filter: status,
        };
        self.start();
    }

    pub fn refresh(&mut self) {
        self.start();
    }

    pub fn close(&mut self) {
        self.scheduler.stop();
    }
}
