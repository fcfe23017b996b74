//! Job command handlers
//!
//! One-shot queries plus the two watch modes, which render the state held by
//! a polling view until the observed jobs finish.

use anyhow::{Context, Result, anyhow};
use auditor_client::JobSource;
use auditor_core::domain::finding::{Finding, Severity};
use auditor_core::domain::job::{Job, JobStatus};
use auditor_core::domain::target::Target;
use auditor_core::dto::job::{CreateJob, FindingQuery, JobListQuery, KNOWN_TOOLS};
use auditor_sync::views::{self, JobSnapshot, TargetCache};
use auditor_sync::{JobDetailView, JobListView, SessionGuard, ViewState};
use clap::Subcommand;
use colored::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Notify, watch};
use tracing::warn;
use uuid::Uuid;

use crate::context::App;
use crate::display::{
    colorize_status, format_duration, print_findings, print_job_details, print_job_summary,
};
use crate::id_resolver::{resolve_job_id, resolve_target_id};
use crate::types::IdOrPrefix;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Launch a scan job against a target
    Create {
        /// Target ID or unambiguous prefix
        target: String,

        /// Scanners to run (ZAP, Nuclei, SSLyze)
        #[arg(long, value_delimiter = ',', default_value = "ZAP")]
        tools: Vec<String>,

        /// Keep watching the job until it finishes
        #[arg(short, long)]
        watch: bool,
    },
    /// List jobs
    List {
        /// Only jobs in this status
        #[arg(long)]
        status: Option<JobStatus>,

        /// Keep refreshing until every listed job is finished
        #[arg(short, long)]
        watch: bool,
    },
    /// Show one job and its findings
    Get {
        /// Job ID or unambiguous prefix
        id: String,

        /// Only findings of this severity
        #[arg(long)]
        severity: Option<Severity>,
    },
    /// List the findings of a job
    Findings {
        /// Job ID or unambiguous prefix
        id: String,

        /// Only findings of this severity
        #[arg(long)]
        severity: Option<Severity>,
    },
    /// Follow a job until it finishes
    Watch {
        /// Job ID or unambiguous prefix
        id: String,

        /// Only findings of this severity
        #[arg(long)]
        severity: Option<Severity>,
    },
}

pub async fn handle_job_command(command: JobCommands, app: &App) -> Result<()> {
    app.require_login()?;

    match command {
        JobCommands::Create {
            target,
            tools,
            watch,
        } => create_job(app, &target, tools, watch).await,
        JobCommands::List { status, watch } => {
            let query = JobListQuery {
                status_filter: status,
            };
            if watch {
                watch_jobs(app, query).await
            } else {
                list_jobs(app, query).await
            }
        }
        JobCommands::Get { id, severity } => get_job(app, &id, severity).await,
        JobCommands::Findings { id, severity } => list_findings(app, &id, severity).await,
        JobCommands::Watch { id, severity } => {
            let job_id = resolve_job_id(app, &IdOrPrefix::parse(&id)?).await?;
            watch_job(app, job_id, severity).await
        }
    }
}

async fn create_job(app: &App, target: &str, tools: Vec<String>, follow: bool) -> Result<()> {
    let target_id = resolve_target_id(app, &IdOrPrefix::parse(target)?).await?;

    // Accept any casing of the known scanner names
    let tools_used = tools
        .iter()
        .map(|tool| {
            KNOWN_TOOLS
                .iter()
                .find(|known| known.eq_ignore_ascii_case(tool.trim()))
                .map(|known| known.to_string())
                .unwrap_or_else(|| tool.trim().to_string())
        })
        .collect();

    let job = app
        .check(
            app.client
                .create_job(CreateJob {
                    target_id,
                    tools_used,
                })
                .await,
        )
        .context("Failed to create job")?;

    println!(
        "{} Job {} created ({})",
        "✓".green(),
        job.short_id().bold(),
        colorize_status(job.status)
    );

    if follow {
        println!();
        watch_job(app, job.id, None).await
    } else {
        println!("  Follow it with `auditor job watch {}`", job.short_id());
        Ok(())
    }
}

/// Target of every job, for labelling listings
async fn target_index(app: &App) -> Result<HashMap<Uuid, Target>> {
    let targets = app.check(app.client.list_targets().await)?;
    Ok(targets.into_iter().map(|target| (target.id, target)).collect())
}

async fn list_jobs(app: &App, query: JobListQuery) -> Result<()> {
    let jobs = app.check(app.client.list_jobs(query).await)?;
    let targets = target_index(app).await?;
    print_job_list(&jobs, &targets, query);
    Ok(())
}

fn print_job_list(jobs: &[Job], targets: &HashMap<Uuid, Target>, query: JobListQuery) {
    if jobs.is_empty() {
        match query.status_filter {
            Some(status) => println!("{}", format!("No {} jobs found.", status).yellow()),
            None => println!("{}", "No jobs found.".yellow()),
        }
        return;
    }

    println!("{}", format!("Found {} job(s):", jobs.len()).bold());
    println!();
    for job in jobs {
        print_job_summary(job, targets.get(&job.target_id));
        println!();
    }
}

async fn get_job(app: &App, id: &str, severity: Option<Severity>) -> Result<()> {
    let job_id = resolve_job_id(app, &IdOrPrefix::parse(id)?).await?;
    let cache = TargetCache::new();
    let snapshot = app.check(
        views::fetch_job_snapshot(
            &app.client,
            job_id,
            FindingQuery {
                severity_filter: severity,
            },
            &cache,
        )
        .await,
    )?;

    print_snapshot(&snapshot);
    Ok(())
}

async fn list_findings(app: &App, id: &str, severity: Option<Severity>) -> Result<()> {
    let job_id = resolve_job_id(app, &IdOrPrefix::parse(id)?).await?;
    let query = FindingQuery {
        severity_filter: severity,
    };

    let (job, mut findings) = app.check(
        tokio::try_join!(
            app.client.get_job(job_id),
            app.client.get_findings(job_id, query)
        ),
    )?;
    Finding::sort_for_display(&mut findings);

    print_findings(&findings, job.is_terminal());
    Ok(())
}

fn print_snapshot(snapshot: &JobSnapshot) {
    print_job_details(&snapshot.job, snapshot.target.as_ref());
    println!();
    print_findings(&snapshot.findings, snapshot.findings_final());
}

/// Follows one job through its lifecycle
async fn watch_job(app: &App, job_id: Uuid, severity: Option<Severity>) -> Result<()> {
    let source: Arc<dyn JobSource> = Arc::new(app.client.clone());
    let mut view = JobDetailView::open(
        source,
        app.session.clone(),
        job_id,
        FindingQuery {
            severity_filter: severity,
        },
        app.config.detail_poll(),
    );

    println!(
        "{}",
        format!("Watching job {} (Ctrl-C to stop)", job_id).bold()
    );

    let mut last_status: Option<JobStatus> = None;
    let outcome = follow(&app.session, view.store().subscribe(), |state| match state {
        ViewState::NotLoaded => Ok(false),
        ViewState::Ready(snapshot) => {
            let status = snapshot.job.status;
            if let Some(previous) = last_status {
                if !status.follows(previous) {
                    warn!("Job {} went from {} back to {}", job_id, previous, status);
                }
            }
            if last_status != Some(status) {
                print_status_change(&snapshot);
                last_status = Some(status);
            }
            if snapshot.is_terminal() {
                println!();
                print_snapshot(&snapshot);
                return Ok(true);
            }
            Ok(false)
        }
        ViewState::NotFound(message) => Err(anyhow!("Job {} not found: {}", job_id, message)),
        ViewState::Unavailable(message) => {
            Err(anyhow!("Could not load job {}: {}", job_id, message))
        }
    })
    .await;

    view.close();
    outcome
}

fn print_status_change(snapshot: &JobSnapshot) {
    let job = &snapshot.job;
    let mut line = format!(
        "  {} {} {}",
        chrono::Local::now().format("%H:%M:%S").to_string().dimmed(),
        job.short_id().bold(),
        colorize_status(job.status)
    );
    if job.status == JobStatus::Running {
        line.push_str(&format!(" on {}", snapshot.target_label()));
    }
    if let Some(duration) = job.duration() {
        line.push_str(&format!(" after {}", format_duration(duration)));
    }
    println!("{}", line);
}

/// Refreshes the job list until every job is finished
async fn watch_jobs(app: &App, query: JobListQuery) -> Result<()> {
    let targets = target_index(app).await?;
    let source: Arc<dyn JobSource> = Arc::new(app.client.clone());
    let mut view = JobListView::open(
        source,
        app.session.clone(),
        query,
        app.config.list_poll(),
    );

    let outcome = follow(&app.session, view.store().subscribe(), |state| match state {
        ViewState::NotLoaded => Ok(false),
        ViewState::Ready(jobs) => {
            println!(
                "{}",
                format!("── {} ──", chrono::Local::now().format("%H:%M:%S")).dimmed()
            );
            print_job_list(&jobs, &targets, query);
            Ok(views::all_terminal(&jobs))
        }
        ViewState::NotFound(message) | ViewState::Unavailable(message) => {
            Err(anyhow!("Could not load jobs: {}", message))
        }
    })
    .await;

    view.close();
    outcome
}

/// Feeds every loaded view state to `render` until it reports completion
///
/// Also ends when the session is invalidated or on Ctrl-C.
async fn follow<T, F>(
    session: &SessionGuard,
    mut updates: watch::Receiver<ViewState<T>>,
    mut render: F,
) -> Result<()>
where
    T: Clone,
    F: FnMut(ViewState<T>) -> Result<bool>,
{
    let ended = Arc::new(Notify::new());
    let signal = Arc::clone(&ended);
    let subscription = session.subscribe(move || signal.notify_one());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        let state = updates.borrow_and_update().clone();
        if state.is_loaded() {
            match render(state) {
                Ok(true) => break Ok(()),
                Ok(false) => {}
                Err(err) => break Err(err),
            }
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
            }
            _ = ended.notified() => break Err(anyhow!("Session ended while watching")),
            _ = &mut ctrl_c => {
                println!("{}", "Stopped watching.".dimmed());
                break Ok(());
            }
        }
    };

    session.unsubscribe(subscription);
    outcome
}
