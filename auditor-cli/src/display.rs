//! Terminal rendering shared by the commands

use auditor_core::domain::finding::{Finding, Severity};
use auditor_core::domain::job::{Job, JobStatus};
use auditor_core::domain::target::Target;
use chrono::{DateTime, Utc};
use colored::*;

pub fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Compact human duration, e.g. `1h 02m 05s`
pub fn format_duration(duration: chrono::Duration) -> String {
    let total = duration.num_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

pub fn colorize_status(status: JobStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        JobStatus::Queued => label.yellow(),
        JobStatus::Running => label.cyan(),
        JobStatus::Done => label.green(),
        JobStatus::Failed => label.red(),
    }
}

pub fn colorize_severity(severity: Severity) -> ColoredString {
    let label = severity.label();
    match severity {
        Severity::Info => label.dimmed(),
        Severity::Low => label.blue(),
        Severity::Medium => label.yellow(),
        Severity::High => label.red(),
        Severity::Critical => label.red().bold(),
    }
}

/// One job as a list entry
pub fn print_job_summary(job: &Job, target: Option<&Target>) {
    println!(
        "  {} {} {}  {}",
        "▸".cyan(),
        job.short_id().bold(),
        colorize_status(job.status),
        job.target_label(target)
    );
    println!("    Tools:   {}", job.tools_used.join(", ").dimmed());
    println!("    Created: {}", format_time(job.created_at).dimmed());
}

/// Full job information
pub fn print_job_details(job: &Job, target: Option<&Target>) {
    println!("{}", "Job Details:".bold());
    println!("  ID:        {}", job.id.to_string().cyan());
    println!("  Target:    {}", job.target_label(target));
    println!("  Status:    {}", colorize_status(job.status));
    println!("  Tools:     {}", job.tools_used.join(", "));
    println!("  Created:   {}", format_time(job.created_at));

    if let Some(started) = job.started_at {
        println!("  Started:   {}", format_time(started));
    }

    if let Some(finished) = job.finished_at {
        println!("  Finished:  {}", format_time(finished));
    }

    if let Some(duration) = job.duration() {
        println!("  Duration:  {}", format_duration(duration));
    }
}

pub fn print_finding(finding: &Finding) {
    println!(
        "  {} [{}] {} {}",
        "▸".cyan(),
        colorize_severity(finding.severity),
        finding.title.bold(),
        format!("({})", finding.tool).dimmed()
    );
    if let Some(description) = &finding.description {
        println!("    {}", description);
    }
    if let Some(evidence) = &finding.evidence {
        println!("    Evidence:       {}", evidence.dimmed());
    }
    if let Some(recommendation) = &finding.recommendation {
        println!("    Recommendation: {}", recommendation);
    }
}

/// Findings list with a per-severity tally
///
/// `final_result` is false while the job can still produce findings.
pub fn print_findings(findings: &[Finding], final_result: bool) {
    if !final_result {
        println!(
            "{}",
            "⚠ Job still in progress, findings may be incomplete".yellow()
        );
    }

    if findings.is_empty() {
        println!("{}", "No findings.".yellow());
        return;
    }

    let tally: Vec<String> = Severity::ALL
        .iter()
        .rev()
        .filter_map(|severity| {
            let count = findings.iter().filter(|f| f.severity == *severity).count();
            (count > 0).then(|| format!("{} {}", count, severity.label()))
        })
        .collect();

    println!(
        "{}",
        format!("Found {} finding(s): {}", findings.len(), tally.join(", ")).bold()
    );
    println!();
    for finding in findings {
        print_finding(finding);
    }
}
