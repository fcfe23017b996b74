//! Metrics commands

use anyhow::Result;
use auditor_core::domain::finding::Severity;
use auditor_core::domain::metrics::{MetricsSummary, SeverityCount};
use clap::Subcommand;
use colored::*;
use serde::Serialize;

use crate::context::App;
use crate::display::colorize_severity;

/// Metrics views; the summary is shown when none is given
#[derive(Subcommand)]
pub enum MetricsCommands {
    /// Job and finding totals
    Summary,
    /// Findings per severity, zero counts included
    Severity,
    /// Findings per scanner
    Tools,
    /// Jobs and findings per day
    Timeline {
        /// Number of days to look back
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
    /// Targets with the most findings
    Targets {
        /// Number of targets to show
        #[arg(long, default_value_t = 5)]
        limit: u32,
    },
}

pub async fn handle_metrics_command(
    command: Option<MetricsCommands>,
    app: &App,
    json: bool,
) -> Result<()> {
    app.require_login()?;

    match command.unwrap_or(MetricsCommands::Summary) {
        MetricsCommands::Summary => {
            let summary = app.check(app.client.metrics_summary().await)?;
            output(&summary, json, print_summary)
        }
        MetricsCommands::Severity => {
            let counts = rank_severities(app.check(app.client.metrics_by_severity().await)?);
            output(&counts, json, |counts| {
                println!("{}", "Findings by severity:".bold());
                for entry in counts {
                    let label = match entry.severity.parse::<Severity>() {
                        Ok(severity) => colorize_severity(severity),
                        Err(_) => entry.severity.normal(),
                    };
                    println!("  {:<10} {}", label, entry.count);
                }
            })
        }
        MetricsCommands::Tools => {
            let counts = app.check(app.client.metrics_by_tool().await)?;
            output(&counts, json, |counts| {
                if counts.is_empty() {
                    println!("{}", "No findings yet.".yellow());
                    return;
                }
                println!("{}", "Findings by tool:".bold());
                for entry in counts {
                    println!("  {:<10} {}", entry.tool.cyan(), entry.count);
                }
            })
        }
        MetricsCommands::Timeline { days } => {
            let points = app.check(app.client.metrics_timeline(days).await)?;
            output(&points, json, |points| {
                if points.is_empty() {
                    println!("{}", format!("No activity in the last {} days.", days).yellow());
                    return;
                }
                println!("{}", format!("Activity over the last {} days:", days).bold());
                println!("  {:<12} {:>6} {:>9}", "DATE".dimmed(), "JOBS".dimmed(), "FINDINGS".dimmed());
                for point in points {
                    println!("  {:<12} {:>6} {:>9}", point.date, point.jobs, point.findings);
                }
            })
        }
        MetricsCommands::Targets { limit } => {
            let targets = app.check(app.client.top_targets(limit).await)?;
            output(&targets, json, |targets| {
                if targets.is_empty() {
                    println!("{}", "No findings yet.".yellow());
                    return;
                }
                println!("{}", "Targets with the most findings:".bold());
                for (rank, entry) in targets.iter().enumerate() {
                    println!(
                        "  {}. {} {} ({} findings)",
                        rank + 1,
                        entry.target_url.cyan(),
                        entry.target_id.to_string()[..8].dimmed(),
                        entry.count
                    );
                }
            })
        }
    }
}

/// Prints `value` as JSON or through `render`
fn output<T: Serialize + ?Sized>(value: &T, json: bool, render: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        render(value);
    }
    Ok(())
}

fn print_summary(summary: &MetricsSummary) {
    println!("{}", "Scan Metrics:".bold());
    println!("  Jobs:     {}", summary.total_jobs);
    println!("  Findings: {}", summary.total_findings);

    if !summary.findings_by_severity.is_empty() {
        println!("\n{}", "By severity:".bold());
        for severity in Severity::ALL.iter().rev() {
            let count = summary
                .findings_by_severity
                .get(severity.as_str())
                .or_else(|| summary.findings_by_severity.get(&severity.label()));
            if let Some(count) = count {
                println!("  {:<10} {}", colorize_severity(*severity), count);
            }
        }
    }

    if !summary.findings_by_tool.is_empty() {
        println!("\n{}", "By tool:".bold());
        for (tool, count) in &summary.findings_by_tool {
            println!("  {:<10} {}", tool.cyan(), count);
        }
    }
}

/// Orders counts most severe first; unrecognised severities go last
fn rank_severities(mut counts: Vec<SeverityCount>) -> Vec<SeverityCount> {
    counts.sort_by_key(|entry| std::cmp::Reverse(entry.severity.parse::<Severity>().ok()));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(severity: &str, count: u64) -> SeverityCount {
        SeverityCount {
            severity: severity.to_string(),
            count,
        }
    }

    #[test]
    fn test_severities_ranked_most_severe_first() {
        // The API answers in alphabetical order
        let ranked = rank_severities(vec![
            count("critical", 1),
            count("high", 4),
            count("info", 9),
            count("low", 0),
            count("medium", 2),
            count("unknown", 3),
        ]);

        let order: Vec<&str> = ranked.iter().map(|entry| entry.severity.as_str()).collect();
        assert_eq!(order, vec!["critical", "high", "medium", "low", "info", "unknown"]);
    }

    #[test]
    fn test_uppercase_severities_are_ranked() {
        let ranked = rank_severities(vec![count("LOW", 1), count("CRITICAL", 1)]);
        assert_eq!(ranked[0].severity, "CRITICAL");
    }
}
