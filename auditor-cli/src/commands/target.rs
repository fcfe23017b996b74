//! Target command handlers

use anyhow::{Context, Result};
use auditor_core::domain::target::Target;
use auditor_core::dto::target::CreateTarget;
use clap::Subcommand;
use colored::*;

use crate::context::App;
use crate::display::format_time;
use crate::id_resolver::resolve_target_id;
use crate::types::IdOrPrefix;

/// Target subcommands
#[derive(Subcommand)]
pub enum TargetCommands {
    /// Register a target you are authorized to scan
    Add {
        /// Target URL (e.g., https://example.com)
        url: String,
    },
    /// List your targets
    List,
    /// Show one target
    Get {
        /// Target ID or unambiguous prefix
        id: String,
    },
    /// Delete a target; its jobs are kept
    Delete {
        /// Target ID or unambiguous prefix
        id: String,
    },
}

pub async fn handle_target_command(command: TargetCommands, app: &App) -> Result<()> {
    app.require_login()?;

    match command {
        TargetCommands::Add { url } => add_target(app, url).await,
        TargetCommands::List => list_targets(app).await,
        TargetCommands::Get { id } => get_target(app, &id).await,
        TargetCommands::Delete { id } => delete_target(app, &id).await,
    }
}

async fn add_target(app: &App, url: String) -> Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("target URL must start with http:// or https://");
    }

    let target = app
        .check(app.client.create_target(CreateTarget { url }).await)
        .context("Failed to create target")?;

    println!("{} Target registered", "✓".green());
    print_target(&target);
    Ok(())
}

async fn list_targets(app: &App) -> Result<()> {
    let targets = app.check(app.client.list_targets().await)?;

    if targets.is_empty() {
        println!("{}", "No targets registered.".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} target(s):", targets.len()).bold());
    println!();
    for target in &targets {
        print_target(target);
    }
    Ok(())
}

async fn get_target(app: &App, id: &str) -> Result<()> {
    let target_id = resolve_target_id(app, &IdOrPrefix::parse(id)?).await?;
    let target = app.check(app.client.get_target(target_id).await)?;
    print_target(&target);
    Ok(())
}

async fn delete_target(app: &App, id: &str) -> Result<()> {
    let target_id = resolve_target_id(app, &IdOrPrefix::parse(id)?).await?;
    app.check(app.client.delete_target(target_id).await)
        .context("Failed to delete target")?;

    println!("{} Target {} deleted", "✓".green(), target_id.to_string().dimmed());
    Ok(())
}

fn print_target(target: &Target) {
    println!("  {} {}", "▸".cyan(), target.url.bold());
    println!("    ID:      {}", target.id.to_string().dimmed());
    println!("    Created: {}", format_time(target.created_at).dimmed());
    println!();
}
