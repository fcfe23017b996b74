//! Auditor CLI
//!
//! Command-line interface for the security scan API: manage targets, launch
//! scan jobs and follow them until they finish.

mod commands;
mod config;
mod context;
mod display;
mod id_resolver;
mod token_store;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "auditor")]
#[command(about = "Security scan auditor CLI", long_about = None)]
struct Cli {
    /// Scan API URL
    #[arg(long, env = "AUDITOR_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// File holding the session token
    #[arg(long, env = "AUDITOR_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    /// Poll interval of `job watch`, in milliseconds
    #[arg(long, env = "AUDITOR_DETAIL_INTERVAL_MS", default_value_t = 5_000)]
    detail_interval_ms: u64,

    /// Poll interval of `job list --watch`, in milliseconds
    #[arg(long, env = "AUDITOR_LIST_INTERVAL_MS", default_value_t = 10_000)]
    list_interval_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auditor_cli=warn,auditor_sync=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::new(cli.api_url);
    if let Some(token_file) = cli.token_file {
        config.token_file = token_file;
    }
    config.detail_interval = Duration::from_millis(cli.detail_interval_ms);
    config.list_interval = Duration::from_millis(cli.list_interval_ms);
    config.validate()?;

    handle_command(cli.command, &config).await
}
