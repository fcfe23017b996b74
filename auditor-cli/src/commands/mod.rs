//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod auth;
mod job;
mod metrics;
mod target;

pub use auth::AuthArgs;
pub use job::JobCommands;
pub use metrics::MetricsCommands;
pub use target::TargetCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;
use crate::context::App;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session token
    Login(AuthArgs),
    /// Create a new account
    Register(AuthArgs),
    /// Forget the stored session token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Scan target management
    Target {
        #[command(subcommand)]
        command: TargetCommands,
    },
    /// Scan job management
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Show aggregate scan metrics
    Metrics {
        /// Print raw JSON
        #[arg(long, global = true)]
        json: bool,

        #[command(subcommand)]
        command: Option<MetricsCommands>,
    },
}

/// Routes the command to the appropriate handler module
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let app = App::new(config);

    match command {
        Commands::Login(args) => auth::login(&app, args).await,
        Commands::Register(args) => auth::register(&app, args).await,
        Commands::Logout => auth::logout(&app),
        Commands::Whoami => auth::whoami(&app).await,
        Commands::Target { command } => target::handle_target_command(command, &app).await,
        Commands::Job { command } => job::handle_job_command(command, &app).await,
        Commands::Metrics { json, command } => {
            metrics::handle_metrics_command(command, &app, json).await
        }
    }
}
