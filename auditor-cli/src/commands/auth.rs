//! Account and session commands

use anyhow::{Context, Result};
use auditor_core::dto::auth::Credentials;
use clap::Args;
use colored::*;

use crate::context::App;
use crate::display::format_time;

/// Account credentials
#[derive(Args)]
pub struct AuthArgs {
    /// Account email
    #[arg(long, env = "AUDITOR_EMAIL")]
    email: String,

    /// Account password
    #[arg(long, env = "AUDITOR_PASSWORD", hide_env_values = true)]
    password: String,
}

impl From<AuthArgs> for Credentials {
    fn from(args: AuthArgs) -> Self {
        Credentials {
            email: args.email,
            password: args.password,
        }
    }
}

pub async fn login(app: &App, args: AuthArgs) -> Result<()> {
    let credentials = Credentials::from(args);

    // A rejected login is not a session invalidation: there is no session yet.
    let token = app
        .client
        .login(&credentials)
        .await
        .context("Login failed")?;

    app.session.login(token.access_token);
    println!(
        "{} Signed in as {}",
        "✓".green(),
        credentials.email.bold()
    );
    println!(
        "  Token stored in {}",
        app.config.token_file.display().to_string().dimmed()
    );

    Ok(())
}

pub async fn register(app: &App, args: AuthArgs) -> Result<()> {
    let credentials = Credentials::from(args);
    let user = app
        .client
        .register(&credentials)
        .await
        .context("Registration failed")?;

    println!("{} Account created for {}", "✓".green(), user.email.bold());
    println!("  Run `auditor login` to sign in.");

    Ok(())
}

pub fn logout(app: &App) -> Result<()> {
    if !app.session.is_authenticated() {
        println!("{}", "Not logged in.".yellow());
        return Ok(());
    }

    app.session.logout();
    Ok(())
}

pub async fn whoami(app: &App) -> Result<()> {
    app.require_login()?;
    let user = app.check(app.client.me().await)?;

    println!("{}", "Signed in as:".bold());
    println!("  Email:   {}", user.email.cyan());
    println!("  ID:      {}", user.id.to_string().dimmed());
    if let Some(role) = &user.role {
        println!("  Role:    {}", role);
    }
    println!("  Since:   {}", format_time(user.created_at));

    Ok(())
}
