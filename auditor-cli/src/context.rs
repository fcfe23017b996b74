//! Per-invocation wiring of session, client and configuration

use anyhow::{Result, bail};
use auditor_client::{AuditorClient, ClientError, ErrorKind};
use auditor_sync::{LoginNavigator, SessionGuard};
use colored::*;
use std::sync::Arc;

use crate::config::Config;
use crate::token_store::FileTokenStore;

/// Points the user back to `auditor login`
pub struct TerminalNavigator;

impl LoginNavigator for TerminalNavigator {
    fn redirect_to_login(&self) {
        eprintln!(
            "{}",
            "Session closed. Run `auditor login` to sign in again.".yellow()
        );
    }
}

/// Everything a command needs to talk to the API
pub struct App {
    pub config: Config,
    pub session: SessionGuard,
    pub client: AuditorClient,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let tokens = FileTokenStore::new(config.token_file.clone());
        let session = SessionGuard::new(Box::new(tokens), Box::new(TerminalNavigator));
        let client = AuditorClient::new(config.api_url.as_str()).with_tokens(Arc::new(session.clone()));

        Self {
            config: config.clone(),
            session,
            client,
        }
    }

    /// Fails early when no session token is stored
    pub fn require_login(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            bail!("Not logged in. Run `auditor login` first.");
        }
        Ok(())
    }

    /// Unwraps an API result, routing credential rejections to the session
    pub fn check<T>(&self, result: auditor_client::Result<T>) -> Result<T> {
        result.map_err(|err| {
            if err.kind() == ErrorKind::Auth {
                self.session.report_auth_failure();
            }
            describe(err, &self.config.api_url)
        })
    }
}

/// Turns an API failure into a user-facing error
fn describe(err: ClientError, api_url: &str) -> anyhow::Error {
    match err.kind() {
        ErrorKind::Network => {
            anyhow::Error::new(err).context(format!("Could not reach the scan API at {}", api_url))
        }
        ErrorKind::Auth | ErrorKind::Validation | ErrorKind::NotFound => err.into(),
    }
}
