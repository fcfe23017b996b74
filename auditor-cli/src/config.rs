//! CLI configuration
//!
//! API location, token file and polling cadence of the watch commands.

use auditor_sync::PollConfig;
use std::path::PathBuf;
use std::time::Duration;

use crate::token_store::FileTokenStore;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the scan API (e.g., "http://localhost:8000")
    pub api_url: String,

    /// Where the session token is persisted
    pub token_file: PathBuf,

    /// Poll interval while watching a single job
    pub detail_interval: Duration,

    /// Poll interval while watching the job list
    pub list_interval: Duration,
}

impl Config {
    /// Creates a configuration with default token location and intervals
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            token_file: FileTokenStore::default_path(),
            detail_interval: Duration::from_secs(5),
            list_interval: Duration::from_secs(10),
        }
    }

    /// Polling of the job detail view
    ///
    /// Keeps the preset's short first tick; a fetch never outlives its interval.
    pub fn detail_poll(&self) -> PollConfig {
        let mut poll = PollConfig::detail();
        poll.interval = self.detail_interval;
        poll.initial_delay = poll.initial_delay.min(self.detail_interval);
        poll.fetch_timeout = poll.fetch_timeout.min(self.detail_interval);
        poll
    }

    /// Polling of the job list view
    pub fn list_poll(&self) -> PollConfig {
        let preset = PollConfig::list();
        PollConfig::new(self.list_interval)
            .with_fetch_timeout(preset.fetch_timeout.min(self.list_interval))
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_url.is_empty() {
            anyhow::bail!("api_url cannot be empty");
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!("api_url must start with http:// or https://");
        }

        if self.token_file.as_os_str().is_empty() {
            anyhow::bail!("token_file cannot be empty");
        }

        if self.detail_interval.is_zero() {
            anyhow::bail!("detail interval must be greater than 0");
        }

        if self.list_interval.is_zero() {
            anyhow::bail!("list interval must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("http://localhost:8000")
    }
}
