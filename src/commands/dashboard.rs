//! Live dashboard of the current user's issues.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::jira::{IssueQuery, JiraClient};
use crate::logging::{self, LogTarget};
use crate::tui::{Dashboard, DashboardOptions};

/// Run the dashboard until the user quits.
///
/// `interval` (seconds) and `jql` override the configured values.
pub fn run(
    config_path: &Path,
    verbose: bool,
    interval: Option<u64>,
    jql: Option<String>,
) -> Result<()> {
    let config = Config::load(config_path)?;
    // The log file lives next to a config that is now known to exist.
    let _log_guard = logging::init(verbose, LogTarget::File(logging::log_file_path(config_path)));

    // Validate before touching the terminal.
    let interval_secs = interval.unwrap_or(config.dashboard.refresh_interval_secs);
    let options = DashboardOptions::new(Duration::from_secs(interval_secs))?
        .with_fetch_timeout(Duration::from_secs(config.dashboard.request_timeout_secs));

    let jql = jql
        .filter(|q| !q.trim().is_empty())
        .unwrap_or_else(|| config.dashboard_jql().to_string());
    info!(%jql, interval_secs, "opening dashboard");

    let client = JiraClient::with_timeout(&config, options.fetch_timeout)
        .context("Failed to create Jira client")?;
    let query = Arc::new(IssueQuery::new(client, jql));

    let mut dashboard = Dashboard::start(query, options).context("Failed to start dashboard")?;
    dashboard.run()
}
