//! CLI command implementations.

pub mod configure;
pub mod dashboard;
pub mod ls;
pub mod show;

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::jira::JiraClient;

/// Load the configuration and build a client from it.
pub fn connect(config_path: &Path) -> Result<JiraClient> {
    let config = Config::load(config_path)?;
    JiraClient::new(&config).context("Failed to create Jira client")
}
