//! List issues assigned to the current user.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

use super::connect;
use crate::jira::model::ISSUE_FIELDS;
use crate::render;

pub fn run(config_path: &Path, open_sprint: bool) -> Result<()> {
    let client = connect(config_path)?;
    let jql = build_jql(open_sprint);
    debug!(%jql, "listing issues");

    let issues = client
        .search(&jql, ISSUE_FIELDS, None)
        .context("Failed to list issues")?;

    for issue in &issues {
        println!("{}", render::summary_line(issue));
    }
    Ok(())
}

fn build_jql(open_sprint: bool) -> String {
    let mut jql = String::from("assignee = currentUser()");
    if open_sprint {
        jql.push_str(" AND sprint in (openSprints())");
    }
    jql.push_str(" ORDER BY created");
    jql
}
