//! The dashboard's query collaborator backed by the Jira client.

use std::sync::RwLock;
use tracing::{debug, warn};

use super::model::{DevStatus, ISSUE_FIELDS};
use super::{JiraClient, JiraError};
use crate::tui::details::IssueDetails;
use crate::tui::poller::{FetchFailure, QueryCollaborator};
use crate::tui::snapshot::{IssueRecord, IssueSnapshot};

/// Runs one JQL query per poll and turns the result into a snapshot.
pub struct IssueQuery {
    client: JiraClient,
    jql: RwLock<String>,
}

impl IssueQuery {
    pub fn new(client: JiraClient, jql: impl Into<String>) -> Self {
        Self {
            client,
            jql: RwLock::new(jql.into()),
        }
    }

    fn jql(&self) -> String {
        self.jql
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

fn to_failure(err: JiraError) -> FetchFailure {
    if err.is_timeout() {
        FetchFailure::new("request timed out")
    } else {
        FetchFailure::new(format!("{:#}", anyhow::Error::new(err)))
    }
}

impl QueryCollaborator for IssueQuery {
    fn fetch_assigned_issues(&self) -> Result<IssueSnapshot, FetchFailure> {
        let issues = self
            .client
            .search(&self.jql(), ISSUE_FIELDS, None)
            .map_err(to_failure)?;
        debug!(count = issues.len(), "fetched issues");
        Ok(issues.into_iter().map(IssueRecord::from).collect())
    }

    fn fetch_issue_details(&self, key: &str) -> Result<IssueDetails, FetchFailure> {
        let issue = self.client.issue(key).map_err(to_failure)?;
        let comments = self.client.comments(&issue.key).map_err(to_failure)?;
        let dev = self
            .client
            .dev_status(&issue.internal_id)
            .unwrap_or_else(|err| {
                warn!(%key, error = %err, "development info unavailable");
                DevStatus::default()
            });
        Ok(IssueDetails::new(issue, comments, &dev))
    }

    fn set_query(&self, query: &str) -> bool {
        *self
            .jql
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = query.to_string();
        true
    }

    fn describe(&self) -> String {
        self.jql()
    }
}
