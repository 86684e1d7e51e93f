//! Full issue details loaded on demand for the detail pane.

use super::poller::FetchFailure;
use super::snapshot::IssueRecord;
use crate::jira::model::{Comment, DevStatus, Issue};
use crate::render;

/// A comment as shown in the detail pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentSummary {
    pub author: String,
    pub updated: String,
    pub body: String,
}

/// Everything the detail pane shows beyond the snapshot row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueDetails {
    pub key: String,
    /// Plain-text description.
    pub description: String,
    pub subtasks: Vec<IssueRecord>,
    pub comments: Vec<CommentSummary>,
    /// One line per commit, branch and pull request.
    pub development: Vec<String>,
}

impl IssueDetails {
    pub fn new(issue: Issue, comments: Vec<Comment>, dev: &DevStatus) -> Self {
        let description = issue
            .description
            .as_deref()
            .map(render::html_to_text)
            .unwrap_or_default();

        let comments = comments
            .into_iter()
            .map(|comment| CommentSummary {
                author: comment
                    .author
                    .map(|a| a.name)
                    .unwrap_or_else(|| "Anonymous".to_string()),
                updated: comment.updated,
                body: render::html_to_text(&comment.body),
            })
            .collect();

        let mut development = Vec::new();
        for pull_request in &dev.pull_requests {
            development.push(format!(
                "PR {} [{}] by {}, {} comments",
                pull_request.name,
                pull_request.status,
                pull_request.author_name,
                pull_request.comment_count
            ));
        }
        for branch in &dev.branches {
            development.push(format!("Branch {}", branch.name));
        }
        for commit in &dev.commits {
            development.push(format!(
                "Commit {} {}",
                commit.id,
                commit.message.lines().next().unwrap_or("")
            ));
        }

        Self {
            key: issue.key,
            description,
            subtasks: issue.subtasks.into_iter().map(IssueRecord::from).collect(),
            comments,
            development,
        }
    }
}

/// Outcome of loading details for `key`.
#[derive(Debug, Clone)]
pub struct DetailResult {
    pub key: String,
    pub outcome: Result<IssueDetails, FetchFailure>,
}

/// Detail pane contents for the selected issue.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loading(String),
    Loaded(IssueDetails),
    Failed { key: String, failure: FetchFailure },
}

impl DetailState {
    pub fn key(&self) -> &str {
        match self {
            DetailState::Loading(key) => key,
            DetailState::Loaded(details) => &details.key,
            DetailState::Failed { key, .. } => key,
        }
    }
}
