//! Jira REST payloads and the domain types built from them.
//!
//! Raw payload structs mirror the JSON the server sends and tolerate
//! missing or null fields; the domain types are what the rest of the crate
//! works with.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

/// Timestamp format used by the Jira REST API (`2024-03-01T09:15:00.000+0100`).
const JIRA_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Fields requested for every issue search.
pub const ISSUE_FIELDS: &str =
    "parent,priority,assignee,status,creator,subtasks,issuetype,project,created,updated,description,summary";

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub issues: Vec<RawIssue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawIssue {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: RawFields,
    #[serde(rename = "renderedFields", default)]
    pub rendered_fields: Option<RawRenderedFields>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFields {
    #[serde(default)]
    pub summary: String,
    pub issuetype: Option<Named>,
    pub priority: Option<Named>,
    pub status: Option<RawStatus>,
    pub description: Option<String>,
    pub parent: Option<Box<RawIssue>>,
    #[serde(default)]
    pub subtasks: Vec<RawIssue>,
    pub assignee: Option<RawUser>,
    pub creator: Option<RawUser>,
    pub updated: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRenderedFields {
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawStatus {
    pub name: String,
    #[serde(rename = "statusCategory")]
    pub category: Option<RawStatusCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawStatusCategory {
    pub key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUser {
    pub name: Option<String>,
    #[serde(rename = "accountId")]
    pub account_id: Option<String>,
    #[serde(rename = "displayName", default)]
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentsResponse {
    #[serde(default)]
    pub comments: Vec<RawComment>,
}

#[derive(Debug, Deserialize)]
pub struct RawComment {
    #[serde(default)]
    pub body: String,
    pub author: Option<RawUser>,
    #[serde(default)]
    pub updated: String,
}

#[derive(Debug, Deserialize)]
pub struct DevStatusResponse {
    #[serde(default)]
    pub detail: Vec<RawDevDetail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDevDetail {
    #[serde(default)]
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub pull_requests: Vec<RawPullRequest>,
    #[serde(default)]
    pub repositories: Vec<RawRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPullRequest {
    pub name: String,
    #[serde(default)]
    pub url: String,
    pub author: Option<Named>,
    #[serde(default)]
    pub comment_count: u32,
    pub source: Option<RawPullRequestRef>,
    #[serde(default)]
    pub reviewers: Vec<Reviewer>,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct RawPullRequestRef {
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct RawRepository {
    #[serde(default)]
    pub commits: Vec<RawCommit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCommit {
    pub author: Option<Named>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub display_id: String,
}

/// A Jira user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
}

/// Workflow status plus its category key (`new`, `indeterminate`, `done`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub name: String,
    pub category: String,
}

/// A Jira issue. Summary-level issues (parents, sub-tasks) leave the
/// optional fields empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub key: String,
    pub internal_id: String,
    pub summary: String,
    pub issue_type: String,
    pub status: Status,
    pub priority: String,
    pub description: Option<String>,
    pub subtasks: Vec<Issue>,
    pub parent: Option<Box<Issue>>,
    pub assignee: Option<User>,
    pub creator: Option<User>,
    pub updated: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub body: String,
    pub author: Option<User>,
    pub updated: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Branch {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Reviewer {
    pub name: String,
    #[serde(default)]
    pub approved: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PullRequest {
    pub name: String,
    pub url: String,
    pub author_name: String,
    pub comment_count: u32,
    pub source: Branch,
    pub reviewers: Vec<Reviewer>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub id: String,
    pub author_name: String,
    pub message: String,
    pub url: String,
}

/// Development information linked to an issue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DevStatus {
    pub branches: Vec<Branch>,
    pub pull_requests: Vec<PullRequest>,
    pub commits: Vec<Commit>,
}

impl DevStatus {
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty() && self.pull_requests.is_empty() && self.commits.is_empty()
    }
}

impl PullRequest {
    /// Reviewers with approvals first, then alphabetically.
    pub fn sorted_reviewers(&self) -> Vec<&Reviewer> {
        let mut reviewers: Vec<&Reviewer> = self.reviewers.iter().collect();
        reviewers.sort_by(|a, b| b.approved.cmp(&a.approved).then_with(|| a.name.cmp(&b.name)));
        reviewers
    }
}

impl From<RawUser> for User {
    fn from(raw: RawUser) -> Self {
        let id = raw.name.or(raw.account_id).unwrap_or_default();
        let name = if raw.display_name.is_empty() {
            id.clone()
        } else {
            raw.display_name
        };
        Self { id, name }
    }
}

impl From<RawIssue> for Issue {
    fn from(raw: RawIssue) -> Self {
        let fields = raw.fields;
        let rendered = raw.rendered_fields.and_then(|r| r.description);
        let status = fields
            .status
            .map(|s| Status {
                name: s.name,
                category: s.category.map(|c| c.key).unwrap_or_default(),
            })
            .unwrap_or_else(|| Status {
                name: "Unknown".to_string(),
                category: String::new(),
            });

        Self {
            key: raw.key,
            internal_id: raw.id,
            summary: fields.summary,
            issue_type: fields.issuetype.map(|t| t.name).unwrap_or_default(),
            status,
            priority: fields.priority.map(|p| p.name).unwrap_or_default(),
            description: rendered.or(fields.description),
            subtasks: fields.subtasks.into_iter().map(Issue::from).collect(),
            parent: fields.parent.map(|p| Box::new(Issue::from(*p))),
            assignee: fields.assignee.map(User::from),
            creator: fields.creator.map(User::from),
            updated: fields.updated.as_deref().and_then(parse_timestamp),
        }
    }
}

impl From<RawComment> for Comment {
    fn from(raw: RawComment) -> Self {
        Self {
            body: raw.body,
            author: raw.author.map(User::from),
            updated: raw.updated,
        }
    }
}

impl From<RawPullRequest> for PullRequest {
    fn from(raw: RawPullRequest) -> Self {
        let source = raw
            .source
            .map(|s| Branch {
                name: s.branch,
                url: s.url,
            })
            .unwrap_or_else(|| Branch {
                name: String::new(),
                url: String::new(),
            });
        Self {
            name: raw.name,
            url: raw.url,
            author_name: raw.author.map(|a| a.name).unwrap_or_default(),
            comment_count: raw.comment_count,
            source,
            reviewers: raw.reviewers,
            status: raw.status,
        }
    }
}

impl From<RawCommit> for Commit {
    fn from(raw: RawCommit) -> Self {
        Self {
            id: raw.display_id,
            author_name: raw.author.map(|a| a.name).unwrap_or_default(),
            message: raw.message,
            url: raw.url,
        }
    }
}

/// Parse a Jira timestamp, ignoring values in other formats.
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value, JIRA_TIME_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
}
