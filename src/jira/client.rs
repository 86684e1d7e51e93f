//! Blocking client for the Jira REST API.

use reqwest::blocking::Client;
use reqwest::Certificate;
use serde::de::DeserializeOwned;
use std::fs;
use std::time::Duration;
use tracing::debug;

use super::model::{
    CommentsResponse, DevStatusResponse, Issue, SearchResponse, ISSUE_FIELDS,
};
use super::model::{Comment, DevStatus};
use super::JiraError;
use crate::config::Config;

const SEARCH_PATH: &str = "/rest/api/latest/search";
const DEV_STATUS_PATH: &str = "/rest/dev-status/1.0/issue/detail";

/// Longest error body kept in a [`JiraError::Status`].
const MAX_ERROR_BODY: usize = 300;

/// Authenticated Jira client. Built from an explicit [`Config`].
pub struct JiraClient {
    http: Client,
    base_url: String,
    user: String,
    token: String,
}

impl JiraClient {
    /// Create a client using the request timeout from the configuration.
    pub fn new(config: &Config) -> Result<Self, JiraError> {
        Self::with_timeout(
            config,
            Duration::from_secs(config.dashboard.request_timeout_secs.max(1)),
        )
    }

    /// Create a client with an explicit per-request timeout.
    pub fn with_timeout(config: &Config, timeout: Duration) -> Result<Self, JiraError> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("jira-cli/", env!("CARGO_PKG_VERSION")));

        if let Some(path) = config.cert_path() {
            let pem = fs::read(&path).map_err(|source| JiraError::CertificateRead {
                path: path.clone(),
                source,
            })?;
            let cert = Certificate::from_pem(&pem)
                .map_err(|source| JiraError::CertificateInvalid { path, source })?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder.build().map_err(JiraError::Client)?;

        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
            user: config.user.clone(),
            token: config.token.clone(),
        })
    }

    /// Run a JQL search.
    pub fn search(
        &self,
        jql: &str,
        fields: &str,
        expand: Option<&str>,
    ) -> Result<Vec<Issue>, JiraError> {
        let params = [
            ("jql", jql),
            ("fields", fields),
            ("expand", expand.unwrap_or("")),
        ];
        let response: SearchResponse = self.get(SEARCH_PATH, &params)?;
        Ok(response.issues.into_iter().map(Issue::from).collect())
    }

    /// Fetch a single issue with rendered fields.
    pub fn issue(&self, key: &str) -> Result<Issue, JiraError> {
        let jql = format!("issue = {}", key);
        self.search(&jql, ISSUE_FIELDS, Some("renderedFields"))?
            .into_iter()
            .next()
            .ok_or_else(|| JiraError::IssueNotFound(key.to_string()))
    }

    /// Comments on an issue, oldest first.
    pub fn comments(&self, key: &str) -> Result<Vec<Comment>, JiraError> {
        let path = format!("/rest/api/latest/issue/{}/comment", key);
        let response: CommentsResponse = self.get(&path, &[("orderBy", "created")])?;
        Ok(response.comments.into_iter().map(Comment::from).collect())
    }

    /// Branches, pull requests and commits linked to an issue.
    ///
    /// Takes the numeric issue id, not the key.
    pub fn dev_status(&self, internal_id: &str) -> Result<DevStatus, JiraError> {
        let mut status = DevStatus::default();

        let pull_requests: DevStatusResponse = self.get(
            DEV_STATUS_PATH,
            &[
                ("issueId", internal_id),
                ("applicationType", "stash"),
                ("dataType", "pullrequest"),
            ],
        )?;
        if let Some(detail) = pull_requests.detail.into_iter().next() {
            status.branches = detail.branches;
            status.pull_requests = detail.pull_requests.into_iter().map(Into::into).collect();
        }

        let repositories: DevStatusResponse = self.get(
            DEV_STATUS_PATH,
            &[
                ("issueId", internal_id),
                ("applicationType", "stash"),
                ("dataType", "repository"),
            ],
        )?;
        if let Some(detail) = repositories.detail.into_iter().next() {
            status.commits = detail
                .repositories
                .into_iter()
                .flat_map(|repo| repo.commits)
                .map(Into::into)
                .collect();
        }

        Ok(status)
    }

    fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T, JiraError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.user, Some(&self.token))
            .query(params)
            .send()
            .map_err(|source| JiraError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response.text().map_err(|source| JiraError::Http {
            url: url.clone(),
            source,
        })?;

        if !status.is_success() {
            return Err(JiraError::Status {
                url,
                status,
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| JiraError::Decode { url, source })
    }
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY {
        trimmed.to_string()
    } else {
        let mut short: String = trimmed.chars().take(MAX_ERROR_BODY).collect();
        short.push_str("...");
        short
    }
}
