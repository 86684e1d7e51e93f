//! Jira REST API access.

pub mod client;
pub mod model;
pub mod query;

use std::path::PathBuf;
use thiserror::Error;

pub use client::JiraClient;
pub use model::Issue;
pub use query::IssueQuery;

#[derive(Debug, Error)]
pub enum JiraError {
    #[error("Failed to read certificate {}", path.display())]
    CertificateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid certificate {}", path.display())]
    CertificateInvalid {
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Unexpected response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Issue {0} not found")]
    IssueNotFound(String),
}

impl JiraError {
    /// Whether the request gave up waiting for the server.
    pub fn is_timeout(&self) -> bool {
        matches!(self, JiraError::Http { source, .. } if source.is_timeout())
    }
}
