//! Show a single issue with sub-tasks, comments and development info.

use anyhow::{Context, Result};
use colored::Colorize;
use std::fmt::Write as _;
use std::path::Path;
use tabled::{Table, Tabled};
use tracing::{debug, warn};

use super::connect;
use crate::jira::model::{Comment, DevStatus, Issue, PullRequest, User};
use crate::render;

/// Longest sub-task summary shown in the table.
const SUBTASK_SUMMARY_WIDTH: usize = 50;

/// Longest pull request title shown.
const PULL_REQUEST_NAME_WIDTH: usize = 60;

#[derive(Tabled)]
struct SubtaskRow {
    #[tabled(rename = "Summary")]
    summary: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Assignee")]
    assignee: String,
}

pub fn run(config_path: &Path, key: &str) -> Result<()> {
    let client = connect(config_path)?;

    let issue = client
        .issue(key)
        .with_context(|| format!("Failed to load issue {}", key))?;
    println!("{}", issue_block(&issue));

    if !issue.subtasks.is_empty() {
        println!();
        println!("{}", "Sub-Tasks".bold().cyan());
        println!("{}", subtask_table(&issue));
    }

    let comments = client
        .comments(&issue.key)
        .with_context(|| format!("Failed to load comments for {}", issue.key))?;
    if !comments.is_empty() {
        println!();
        println!("{}", comment_block(&comments));
    }

    // Not every server has the development panel; skip it quietly.
    match client.dev_status(&issue.internal_id) {
        Ok(dev) if !dev.is_empty() => {
            println!();
            println!("{}", dev_block(&dev));
        }
        Ok(_) => debug!(key = %issue.key, "no development info"),
        Err(err) => warn!(key = %issue.key, error = %err, "failed to load development info"),
    }

    Ok(())
}

fn user_name(user: Option<&User>) -> String {
    user.map(|u| u.name.clone())
        .unwrap_or_else(|| "Unassigned".to_string())
}

/// Display name, with the login when it differs.
fn person(user: &User) -> String {
    if user.id.is_empty() || user.id == user.name {
        user.name.yellow().to_string()
    } else {
        format!("{} ({})", user.name.yellow(), user.id.dimmed())
    }
}

fn issue_block(issue: &Issue) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", render::issue_id(issue));
    let _ = writeln!(out, "{}", issue.status.name.dimmed());
    let _ = writeln!(out, "{}", issue.summary.bold());

    let mut people = Vec::new();
    if let Some(assignee) = &issue.assignee {
        people.push(format!("{} {}", "Assignee:".dimmed(), person(assignee)));
    }
    if let Some(creator) = &issue.creator {
        people.push(format!("{} {}", "Creator:".dimmed(), person(creator)));
    }
    if !people.is_empty() {
        let _ = writeln!(out, "{}", people.join(" "));
    }

    if let Some(description) = issue.description.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", render::html_to_text(description));
    }
    out.trim_end().to_string()
}

fn subtask_table(issue: &Issue) -> String {
    let rows: Vec<SubtaskRow> = issue
        .subtasks
        .iter()
        .map(|subtask| SubtaskRow {
            summary: render::truncate(&subtask.summary, SUBTASK_SUMMARY_WIDTH),
            key: subtask.key.clone(),
            status: subtask.status.name.clone(),
            assignee: user_name(subtask.assignee.as_ref()),
        })
        .collect();
    Table::new(&rows).to_string()
}

fn comment_block(comments: &[Comment]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Comments".bold().cyan());
    for comment in comments {
        let author = comment
            .author
            .as_ref()
            .map(|a| a.name.as_str())
            .unwrap_or("Anonymous");
        let _ = writeln!(out, "{} {}", author.blue(), comment.updated.dimmed());
        for line in comment.body.lines() {
            let _ = writeln!(out, "  {}", line);
        }
        let _ = writeln!(out);
    }
    out.trim_end().to_string()
}

fn pull_request_block(out: &mut String, pull_request: &PullRequest) {
    let status = match pull_request.status.to_lowercase().as_str() {
        "merged" => pull_request.status.green(),
        "declined" => pull_request.status.red(),
        _ => pull_request.status.yellow(),
    };
    let _ = writeln!(
        out,
        "{} {} Comments: {}",
        render::truncate(&pull_request.name, PULL_REQUEST_NAME_WIDTH).bold(),
        status,
        pull_request.comment_count
    );

    let reviewers: Vec<String> = pull_request
        .sorted_reviewers()
        .into_iter()
        .map(|r| {
            if r.approved {
                r.name.green().to_string()
            } else {
                r.name.clone()
            }
        })
        .collect();
    let _ = writeln!(
        out,
        "{} {} {} {}",
        "Author:".dimmed(),
        pull_request.author_name,
        "Reviewer:".dimmed(),
        reviewers.join(" ")
    );
    if !pull_request.source.name.is_empty() {
        let _ = writeln!(out, "{} {}", "Branch:".dimmed(), pull_request.source.name);
    }
    let _ = writeln!(out, "{}", pull_request.url.dimmed());
}

fn dev_block(dev: &DevStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Development".bold().cyan());

    if !dev.commits.is_empty() {
        let _ = writeln!(out, "Commit:");
        for commit in &dev.commits {
            let _ = writeln!(
                out,
                "  {} {} {}",
                commit.id.yellow(),
                commit.author_name.blue(),
                commit.message.lines().next().unwrap_or("")
            );
            let _ = writeln!(out, "  {}", commit.url.dimmed());
        }
    }

    if !dev.branches.is_empty() {
        let _ = writeln!(out, "Branch:");
        for branch in &dev.branches {
            let _ = writeln!(out, "  {} {}", branch.name, branch.url.dimmed());
        }
    }

    if !dev.pull_requests.is_empty() {
        let _ = writeln!(out, "Pull request:");
        for pull_request in &dev.pull_requests {
            let mut block = String::new();
            pull_request_block(&mut block, pull_request);
            for line in block.lines() {
                let _ = writeln!(out, "  {}", line);
            }
        }
    }
    out.trim_end().to_string()
}
