//! Plain-terminal rendering of issues for `ls` and `show`.

use colored::{ColoredString, Colorize};
use regex::Regex;
use std::sync::OnceLock;

use crate::jira::model::Issue;

/// Shorten `text` to at most `max` characters, ending in `...` when cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut short: String = text.chars().take(keep).collect();
    short.push_str("...");
    short
}

/// Issue key colored by issue type.
pub fn colored_key(key: &str, issue_type: &str) -> ColoredString {
    let kind = issue_type
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_lowercase();
    let key = key.bold();
    match kind.as_str() {
        "story" => key.green(),
        "sub-task" | "subtask" => key.blue(),
        "bug" => key.red(),
        _ => key,
    }
}

/// `PARENT / KEY`, or just `KEY`.
pub fn issue_id(issue: &Issue) -> String {
    let own = colored_key(&issue.key, &issue.issue_type);
    match &issue.parent {
        Some(parent) => format!(
            "{} / {}",
            colored_key(&parent.key, &parent.issue_type),
            own
        ),
        None => own.to_string(),
    }
}

/// One-line summary: id, status, sub-task count, summary.
pub fn summary_line(issue: &Issue) -> String {
    let mut line = format!("{} {}", issue_id(issue), issue.status.name.dimmed());
    if !issue.subtasks.is_empty() {
        line.push_str(&format!(
            " {}",
            format!("subtasks[{}]", issue.subtasks.len()).dimmed()
        ));
    }
    line.push(' ');
    line.push_str(&issue.summary);
    line
}

fn tag_pattern() -> &'static Regex {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"))
}

fn break_pattern() -> &'static Regex {
    static BREAKS: OnceLock<Regex> = OnceLock::new();
    BREAKS.get_or_init(|| {
        Regex::new(r"(?i)<br\s*/?>|</p>|</div>|</li>|</h[1-6]>|</tr>").expect("valid break regex")
    })
}

fn list_item_pattern() -> &'static Regex {
    static ITEMS: OnceLock<Regex> = OnceLock::new();
    ITEMS.get_or_init(|| Regex::new(r"(?i)<li(?:\s[^>]*)?>").expect("valid list item regex"))
}

fn blank_lines_pattern() -> &'static Regex {
    static BLANKS: OnceLock<Regex> = OnceLock::new();
    BLANKS.get_or_init(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("valid blank-line regex"))
}

/// Convert a rendered (HTML) description to readable plain text.
pub fn html_to_text(html: &str) -> String {
    let text = html.replace("\r\n", "\n");
    let text = break_pattern().replace_all(&text, "$0\n");
    let text = list_item_pattern().replace_all(&text, "• ");
    let text = tag_pattern().replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    let text = blank_lines_pattern().replace_all(&text, "\n\n");
    text.trim().to_string()
}
