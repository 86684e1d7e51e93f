//! Issue snapshots and selection reconciliation.
//!
//! A snapshot is the complete result of one successful poll. The dashboard
//! swaps snapshots wholesale; nothing edits one in place.

use chrono::{DateTime, FixedOffset};
use std::cmp::Reverse;
use std::collections::HashMap;

use crate::jira::Issue;

/// One row of the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueRecord {
    pub key: String,
    pub status: String,
    /// Status category key (`new`, `indeterminate`, `done`).
    pub status_category: String,
    pub summary: String,
    pub assignee: Option<String>,
    pub updated: Option<DateTime<FixedOffset>>,
    pub issue_type: String,
    pub priority: String,
    pub parent: Option<String>,
    /// Number of sub-tasks.
    pub subtasks: usize,
}

impl IssueRecord {
    /// Minimal record, mostly for tests and fakes.
    #[allow(dead_code)]
    pub fn new(key: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            status: status.into(),
            status_category: String::new(),
            summary: String::new(),
            assignee: None,
            updated: None,
            issue_type: String::new(),
            priority: String::new(),
            parent: None,
            subtasks: 0,
        }
    }

    #[cfg(test)]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }
}

impl From<Issue> for IssueRecord {
    fn from(issue: Issue) -> Self {
        Self {
            key: issue.key,
            status: issue.status.name,
            status_category: issue.status.category,
            summary: issue.summary,
            assignee: issue.assignee.map(|a| a.name),
            updated: issue.updated,
            issue_type: issue.issue_type,
            priority: issue.priority,
            parent: issue.parent.map(|p| p.key),
            subtasks: issue.subtasks.len(),
        }
    }
}

/// Ordered, key-unique set of issues from a single poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueSnapshot {
    records: Vec<IssueRecord>,
    index: HashMap<String, usize>,
}

impl IssueSnapshot {
    /// Build a snapshot. Later duplicates of a key are dropped.
    pub fn new(records: Vec<IssueRecord>) -> Self {
        let mut kept = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());
        for record in records {
            if index.contains_key(&record.key) {
                continue;
            }
            index.insert(record.key.clone(), kept.len());
            kept.push(record);
        }
        Self {
            records: kept,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&IssueRecord> {
        self.position(key).map(|i| &self.records[i])
    }

    pub fn at(&self, position: usize) -> Option<&IssueRecord> {
        self.records.get(position)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IssueRecord> {
        self.records.iter()
    }

    /// What changed between `self` and the `next` snapshot.
    pub fn diff(&self, next: &IssueSnapshot) -> SnapshotDiff {
        let added = next
            .iter()
            .filter(|r| self.get(&r.key).is_none())
            .map(|r| r.key.clone())
            .collect();
        let removed = self
            .iter()
            .filter(|r| next.get(&r.key).is_none())
            .map(|r| r.key.clone())
            .collect();
        let status_changed = next
            .iter()
            .filter(|r| matches!(self.get(&r.key), Some(prev) if prev.status != r.status))
            .map(|r| r.key.clone())
            .collect();
        SnapshotDiff {
            added,
            removed,
            status_changed,
        }
    }
}

impl FromIterator<IssueRecord> for IssueSnapshot {
    fn from_iter<I: IntoIterator<Item = IssueRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Keys added, removed, or with a new status between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub status_changed: Vec<String>,
}

impl SnapshotDiff {
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.status_changed.is_empty()
    }

    /// Short human summary, e.g. "2 new, 1 removed".
    pub fn summary(&self) -> Option<String> {
        let parts: Vec<String> = [
            (self.added.len(), "new"),
            (self.removed.len(), "removed"),
            (self.status_changed.len(), "changed"),
        ]
        .iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| format!("{} {}", count, label))
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Where the selection lands in `next` after a poll.
///
/// A selected key that survives keeps its row. A key that vanished moves
/// the selection to the surviving issue closest to its old position in
/// `prev`; ties go to the later issue. With no survivor the old cursor
/// index is clamped to the new length.
pub fn reselect(
    prev: &IssueSnapshot,
    next: &IssueSnapshot,
    selected: Option<&str>,
    cursor: usize,
) -> Option<usize> {
    if next.is_empty() {
        return None;
    }

    if let Some(key) = selected {
        if let Some(position) = next.position(key) {
            return Some(position);
        }
        if let Some(origin) = prev.position(key) {
            let nearest = prev
                .iter()
                .enumerate()
                .filter(|(_, record)| next.position(&record.key).is_some())
                .min_by_key(|(i, _)| (i.abs_diff(origin), Reverse(*i)));
            if let Some((_, record)) = nearest {
                return next.position(&record.key);
            }
        }
    }

    Some(cursor.min(next.len() - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(entries: &[(&str, &str)]) -> IssueSnapshot {
        entries
            .iter()
            .map(|(key, status)| IssueRecord::new(*key, *status))
            .collect()
    }

    #[test]
    fn test_removed_selection_moves_to_nearest_prior_entry() {
        let prev = snapshot(&[("A", "To Do"), ("B", "In Progress")]);
        let next = snapshot(&[("A", "In Progress"), ("C", "To Do")]);

        let position = reselect(&prev, &next, Some("B"), 1);
        assert_eq!(position, Some(0));
        assert_eq!(next.at(0).map(|r| r.key.as_str()), Some("A"));
    }

    #[test]
    fn test_surviving_selection_follows_its_key() {
        let prev = snapshot(&[("A", "To Do"), ("B", "To Do"), ("C", "To Do")]);
        let next = snapshot(&[("X", "To Do"), ("C", "To Do"), ("A", "To Do")]);
        assert_eq!(reselect(&prev, &next, Some("A"), 0), Some(2));
    }

    #[test]
    fn test_tie_prefers_the_later_entry() {
        let prev = snapshot(&[("A", "s"), ("B", "s"), ("C", "s")]);
        let next = snapshot(&[("C", "s"), ("A", "s")]);
        // B was between A and C; C slid into its row.
        assert_eq!(reselect(&prev, &next, Some("B"), 1), Some(0));
    }

    #[test]
    fn test_nearest_uses_prior_distance_not_new_order() {
        let prev = snapshot(&[("A", "s"), ("B", "s"), ("C", "s"), ("D", "s"), ("E", "s")]);
        let next = snapshot(&[("E", "s"), ("A", "s")]);
        // D was selected at index 3; E (distance 1) beats A (distance 3).
        assert_eq!(reselect(&prev, &next, Some("D"), 3), Some(0));
    }

    #[test]
    fn test_no_survivors_clamps_cursor() {
        let prev = snapshot(&[("A", "s"), ("B", "s"), ("C", "s")]);
        let next = snapshot(&[("X", "s"), ("Y", "s")]);
        assert_eq!(reselect(&prev, &next, Some("C"), 2), Some(1));
    }

    #[test]
    fn test_empty_next_clears_selection() {
        let prev = snapshot(&[("A", "s")]);
        assert_eq!(reselect(&prev, &IssueSnapshot::default(), Some("A"), 0), None);
    }

    #[test]
    fn test_first_snapshot_selects_first_row() {
        let next = snapshot(&[("A", "s"), ("B", "s")]);
        assert_eq!(reselect(&IssueSnapshot::default(), &next, None, 0), Some(0));
    }

    #[test]
    fn test_duplicate_keys_keep_first() {
        let snap = snapshot(&[("A", "To Do"), ("A", "Done"), ("B", "To Do")]);
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.get("A").map(|r| r.status.as_str()), Some("To Do"));
        assert_eq!(snap.position("B"), Some(1));
    }

    #[test]
    fn test_diff_reports_changes() {
        let prev = snapshot(&[("A", "To Do"), ("B", "In Progress")]);
        let next = snapshot(&[("A", "In Progress"), ("C", "To Do")]);
        let diff = prev.diff(&next);

        assert_eq!(diff.added, vec!["C".to_string()]);
        assert_eq!(diff.removed, vec!["B".to_string()]);
        assert_eq!(diff.status_changed, vec!["A".to_string()]);
        assert_eq!(diff.summary().as_deref(), Some("1 new, 1 removed, 1 changed"));
    }

    #[test]
    fn test_identical_snapshots_have_no_diff() {
        let snap = snapshot(&[("A", "To Do")]);
        let diff = snap.diff(&snap.clone());
        assert!(diff.is_empty());
        assert_eq!(diff.summary(), None);
    }
}
