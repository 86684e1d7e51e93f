//! UI rendering for the TUI dashboard.

use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use super::app::{App, MessageType, RowChange};
use super::details::DetailState;
use super::snapshot::IssueRecord;

/// Table header plus borders.
const TABLE_CHROME_ROWS: u16 = 3;

/// Draw the entire UI.
pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(5),    // Issue table
            Constraint::Length(4), // Footer
        ])
        .split(frame.area());

    draw_header(frame, chunks[0], app);

    if app.show_detail {
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);
        draw_issue_table(frame, body[0], app);
        draw_detail(frame, body[1], app);
    } else {
        draw_issue_table(frame, chunks[1], app);
    }

    draw_footer(frame, chunks[2], app);

    if app.show_help {
        draw_help_overlay(frame);
    }
}

/// Draw the header with title, query and last update time.
fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let updated = match app.last_success {
        Some(at) => format!("Updated {} ", at.format("%H:%M:%S")),
        None => "Loading... ".to_string(),
    };

    let title = Line::from(vec![
        Span::styled(
            " Jira Dashboard ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {} ", app.source),
            Style::default().fg(Color::White),
        ),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(title)
        .title_bottom(
            Line::from(Span::styled(updated, Style::default().fg(Color::DarkGray))).right_aligned(),
        );

    frame.render_widget(block, area);
}

fn status_color(record: &IssueRecord) -> Color {
    match record.status_category.as_str() {
        "new" => Color::Gray,
        "indeterminate" => Color::Blue,
        "done" => Color::Green,
        _ => Color::White,
    }
}

fn type_color(issue_type: &str) -> Color {
    let kind = issue_type
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_lowercase();
    match kind.as_str() {
        "story" => Color::Green,
        "sub-task" | "subtask" => Color::Blue,
        "bug" => Color::Red,
        _ => Color::White,
    }
}

/// Summary, prefixed with the sub-task count when there are any.
fn summary_cell(issue: &IssueRecord) -> Line<'static> {
    let summary = Span::raw(issue.summary.clone());
    if issue.subtasks == 0 {
        return Line::from(summary);
    }
    Line::from(vec![
        Span::styled(
            format!("subtasks[{}] ", issue.subtasks),
            Style::default().fg(Color::DarkGray),
        ),
        summary,
    ])
}

/// Draw the issue table.
fn draw_issue_table(frame: &mut Frame, area: Rect, app: &mut App) {
    app.view.page_size = area.height.saturating_sub(TABLE_CHROME_ROWS) as usize;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" Issues ({}) ", app.snapshot.len()),
            Style::default().fg(Color::White),
        ));

    if app.snapshot.is_empty() {
        let text = if app.has_loaded() {
            "No issues match the query."
        } else {
            "Loading issues..."
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(
            format!(" {}", text),
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let header_cells = ["", "Key", "Type", "Status", "Assignee", "Updated", "Summary"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .snapshot
        .iter()
        .map(|issue| {
            let (marker, marker_color) = match app.changes.get(&issue.key) {
                Some(RowChange::Added) => ("+", Color::Green),
                Some(RowChange::StatusChanged) => ("~", Color::Yellow),
                None => (" ", Color::Reset),
            };

            let key = match &issue.parent {
                Some(parent) => format!("{} / {}", parent, issue.key),
                None => issue.key.clone(),
            };
            let assignee = issue.assignee.as_deref().unwrap_or("Unassigned");
            let updated = issue
                .updated
                .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());

            Row::new(vec![
                Cell::from(marker).style(Style::default().fg(marker_color)),
                Cell::from(key).style(
                    Style::default()
                        .fg(type_color(&issue.issue_type))
                        .add_modifier(Modifier::BOLD),
                ),
                Cell::from(issue.issue_type.clone()).style(Style::default().fg(Color::DarkGray)),
                Cell::from(issue.status.clone()).style(Style::default().fg(status_color(issue))),
                Cell::from(assignee.to_string()),
                Cell::from(updated).style(Style::default().fg(Color::DarkGray)),
                Cell::from(summary_cell(issue)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(1),  // Change marker
        Constraint::Length(18), // Key
        Constraint::Length(10), // Type
        Constraint::Length(14), // Status
        Constraint::Length(16), // Assignee
        Constraint::Length(16), // Updated
        Constraint::Min(20),    // Summary
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("▸");

    frame.render_stateful_widget(table, area, &mut app.view.table);
}

/// Draw the detail pane for the selected issue.
fn draw_detail(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " Issue details ",
            Style::default().fg(Color::White),
        ));

    let Some(issue) = app.selected_issue() else {
        frame.render_widget(Paragraph::new("").block(block), area);
        return;
    };

    let label = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::from(Span::styled(
            issue.key.clone(),
            Style::default()
                .fg(type_color(&issue.issue_type))
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(issue.summary.clone()),
        Line::from(""),
        Line::from(vec![
            Span::styled("Status:   ", label),
            Span::styled(issue.status.clone(), Style::default().fg(status_color(issue))),
        ]),
        Line::from(vec![
            Span::styled("Type:     ", label),
            Span::raw(issue.issue_type.clone()),
        ]),
        Line::from(vec![
            Span::styled("Priority: ", label),
            Span::raw(issue.priority.clone()),
        ]),
        Line::from(vec![
            Span::styled("Assignee: ", label),
            Span::styled(
                issue.assignee.clone().unwrap_or_else(|| "Unassigned".to_string()),
                Style::default().fg(Color::Blue),
            ),
        ]),
    ];
    if let Some(parent) = &issue.parent {
        lines.push(Line::from(vec![
            Span::styled("Parent:   ", label),
            Span::raw(parent.clone()),
        ]));
    }
    if let Some(updated) = issue.updated {
        lines.push(Line::from(vec![
            Span::styled("Updated:  ", label),
            Span::raw(
                updated
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string(),
            ),
        ]));
    }

    lines.push(Line::from(""));
    lines.extend(detail_lines(app.detail.as_ref()));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn section(title: &'static str) -> Line<'static> {
    Line::from(Span::styled(
        title,
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ))
}

/// Description, sub-tasks, comments and development info once loaded.
fn detail_lines(detail: Option<&DetailState>) -> Vec<Line<'static>> {
    let dim = Style::default().fg(Color::DarkGray);
    let details = match detail {
        None => return Vec::new(),
        Some(DetailState::Loading(_)) => {
            return vec![Line::from(Span::styled("Loading details...", dim))];
        }
        Some(DetailState::Failed { failure, .. }) => {
            return vec![Line::from(Span::styled(
                format!("Could not load details: {}", failure),
                Style::default().fg(Color::Red),
            ))];
        }
        Some(DetailState::Loaded(details)) => details,
    };

    let mut lines = Vec::new();
    if !details.description.is_empty() {
        lines.push(section("Description"));
        lines.extend(details.description.lines().map(|l| Line::from(l.to_string())));
        lines.push(Line::from(""));
    }

    if !details.subtasks.is_empty() {
        lines.push(section("Sub-Tasks"));
        for subtask in &details.subtasks {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{} ", subtask.key),
                    Style::default().fg(type_color(&subtask.issue_type)),
                ),
                Span::styled(
                    format!("{} ", subtask.status),
                    Style::default().fg(status_color(subtask)),
                ),
                Span::raw(subtask.summary.clone()),
            ]));
        }
        lines.push(Line::from(""));
    }

    if !details.comments.is_empty() {
        lines.push(section("Comments"));
        for comment in &details.comments {
            lines.push(Line::from(vec![
                Span::styled(comment.author.clone(), Style::default().fg(Color::Blue)),
                Span::styled(format!(" {}", comment.updated), dim),
            ]));
            lines.extend(comment.body.lines().map(|l| Line::from(format!("  {}", l))));
        }
        lines.push(Line::from(""));
    }

    if !details.development.is_empty() {
        lines.push(section("Development"));
        lines.extend(details.development.iter().map(|l| Line::from(l.clone())));
    }
    lines
}

/// Draw the footer with keybindings and the status line.
fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Length(2)])
        .split(area);

    let keybindings = Line::from(vec![
        Span::styled(" [↑/k]", Style::default().fg(Color::Yellow)),
        Span::raw(" Up  "),
        Span::styled("[↓/j]", Style::default().fg(Color::Yellow)),
        Span::raw(" Down  "),
        Span::styled("[Enter]", Style::default().fg(Color::Green)),
        Span::raw(" Details  "),
        Span::styled("[/]", Style::default().fg(Color::Green)),
        Span::raw(" Query  "),
        Span::styled("[?]", Style::default().fg(Color::Magenta)),
        Span::raw(" Help  "),
        Span::styled("[q]", Style::default().fg(Color::DarkGray)),
        Span::raw(" Quit"),
    ]);

    let keybindings_block = Block::default()
        .borders(Borders::TOP | Borders::LEFT | Borders::RIGHT)
        .border_style(Style::default().fg(Color::DarkGray));

    let keybindings_paragraph = Paragraph::new(keybindings).block(keybindings_block);
    frame.render_widget(keybindings_paragraph, chunks[0]);

    let message_block = Block::default()
        .borders(Borders::BOTTOM | Borders::LEFT | Borders::RIGHT)
        .border_style(Style::default().fg(Color::DarkGray));

    let message_paragraph = Paragraph::new(status_line(app)).block(message_block);
    frame.render_widget(message_paragraph, chunks[1]);
}

/// The JQL prompt, then a failed last poll, take precedence over transient
/// messages.
fn status_line(app: &App) -> Line<'static> {
    if let Some(input) = &app.query_input {
        return Line::from(vec![
            Span::styled(" JQL: ", Style::default().fg(Color::Yellow)),
            Span::raw(input.clone()),
            Span::styled("▏", Style::default().fg(Color::Yellow)),
        ]);
    }

    if let Some(failure) = &app.last_failure {
        let color = Color::Red;
        return Line::from(vec![
            Span::styled(" ✗ ", Style::default().fg(color)),
            Span::styled(
                format!(
                    "Last update failed at {}: {}",
                    failure.at.format("%H:%M:%S"),
                    failure.failure
                ),
                Style::default().fg(color),
            ),
        ]);
    }

    match &app.message {
        Some((text, msg_type, _)) => {
            let (symbol, color) = match msg_type {
                MessageType::Success => ("✓", Color::Green),
                MessageType::Error => ("✗", Color::Red),
            };
            Line::from(vec![
                Span::styled(format!(" {} ", symbol), Style::default().fg(color)),
                Span::styled(text.clone(), Style::default().fg(color)),
            ])
        }
        None => Line::from(""),
    }
}

/// Draw the help overlay.
fn draw_help_overlay(frame: &mut Frame) {
    let area = centered_rect(50, 60, frame.area());

    frame.render_widget(Clear, area);

    let key = |text: &'static str, color: Color, description: &'static str| {
        Line::from(vec![
            Span::styled(text, Style::default().fg(color)),
            Span::raw(description),
        ])
    };

    let help_text = vec![
        Line::from(""),
        Line::from(vec![Span::styled(
            "  Keyboard Shortcuts",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        key("  ↑/k      ", Color::Yellow, "Select previous issue"),
        key("  ↓/j      ", Color::Yellow, "Select next issue"),
        key("  PgUp/Dn  ", Color::Yellow, "Move one page"),
        key("  Home/End ", Color::Yellow, "Select first / last issue"),
        Line::from(""),
        key("  Enter/d  ", Color::Green, "Toggle issue details"),
        key("  /        ", Color::Green, "Edit the JQL query"),
        Line::from(""),
        key("  ?        ", Color::Magenta, "Toggle this help"),
        key("  q/Esc    ", Color::DarkGray, "Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "  + new   ~ status changed",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let help_block = Block::default()
        .title(Span::styled(
            " Help ",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .style(Style::default().bg(Color::Black));

    let help_paragraph = Paragraph::new(help_text).block(help_block);
    frame.render_widget(help_paragraph, area);
}

/// Create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
