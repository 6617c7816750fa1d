use std::time::Instant;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use super::status_color;
use crate::display::truncate;
use crate::notify::Level;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9), // Quick actions + stats row
            Constraint::Min(0),    // Notifications
        ])
        .split(area);

    let top_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[0]);

    draw_quick_actions(f, app, top_chunks[0]);
    draw_stats(f, app, top_chunks[1]);
    draw_notifications(f, app, chunks[1]);
}

fn draw_quick_actions(f: &mut Frame, app: &App, area: Rect) {
    let actions = &app.quick_actions;
    let mut lines = Vec::new();

    match &actions.next {
        Some(next) => lines.push(Line::from(vec![
            Span::styled("Next: ", Style::default().fg(Color::Gray)),
            Span::styled(
                truncate(&next.session_title, 28),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" ({}, {} min)", next.topic_title, next.duration_minutes),
                Style::default().fg(Color::DarkGray),
            ),
        ])),
        None => lines.push(Line::from(Span::styled(
            "Every session has been started",
            Style::default().fg(Color::Green),
        ))),
    }

    lines.push(Line::from(""));

    if actions.needs_review.is_empty() {
        lines.push(Line::from(Span::styled(
            "Nothing needs review",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Needs review:",
            Style::default().fg(Color::Gray),
        )));
        for (i, entry) in actions.needs_review.iter().enumerate() {
            lines.push(Line::from(vec![
                Span::styled(format!("{}. ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(
                    truncate(&entry.session_title, 28),
                    Style::default().fg(status_color(entry.status)),
                ),
                Span::styled(
                    format!(" ({})", entry.topic_title),
                    Style::default().fg(Color::DarkGray),
                ),
            ]));
        }
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Quick Actions ")
        .title_style(Style::default().fg(Color::Yellow));

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_stats(f: &mut Frame, app: &App, area: Rect) {
    let stats = &app.stats;
    let total = app.catalog().session_count();

    let row = |label: &'static str, value: String, color: Color| {
        Line::from(vec![
            Span::styled(label, Style::default().fg(Color::Gray)),
            Span::styled(value, Style::default().fg(color)),
        ])
    };

    let text = vec![
        row(
            "Completed: ",
            format!("{}/{}", stats.completed, total),
            Color::Green,
        ),
        row("In progress: ", stats.in_progress.to_string(), Color::Cyan),
        row(
            "Needs work: ",
            stats.needs_work.to_string(),
            if stats.needs_work > 0 {
                Color::Yellow
            } else {
                Color::White
            },
        ),
        row("Attempts: ", stats.attempts.to_string(), Color::White),
        row(
            "Accuracy: ",
            if stats.answers > 0 {
                format!("{:.0}%", stats.accuracy)
            } else {
                "-".to_string()
            },
            Color::Magenta,
        ),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Stats ")
        .title_style(Style::default().fg(Color::Cyan));

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_notifications(f: &mut Frame, app: &App, area: Rect) {
    let now = Instant::now();
    let items: Vec<ListItem> = app
        .notifications
        .active(now)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .map(|n| {
            let color = level_color(n.level);
            let style = if n.read {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<8}", n.level.as_str()), Style::default().fg(color)),
                Span::styled(n.message.clone(), style),
            ]))
        })
        .collect();

    let unread = app.notifications.unread_count();
    let title = if unread > 0 {
        format!(" Notifications ({} new) ", unread)
    } else {
        " Notifications ".to_string()
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Magenta));

    f.render_widget(List::new(items).block(block), area);
}

pub fn level_color(level: Level) -> Color {
    match level {
        Level::Info => Color::Cyan,
        Level::Success => Color::Green,
        Level::Warning => Color::Yellow,
        Level::Error => Color::Red,
    }
}
