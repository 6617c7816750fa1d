use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::{status_color, status_marker};
use crate::display::truncate;
use crate::models::Topic;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(topic) = app.selected_topic else {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Topic Detail ");
        let paragraph = Paragraph::new("No topic selected").block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Header
            Constraint::Min(0),    // Sessions
        ])
        .split(area);

    draw_header(f, topic, chunks[0]);
    draw_sessions(f, app, topic, chunks[1]);
}

fn draw_header(f: &mut Frame, topic: &Topic, area: Rect) {
    let description = topic.description.as_deref().unwrap_or("No description");

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", topic.title))
        .title_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let paragraph = Paragraph::new(Span::styled(description, Style::default().fg(Color::White)))
        .block(block)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn draw_sessions(f: &mut Frame, app: &App, topic: &Topic, area: Rect) {
    let items: Vec<ListItem> = topic
        .sessions
        .iter()
        .map(|session| {
            let status = app.status_of(&topic.id, &session.id);
            let color = status_color(status);

            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", status_marker(status)), Style::default().fg(color)),
                Span::styled(
                    format!("{:<34}", truncate(&session.title, 32)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>3} min  ", session.duration_minutes()),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(status.label(), Style::default().fg(color)),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Sessions ({}) ", topic.sessions.len()))
        .title_style(Style::default().fg(Color::Cyan));

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.session_cursor.selected);

    f.render_stateful_widget(list, area, &mut state);
}
