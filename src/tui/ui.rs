use std::time::Instant;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{dashboard, session_detail, topic_detail, topics};
use super::{App, View};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Help bar
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_help_bar(f, app, chunks[2]);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let tab_titles = vec!["Dashboard", "Topics"];
    let selected = match app.view {
        View::Dashboard => 0,
        View::Topics | View::TopicDetail | View::SessionDetail => 1,
    };

    let tabs = Tabs::new(tab_titles)
        .block(Block::default().borders(Borders::ALL).title(" OSCE Prep "))
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Dashboard => dashboard::draw(f, app, area),
        View::Topics => topics::draw(f, app, area),
        View::TopicDetail => topic_detail::draw(f, app, area),
        View::SessionDetail => session_detail::draw(f, app, area),
    }
}

fn key(k: &'static str) -> Span<'static> {
    Span::styled(k, Style::default().fg(Color::Cyan))
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    // Newest unread notification takes over the bar until it expires
    if let Some(latest) = app
        .notifications
        .active(Instant::now())
        .filter(|n| !n.read)
        .last()
    {
        let line = Line::from(vec![
            Span::styled(
                format!(" {} ", latest.level.as_str()),
                Style::default()
                    .fg(Color::Black)
                    .bg(dashboard::level_color(latest.level)),
            ),
            Span::raw(" "),
            Span::raw(latest.message.clone()),
            Span::raw("  "),
            key("x"),
            Span::raw(" Dismiss"),
        ]);
        f.render_widget(
            Paragraph::new(line).style(Style::default().bg(Color::DarkGray)),
            area,
        );
        return;
    }

    let mut spans = vec![key("Tab"), Span::raw(" Views  ")];

    match app.view {
        View::Dashboard => {
            spans.extend(vec![
                key("n/<CR>"),
                Span::raw(" Open next  "),
                key("^r"),
                Span::raw(" Refresh  "),
            ]);
        }
        View::Topics => {
            spans.extend(vec![
                key("j/k"),
                Span::raw(" Nav  "),
                key("g/G"),
                Span::raw(" Top/Bot  "),
                key("l/<CR>"),
                Span::raw(" Open  "),
            ]);
        }
        View::TopicDetail => {
            spans.extend(vec![
                key("j/k"),
                Span::raw(" Nav  "),
                key("l/<CR>"),
                Span::raw(" Open  "),
                key("h/<Esc>"),
                Span::raw(" Back  "),
            ]);
        }
        View::SessionDetail => {
            spans.extend(vec![
                key("s"),
                Span::raw(" Start  "),
                key("f"),
                Span::raw(" Finish  "),
                key("c"),
                Span::raw(" Completed  "),
                key("w"),
                Span::raw(" Needs work  "),
                key("h/<Esc>"),
                Span::raw(" Back  "),
            ]);
        }
    }

    spans.extend(vec![key("q"), Span::raw(" Quit")]);

    let help = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    f.render_widget(help, area);
}
