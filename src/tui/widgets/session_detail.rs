use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::status_color;
use crate::catalog::SessionRef;
use crate::display::truncate;
use crate::models::{Section, SectionContent};
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(r) = app.selected_session else {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Session Detail ");
        let paragraph = Paragraph::new("No session selected").block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Header
            Constraint::Min(0),    // Sections
        ])
        .split(area);

    draw_header(f, app, r, chunks[0]);
    draw_sections(f, r, chunks[1]);
}

fn draw_header(f: &mut Frame, app: &App, r: SessionRef<'_>, area: Rect) {
    let status = app.status_of(r.topic_id(), r.session_id());

    let attempt = match app.open_attempt_for(r) {
        Some(id) => Span::styled(format!("#{} open", id), Style::default().fg(Color::Cyan)),
        None => Span::styled("none", Style::default().fg(Color::DarkGray)),
    };

    let text = vec![
        Line::from(vec![
            Span::styled("Status: ", Style::default().fg(Color::Gray)),
            Span::styled(status.label(), Style::default().fg(status_color(status))),
            Span::raw("  "),
            Span::styled("Duration: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{} min", r.session.duration_minutes()),
                Style::default().fg(Color::White),
            ),
            Span::raw("  "),
            Span::styled("Questions: ", Style::default().fg(Color::Gray)),
            Span::styled(
                r.session.question_count().to_string(),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Attempt: ", Style::default().fg(Color::Gray)),
            attempt,
        ]),
        Line::from(Span::styled(
            r.session.description.as_deref().unwrap_or(""),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} / {} ", r.topic.title, r.session.title))
        .title_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_sections(f: &mut Frame, r: SessionRef<'_>, area: Rect) {
    let mut lines = Vec::new();
    for (i, section) in r.session.sections.iter().enumerate() {
        if i > 0 {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<11}", section.content.kind().label()),
                Style::default().fg(Color::Magenta),
            ),
            Span::styled(
                section.title.clone(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {} min", section.duration_minutes),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        lines.push(Line::from(Span::styled(
            preview(section),
            Style::default().fg(Color::Gray),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Sections ({}) ", r.session.sections.len()))
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn preview(section: &Section) -> String {
    match &section.content {
        SectionContent::Content { body } => truncate(body, 160),
        SectionContent::Quiz { questions } => format!("{} questions", questions.len()),
        SectionContent::CaseStudy {
            scenario,
            questions,
        } => format!("{} ({} questions)", truncate(scenario, 120), questions.len()),
        SectionContent::Video { url, .. } => url.clone(),
    }
}
