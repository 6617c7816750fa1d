use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::display::{progress_bar, truncate};
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .topics
        .items
        .iter()
        .map(|summary| {
            let percent = summary.percent_complete();
            let flag = if summary.needs_work > 0 {
                Span::styled(
                    format!("{} to review", summary.needs_work),
                    Style::default().fg(Color::Yellow),
                )
            } else {
                Span::raw("")
            };

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<30}", truncate(&summary.title, 28)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(progress_bar(percent, 10), Style::default().fg(Color::Green)),
                Span::styled(
                    format!(" {:>2}/{:<2}   ", summary.completed, summary.total_sessions),
                    Style::default().fg(Color::Cyan),
                ),
                flag,
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Topics ")
        .title_style(Style::default().fg(Color::Cyan));

    let header_style = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::BOLD);
    let header = Line::from(vec![
        Span::styled(format!("{:<30}", "Topic"), header_style),
        Span::styled(format!("{:<17}", "Progress"), header_style),
        Span::styled("Review", header_style),
    ]);

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.topics.selected);

    let header_area = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2).min(1),
    };
    f.render_widget(Paragraph::new(header), header_area);

    let list_area = Rect {
        x: area.x,
        y: area.y + 1,
        width: area.width,
        height: area.height.saturating_sub(1),
    };

    f.render_stateful_widget(list, list_area, &mut state);
}
