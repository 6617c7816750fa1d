pub mod dashboard;
pub mod session_detail;
pub mod topic_detail;
pub mod topics;

use ratatui::style::Color;

use crate::models::SessionStatus;

pub fn status_color(status: SessionStatus) -> Color {
    match status {
        SessionStatus::NotStarted => Color::DarkGray,
        SessionStatus::InProgress => Color::Cyan,
        SessionStatus::Completed => Color::Green,
        SessionStatus::NeedsWork => Color::Yellow,
    }
}

pub fn status_marker(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::NotStarted => "○",
        SessionStatus::InProgress => "◐",
        SessionStatus::Completed => "●",
        SessionStatus::NeedsWork => "!",
    }
}
