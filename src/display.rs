//! Text helpers shared by the CLI output and the terminal UI.

use chrono::DateTime;

pub fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

pub fn format_date(date_str: &str) -> String {
    match DateTime::parse_from_rfc3339(date_str) {
        Ok(dt) => dt.format("%Y-%m-%d").to_string(),
        Err(_) => date_str.chars().take(10).collect(),
    }
}

pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod truncate_tests {
        use super::*;

        #[test]
        fn truncate_short_string() {
            assert_eq!(truncate("hello", 10), "hello");
        }

        #[test]
        fn truncate_exact_length() {
            assert_eq!(truncate("hello", 5), "hello");
        }

        #[test]
        fn truncate_long_string() {
            assert_eq!(truncate("hello world", 8), "hello...");
        }

        #[test]
        fn truncate_multibyte() {
            assert_eq!(truncate("Schädel-Hirn-Trauma", 8), "Schäd...");
            assert_eq!(truncate("Überweisung zum Kardiologen", 10), "Überwei...");
        }
    }

    mod format_tests {
        use super::*;

        #[test]
        fn progress_bar_widths() {
            assert_eq!(progress_bar(0.0, 4), "░░░░");
            assert_eq!(progress_bar(50.0, 4), "██░░");
            assert_eq!(progress_bar(100.0, 4), "████");
        }

        #[test]
        fn progress_bar_clamps_out_of_range() {
            assert_eq!(progress_bar(250.0, 4), "████");
            assert_eq!(progress_bar(-10.0, 4), "░░░░");
        }

        #[test]
        fn format_date_rfc3339() {
            assert_eq!(format_date("2026-03-14T09:30:00+00:00"), "2026-03-14");
        }

        #[test]
        fn format_date_falls_back_to_prefix() {
            assert_eq!(format_date("2026-03-14 09:30:00"), "2026-03-14");
        }
    }
}
