mod catalog;
mod config;
mod db;
mod display;
mod error;
mod models;
mod notify;
mod progress;
mod recommend;
mod service;
mod tui;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use catalog::Catalog;
use config::Config;
use db::Database;
use display::{format_date, progress_bar, truncate};
use error::Error;
use models::{JsonOutput, SectionContent, SessionStatus};
use notify::{Level, Notification, NotificationCenter};
use recommend::QuickActions;
use service::StudyService;

#[derive(Parser)]
#[command(name = "osce")]
#[command(about = "OSCE exam preparation: study sessions, progress and review recommendations")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// List topics with progress
    Topics,

    /// Show a topic's sessions, or a session's sections
    Show {
        /// Topic ID
        topic: String,

        /// Session ID
        session: Option<String>,
    },

    /// Show the next recommended session and sessions needing review
    Next,

    /// List sessions that need review
    Review {
        /// Maximum number of sessions (defaults to config review_limit)
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// Start a session, opening a new attempt
    Start {
        /// Topic ID
        topic: String,

        /// Session ID
        session: String,
    },

    /// Answer a quiz or case study question in an open attempt
    Answer {
        /// Attempt ID
        attempt: i64,

        /// Section ID
        section: String,

        /// Question number, starting at 0
        question: usize,

        /// Chosen option, starting at 0
        choice: usize,
    },

    /// Finish an attempt and record the outcome
    Finish {
        /// Attempt ID
        attempt: i64,
    },

    /// Set a session's status directly
    Mark {
        /// Topic ID
        topic: String,

        /// Session ID
        session: String,

        /// Status: not-started/in-progress/completed/needs-work
        status: String,
    },

    /// List past attempts
    History {
        /// Filter by topic
        #[arg(long, short)]
        topic: Option<String>,
    },

    /// Show study statistics
    Stats,

    /// Launch interactive terminal UI
    Tui,
}

fn init_logging(verbose: bool, tui: bool) {
    let default = if verbose {
        "debug"
    } else if tui {
        // Log lines would draw over the alternate screen
        "off"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, matches!(cli.command, Commands::Tui));

    let json = cli.json;
    if let Err(e) = run(cli) {
        if json {
            if let Ok(out) = serde_json::to_string(&JsonOutput::<()>::err(e.to_string())) {
                println!("{}", out);
            }
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config::config_path();
    let config = Config::load(&config_path)?;
    let catalog = Catalog::load(config.catalog_path.as_deref())?;

    let db_path = config.database_path();
    debug!(path = %db_path.display(), "opening database");
    let db = Database::open(&db_path)?;
    db.init()?;

    let service = StudyService::new(&catalog, &db, config.pass_mark);
    let mut notifications = NotificationCenter::new(config.notification_ttl());

    match cli.command {
        Commands::Init => {
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Database initialized at: {}", db_path.display());
            }
        }

        Commands::Topics => {
            let summaries = service.topic_summaries()?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&summaries))?);
            } else if summaries.is_empty() {
                println!("No topics found.");
            } else {
                println!("{:<24} {:<32} {:>5} {:>5} {:>7}", "ID", "TITLE", "DONE", "WORK", "SESSIONS");
                println!("{}", "-".repeat(78));
                for s in summaries {
                    println!(
                        "{:<24} {:<32} {:>5} {:>5} {:>7}  {}",
                        truncate(&s.topic_id, 22),
                        truncate(&s.title, 30),
                        s.completed,
                        s.needs_work,
                        s.total_sessions,
                        progress_bar(s.percent_complete(), 10)
                    );
                }
            }
        }

        Commands::Show { topic, session } => {
            let Some(t) = catalog.topic(&topic) else {
                return Err(Error::UnknownTopic(topic).into());
            };

            match session {
                None => {
                    let sessions = service.topic_sessions(&t.id)?;
                    if cli.json {
                        println!("{}", serde_json::to_string(&JsonOutput::ok(&sessions))?);
                    } else {
                        println!("Topic: {} ({})", t.title, t.id);
                        if let Some(desc) = &t.description {
                            println!("Description: {}", desc);
                        }
                        println!();
                        println!("{:<24} {:<36} {:>6} STATUS", "SESSION", "TITLE", "MINS");
                        println!("{}", "-".repeat(80));
                        for entry in &sessions {
                            println!(
                                "{:<24} {:<36} {:>6} {}",
                                truncate(&entry.session_id, 22),
                                truncate(&entry.session_title, 34),
                                entry.duration_minutes,
                                entry.status.label()
                            );
                        }
                    }
                }
                Some(session_id) => {
                    let r = service.resolve(&topic, &session_id)?;
                    let status = service.session_status(r.topic_id(), r.session_id())?;
                    if cli.json {
                        println!("{}", serde_json::to_string(&JsonOutput::ok(r.session))?);
                    } else {
                        println!("Session: {} ({}/{})", r.session.title, t.id, r.session.id);
                        println!("Status: {}", status.label());
                        println!("Estimated time: {} min", r.session.duration_minutes());
                        for section in &r.session.sections {
                            println!();
                            println!(
                                "--- [{}] {} ({}, {} min) ---",
                                section.id,
                                section.title,
                                section.content.kind().label(),
                                section.duration_minutes
                            );
                            print_section(&section.content);
                        }
                    }
                }
            }
        }

        Commands::Next => {
            let actions = service.quick_actions(config.review_limit)?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&actions))?);
            } else {
                print_quick_actions(&actions);
            }
        }

        Commands::Review { limit } => {
            let limit = limit.unwrap_or(config.review_limit);
            let review = service.quick_actions(limit)?.needs_review;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&review))?);
            } else if review.is_empty() {
                println!("Nothing needs review.");
            } else {
                println!("=== Sessions Needing Review ===");
                for (i, entry) in review.iter().enumerate() {
                    println!(
                        "{}. {} / {} ({}/{})",
                        i + 1,
                        entry.topic_title,
                        entry.session_title,
                        entry.topic_id,
                        entry.session_id
                    );
                }
            }
        }

        Commands::Start { topic, session } => {
            let attempt_id = service.start_session(&topic, &session, &mut notifications)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(with_notifications(
                        serde_json::json!({
                            "attempt_id": attempt_id,
                            "topic_id": topic,
                            "session_id": session
                        }),
                        &mut notifications
                    )))?
                );
            } else {
                print_notifications(&mut notifications);
                println!();
                println!("Answer questions with:");
                println!("  osce answer {} <section> <question> <choice>", attempt_id);
                println!("Finish with:");
                println!("  osce finish {}", attempt_id);
            }
        }

        Commands::Answer {
            attempt,
            section,
            question,
            choice,
        } => {
            let result = service.answer(attempt, &section, question, choice)?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&result))?);
            } else {
                if result.correct {
                    println!("Correct.");
                } else {
                    println!("Incorrect. The answer was option {}.", result.correct_option);
                }
                if let Some(explanation) = &result.explanation {
                    println!("{}", explanation);
                }
            }
        }

        Commands::Finish { attempt } => {
            let result = service.finish(attempt, &mut notifications)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(with_notifications(
                        &result,
                        &mut notifications
                    )))?
                );
            } else {
                print_notifications(&mut notifications);
                println!(
                    "Answered {} of {} question(s), {} correct. Status: {}",
                    result.attempt.answered,
                    result.questions,
                    result.attempt.correct,
                    result.status.label()
                );
            }
        }

        Commands::Mark {
            topic,
            session,
            status,
        } => {
            let status = SessionStatus::from_str(&status).ok_or(Error::InvalidStatus(status))?;
            service.set_status(&topic, &session, status, &mut notifications)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(with_notifications(
                        serde_json::json!({
                            "topic_id": topic,
                            "session_id": session,
                            "status": status
                        }),
                        &mut notifications
                    )))?
                );
            } else {
                print_notifications(&mut notifications);
            }
        }

        Commands::History { topic } => {
            if let Some(topic_id) = &topic {
                if catalog.topic(topic_id).is_none() {
                    return Err(Error::UnknownTopic(topic_id.clone()).into());
                }
            }
            let attempts = db.list_attempts(topic.as_deref())?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&attempts))?);
            } else if attempts.is_empty() {
                println!("No attempts yet.");
            } else {
                println!("{:<5} {:<12} {:<36} {:>7} STATE", "ID", "DATE", "SESSION", "SCORE");
                println!("{}", "-".repeat(72));
                for a in attempts {
                    let session = catalog.session(&a.topic_id, &a.session_id);
                    let title = session
                        .map(|r| r.session.title.as_str())
                        .unwrap_or(a.session_id.as_str());
                    let questions = session.map(|r| r.session.question_count()).unwrap_or(0);
                    let score = a
                        .score(questions)
                        .map(|s| format!("{:.0}%", s * 100.0))
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<5} {:<12} {:<36} {:>7} {}",
                        a.id,
                        format_date(&a.started_at),
                        truncate(title, 34),
                        score,
                        if a.is_open() { "open" } else { "finished" }
                    );
                }
            }
        }

        Commands::Stats => {
            let stats = db.get_stats()?;
            let total_sessions = catalog.session_count();
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "total_sessions": total_sessions,
                        "completed": stats.completed,
                        "in_progress": stats.in_progress,
                        "needs_work": stats.needs_work,
                        "attempts": stats.attempts,
                        "answers": stats.answers,
                        "accuracy": stats.accuracy
                    })))?
                );
            } else {
                println!("=== Study Statistics ===");
                println!("Sessions in catalog: {}", total_sessions);
                println!("Completed: {}", stats.completed);
                println!("In progress: {}", stats.in_progress);
                println!("Needs work: {}", stats.needs_work);
                println!("Attempts: {}", stats.attempts);
                println!("Answer accuracy: {:.0}% ({} answers)", stats.accuracy, stats.answers);
            }
        }

        Commands::Tui => {
            tui::run(&catalog, &db, &config)?;
        }
    }

    Ok(())
}

fn print_quick_actions(actions: &QuickActions) {
    println!("=== Next Recommended ===");
    match &actions.next {
        Some(entry) => {
            println!("{} / {}", entry.topic_title, entry.session_title);
            println!("About {} min", entry.duration_minutes);
            println!("  osce start {} {}", entry.topic_id, entry.session_id);
        }
        None => println!("Every session has been started. Nice work!"),
    }

    println!();
    println!("=== Needs Review ===");
    if actions.needs_review.is_empty() {
        println!("Nothing needs review.");
    }
    for entry in &actions.needs_review {
        println!(
            "- {} / {} ({}/{})",
            entry.topic_title, entry.session_title, entry.topic_id, entry.session_id
        );
    }
}

fn print_section(content: &SectionContent) {
    match content {
        SectionContent::Content { body } => println!("{}", body),
        SectionContent::Video { url, transcript } => {
            println!("Watch: {}", url);
            if let Some(transcript) = transcript {
                println!("{}", transcript);
            }
        }
        SectionContent::CaseStudy {
            scenario,
            questions,
        } => {
            println!("{}", scenario);
            print_questions(questions);
        }
        SectionContent::Quiz { questions } => print_questions(questions),
    }
}

fn print_questions(questions: &[models::Question]) {
    for (i, q) in questions.iter().enumerate() {
        println!("Q{}. {}", i, q.prompt);
        for (j, option) in q.options.iter().enumerate() {
            println!("    {}) {}", j, option);
        }
    }
}

/// Command output plus whatever the action reported, for `--json`.
#[derive(Debug, Serialize)]
struct WithNotifications<T: Serialize> {
    #[serde(flatten)]
    data: T,
    notifications: Vec<Notification>,
}

fn with_notifications<T: Serialize>(
    data: T,
    center: &mut NotificationCenter,
) -> WithNotifications<T> {
    WithNotifications {
        data,
        notifications: center.drain(),
    }
}

fn print_notifications(center: &mut NotificationCenter) {
    for n in center.drain() {
        match n.level {
            Level::Error | Level::Warning => println!("! {}", n.message),
            Level::Info | Level::Success => println!("{}", n.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    mod json_output_tests {
        use super::*;
        use std::time::Instant;

        #[test]
        fn notifications_are_drained_into_output() {
            let mut center = NotificationCenter::default();
            center.push(Level::Success, "Completed 'Consent'", Instant::now());

            let out = with_notifications(serde_json::json!({"attempt_id": 4}), &mut center);
            let value = serde_json::to_value(JsonOutput::ok(out)).unwrap();

            assert_eq!(value["data"]["attempt_id"], 4);
            assert_eq!(value["data"]["notifications"][0]["message"], "Completed 'Consent'");
            assert!(center.is_empty());
        }

        #[test]
        fn struct_data_is_flattened() {
            #[derive(Serialize)]
            struct Outcome {
                status: SessionStatus,
            }

            let mut center = NotificationCenter::default();
            let out = with_notifications(
                Outcome {
                    status: SessionStatus::NeedsWork,
                },
                &mut center,
            );
            let value = serde_json::to_value(&out).unwrap();
            assert_eq!(value["status"], "needs_work");
            assert_eq!(value["notifications"].as_array().unwrap().len(), 0);
        }
    }

    mod cli_parsing_tests {
        use super::*;

        #[test]
        fn parse_init_command() {
            let cli = Cli::try_parse_from(["osce", "init"]).unwrap();
            assert!(!cli.json);
            assert!(matches!(cli.command, Commands::Init));
        }

        #[test]
        fn parse_json_flag_global() {
            let cli1 = Cli::try_parse_from(["osce", "--json", "next"]).unwrap();
            assert!(cli1.json);

            let cli2 = Cli::try_parse_from(["osce", "next", "--json"]).unwrap();
            assert!(cli2.json);
        }

        #[test]
        fn parse_verbose_short() {
            let cli = Cli::try_parse_from(["osce", "-v", "stats"]).unwrap();
            assert!(cli.verbose);
        }

        #[test]
        fn parse_show_topic_only() {
            let cli = Cli::try_parse_from(["osce", "show", "history-taking"]).unwrap();
            match cli.command {
                Commands::Show { topic, session } => {
                    assert_eq!(topic, "history-taking");
                    assert!(session.is_none());
                }
                _ => panic!("Expected Show command"),
            }
        }

        #[test]
        fn parse_show_session() {
            let cli = Cli::try_parse_from(["osce", "show", "history-taking", "chest-pain"]).unwrap();
            match cli.command {
                Commands::Show { session, .. } => {
                    assert_eq!(session, Some("chest-pain".to_string()));
                }
                _ => panic!("Expected Show command"),
            }
        }

        #[test]
        fn parse_review_with_limit() {
            let cli = Cli::try_parse_from(["osce", "review", "-l", "5"]).unwrap();
            match cli.command {
                Commands::Review { limit } => assert_eq!(limit, Some(5)),
                _ => panic!("Expected Review command"),
            }
        }

        #[test]
        fn parse_review_default_limit() {
            let cli = Cli::try_parse_from(["osce", "review"]).unwrap();
            assert!(matches!(cli.command, Commands::Review { limit: None }));
        }

        #[test]
        fn parse_start() {
            let cli = Cli::try_parse_from(["osce", "start", "procedures", "ecg"]).unwrap();
            match cli.command {
                Commands::Start { topic, session } => {
                    assert_eq!(topic, "procedures");
                    assert_eq!(session, "ecg");
                }
                _ => panic!("Expected Start command"),
            }
        }

        #[test]
        fn parse_answer() {
            let cli = Cli::try_parse_from(["osce", "answer", "3", "murmurs", "1", "2"]).unwrap();
            match cli.command {
                Commands::Answer {
                    attempt,
                    section,
                    question,
                    choice,
                } => {
                    assert_eq!(attempt, 3);
                    assert_eq!(section, "murmurs");
                    assert_eq!(question, 1);
                    assert_eq!(choice, 2);
                }
                _ => panic!("Expected Answer command"),
            }
        }

        #[test]
        fn parse_mark() {
            let cli =
                Cli::try_parse_from(["osce", "mark", "communication", "consent", "needs-work"])
                    .unwrap();
            match cli.command {
                Commands::Mark { status, .. } => assert_eq!(status, "needs-work"),
                _ => panic!("Expected Mark command"),
            }
        }

        #[test]
        fn parse_history_with_topic() {
            let cli = Cli::try_parse_from(["osce", "history", "--topic", "procedures"]).unwrap();
            match cli.command {
                Commands::History { topic } => assert_eq!(topic, Some("procedures".to_string())),
                _ => panic!("Expected History command"),
            }
        }

        #[test]
        fn parse_invalid_command_fails() {
            assert!(Cli::try_parse_from(["osce", "invalid"]).is_err());
        }

        #[test]
        fn parse_missing_required_arg_fails() {
            assert!(Cli::try_parse_from(["osce", "start", "procedures"]).is_err());
            assert!(Cli::try_parse_from(["osce", "answer", "1", "quiz"]).is_err());
            assert!(Cli::try_parse_from(["osce", "finish"]).is_err());
            assert!(Cli::try_parse_from(["osce", "answer", "x", "quiz", "0", "0"]).is_err());
        }
    }
}
