use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::{Catalog, SessionRef};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Attempt, SessionStatus, TopicSummary};
use crate::notify::{Level, Notifier};
use crate::progress::ProgressStore;
use crate::recommend::{self, QuickActions, SessionEntry};

#[derive(Debug, Clone, Serialize)]
pub struct AnswerResult {
    pub correct: bool,
    pub correct_option: usize,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptResult {
    pub attempt: Attempt,
    pub questions: usize,
    pub score: Option<f64>,
    pub status: SessionStatus,
}

/// Writes study progress for sessions that exist in the catalog and reports
/// what happened through the given notifier.
pub struct StudyService<'a> {
    catalog: &'a Catalog,
    db: &'a Database,
    pass_mark: f64,
}

impl<'a> StudyService<'a> {
    pub fn new(catalog: &'a Catalog, db: &'a Database, pass_mark: f64) -> Self {
        Self {
            catalog,
            db,
            pass_mark,
        }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn resolve(&self, topic_id: &str, session_id: &str) -> Result<SessionRef<'a>> {
        let topic = self
            .catalog
            .topic(topic_id)
            .ok_or_else(|| Error::UnknownTopic(topic_id.to_string()))?;
        let session = topic.session(session_id).ok_or_else(|| Error::UnknownSession {
            topic_id: topic_id.to_string(),
            session_id: session_id.to_string(),
        })?;
        Ok(SessionRef { topic, session })
    }

    pub fn start_session(
        &self,
        topic_id: &str,
        session_id: &str,
        notifier: &mut dyn Notifier,
    ) -> Result<i64> {
        let r = self.resolve(topic_id, session_id)?;
        let attempt_id = self.db.start_attempt(r.topic_id(), r.session_id())?;
        info!(topic_id, session_id, attempt_id, "session started");
        notifier.notify(
            Level::Info,
            format!("Started '{}' (attempt {})", r.session.title, attempt_id),
        );
        Ok(attempt_id)
    }

    pub fn answer(
        &self,
        attempt_id: i64,
        section_id: &str,
        question_index: usize,
        choice: usize,
    ) -> Result<AnswerResult> {
        let attempt = self.open_attempt(attempt_id)?;
        let r = self.resolve(&attempt.topic_id, &attempt.session_id)?;

        let section = r.session.section(section_id).ok_or_else(|| {
            Error::InvalidAnswer(format!(
                "section '{}' is not part of session '{}'",
                section_id, r.session.id
            ))
        })?;
        let questions = section.content.questions();
        if questions.is_empty() {
            return Err(Error::InvalidAnswer(format!(
                "section '{}' is a {} section without questions",
                section_id,
                section.content.kind().as_str()
            )));
        }
        let question = questions.get(question_index).ok_or_else(|| {
            Error::InvalidAnswer(format!(
                "question {} out of range, section '{}' has {}",
                question_index,
                section_id,
                questions.len()
            ))
        })?;
        if choice >= question.options.len() {
            return Err(Error::InvalidAnswer(format!(
                "choice {} out of range, question has {} options",
                choice,
                question.options.len()
            )));
        }

        let correct = question.is_correct(choice);
        self.db
            .record_answer(attempt_id, section_id, question_index, choice, correct)?;
        debug!(attempt_id, section_id, question_index, correct, "answer recorded");

        Ok(AnswerResult {
            correct,
            correct_option: question.answer,
            explanation: question.explanation.clone(),
        })
    }

    /// Closes the attempt and moves the session to completed, or to needs
    /// work when the score falls below the pass mark. Every question in the
    /// session counts, answered or not.
    pub fn finish(&self, attempt_id: i64, notifier: &mut dyn Notifier) -> Result<AttemptResult> {
        let attempt = self.open_attempt(attempt_id)?;
        let r = self.resolve(&attempt.topic_id, &attempt.session_id)?;

        let questions = r.session.question_count();
        let score = attempt.score(questions);
        let status = outcome_status(score, self.pass_mark);
        if !self.db.finish_attempt(attempt_id, status)? {
            return Err(Error::AttemptClosed(attempt_id));
        }

        let attempt = self
            .db
            .get_attempt(attempt_id)?
            .ok_or(Error::UnknownAttempt(attempt_id))?;
        info!(attempt_id, status = status.as_str(), score = ?score, "attempt finished");

        match (status, score) {
            (SessionStatus::Completed, Some(score)) => notifier.notify(
                Level::Success,
                format!("Completed '{}' with {:.0}%", r.session.title, score * 100.0),
            ),
            (SessionStatus::Completed, None) => notifier.notify(
                Level::Success,
                format!("Completed '{}'", r.session.title),
            ),
            (_, score) => notifier.notify(
                Level::Warning,
                format!(
                    "'{}' scored {:.0}%, added to review",
                    r.session.title,
                    score.unwrap_or(0.0) * 100.0
                ),
            ),
        }

        Ok(AttemptResult {
            attempt,
            questions,
            score,
            status,
        })
    }

    pub fn set_status(
        &self,
        topic_id: &str,
        session_id: &str,
        status: SessionStatus,
        notifier: &mut dyn Notifier,
    ) -> Result<()> {
        let r = self.resolve(topic_id, session_id)?;
        self.db.set_status(r.topic_id(), r.session_id(), status)?;
        info!(topic_id, session_id, status = status.as_str(), "status set");

        let level = match status {
            SessionStatus::Completed => Level::Success,
            SessionStatus::NeedsWork => Level::Warning,
            SessionStatus::NotStarted | SessionStatus::InProgress => Level::Info,
        };
        notifier.notify(
            level,
            format!("'{}' marked {}", r.session.title, status.label()),
        );
        Ok(())
    }

    /// Sessions of a topic in catalog order, with their stored status.
    pub fn topic_sessions(&self, topic_id: &str) -> Result<Vec<SessionEntry>> {
        let topic = self
            .catalog
            .topic(topic_id)
            .ok_or_else(|| Error::UnknownTopic(topic_id.to_string()))?;
        let snapshot = self.db.snapshot()?;
        Ok(topic
            .sessions
            .iter()
            .map(|session| SessionEntry::new(SessionRef { topic, session }, &snapshot))
            .collect())
    }

    pub fn session_status(&self, topic_id: &str, session_id: &str) -> Result<SessionStatus> {
        let r = self.resolve(topic_id, session_id)?;
        Ok(self
            .db
            .get_progress(r.topic_id(), r.session_id())?
            .map(|p| p.status)
            .unwrap_or(SessionStatus::NotStarted))
    }

    pub fn quick_actions(&self, review_limit: usize) -> Result<QuickActions> {
        let snapshot = self.db.snapshot()?;
        Ok(recommend::quick_actions(self.catalog, &snapshot, review_limit))
    }

    pub fn topic_summaries(&self) -> Result<Vec<TopicSummary>> {
        let snapshot = self.db.snapshot()?;
        Ok(self
            .catalog
            .topics()
            .iter()
            .map(|topic| {
                let mut summary = TopicSummary {
                    topic_id: topic.id.clone(),
                    title: topic.title.clone(),
                    total_sessions: topic.sessions.len(),
                    completed: 0,
                    in_progress: 0,
                    needs_work: 0,
                };
                for session in &topic.sessions {
                    match snapshot.status(&topic.id, &session.id) {
                        Some(SessionStatus::Completed) => summary.completed += 1,
                        Some(SessionStatus::InProgress) => summary.in_progress += 1,
                        Some(SessionStatus::NeedsWork) => summary.needs_work += 1,
                        Some(SessionStatus::NotStarted) | None => {}
                    }
                }
                summary
            })
            .collect())
    }

    fn open_attempt(&self, attempt_id: i64) -> Result<Attempt> {
        let attempt = self
            .db
            .get_attempt(attempt_id)?
            .ok_or(Error::UnknownAttempt(attempt_id))?;
        if !attempt.is_open() {
            return Err(Error::AttemptClosed(attempt_id));
        }
        Ok(attempt)
    }
}

fn outcome_status(score: Option<f64>, pass_mark: f64) -> SessionStatus {
    match score {
        Some(score) if score < pass_mark => SessionStatus::NeedsWork,
        _ => SessionStatus::Completed,
    }
}
