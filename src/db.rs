use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use std::path::Path;
use tracing::warn;

use crate::models::{Answer, Attempt, SessionProgress, SessionStatus};
use crate::progress::{ProgressSnapshot, ProgressStore};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS session_progress (
                topic_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                status TEXT NOT NULL CHECK(status IN ('not_started', 'in_progress', 'completed', 'needs_work')),
                started_at TEXT,
                completed_at TEXT,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (topic_id, session_id)
            );

            -- One row per sitting of a session
            CREATE TABLE IF NOT EXISTS attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                topic_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT,
                FOREIGN KEY (topic_id, session_id) REFERENCES session_progress(topic_id, session_id)
            );

            CREATE TABLE IF NOT EXISTS answers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                attempt_id INTEGER NOT NULL,
                section_id TEXT NOT NULL,
                question_index INTEGER NOT NULL,
                selected INTEGER NOT NULL,
                correct INTEGER NOT NULL,
                answered_at TEXT NOT NULL,
                UNIQUE (attempt_id, section_id, question_index),
                FOREIGN KEY (attempt_id) REFERENCES attempts(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_progress_status ON session_progress(status);
            CREATE INDEX IF NOT EXISTS idx_attempts_session ON attempts(topic_id, session_id);
            CREATE INDEX IF NOT EXISTS idx_answers_attempt ON answers(attempt_id);
            "#,
        )?;

        Ok(())
    }

    // Progress operations
    pub fn get_progress(&self, topic_id: &str, session_id: &str) -> Result<Option<SessionProgress>> {
        self.conn
            .query_row(
                r#"
                SELECT topic_id, session_id, status, started_at, completed_at, updated_at
                FROM session_progress
                WHERE topic_id = ?1 AND session_id = ?2
                "#,
                params![topic_id, session_id],
                progress_from_row,
            )
            .optional()
    }

    pub fn list_progress(&self) -> Result<Vec<SessionProgress>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT topic_id, session_id, status, started_at, completed_at, updated_at
            FROM session_progress
            ORDER BY updated_at DESC, topic_id, session_id
            "#,
        )?;

        let rows = stmt.query_map([], progress_from_row)?;
        rows.collect()
    }

    pub fn snapshot(&self) -> Result<ProgressSnapshot> {
        Ok(self
            .list_progress()?
            .into_iter()
            .map(|p| (p.topic_id, p.session_id, p.status))
            .collect())
    }

    pub fn set_status(&self, topic_id: &str, session_id: &str, status: SessionStatus) -> Result<()> {
        upsert_status(&self.conn, topic_id, session_id, status)
    }

    // Attempt operations
    pub fn start_attempt(&self, topic_id: &str, session_id: &str) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        upsert_status(&tx, topic_id, session_id, SessionStatus::InProgress)?;
        tx.execute(
            "INSERT INTO attempts (topic_id, session_id, started_at) VALUES (?1, ?2, ?3)",
            params![topic_id, session_id, Utc::now().to_rfc3339()],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    pub fn get_attempt(&self, attempt_id: i64) -> Result<Option<Attempt>> {
        self.conn
            .query_row(
                &format!("{} WHERE a.id = ?1 GROUP BY a.id", ATTEMPT_QUERY),
                params![attempt_id],
                attempt_from_row,
            )
            .optional()
    }

    pub fn list_attempts(&self, topic_id: Option<&str>) -> Result<Vec<Attempt>> {
        let query = format!(
            "{} WHERE (?1 IS NULL OR a.topic_id = ?1) GROUP BY a.id ORDER BY a.started_at DESC, a.id DESC",
            ATTEMPT_QUERY
        );
        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(params![topic_id], attempt_from_row)?;
        rows.collect()
    }

    /// Ends the attempt and records the session outcome together. Returns
    /// false, writing nothing, if the attempt was unknown or already closed.
    pub fn finish_attempt(&self, attempt_id: i64, status: SessionStatus) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let session: Option<(String, String)> = tx
            .query_row(
                "SELECT topic_id, session_id FROM attempts WHERE id = ?1 AND ended_at IS NULL",
                params![attempt_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((topic_id, session_id)) = session else {
            return Ok(false);
        };

        tx.execute(
            "UPDATE attempts SET ended_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), attempt_id],
        )?;
        upsert_status(&tx, &topic_id, &session_id, status)?;
        tx.commit()?;
        Ok(true)
    }

    // Answering the same question again replaces the earlier answer
    pub fn record_answer(
        &self,
        attempt_id: i64,
        section_id: &str,
        question_index: usize,
        selected: usize,
        correct: bool,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO answers (attempt_id, section_id, question_index, selected, correct, answered_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(attempt_id, section_id, question_index) DO UPDATE SET
                selected = excluded.selected,
                correct = excluded.correct,
                answered_at = excluded.answered_at
            "#,
            params![
                attempt_id,
                section_id,
                question_index as i64,
                selected as i64,
                correct,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn list_answers(&self, attempt_id: i64) -> Result<Vec<Answer>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, attempt_id, section_id, question_index, selected, correct, answered_at
            FROM answers
            WHERE attempt_id = ?1
            ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map(params![attempt_id], |row| {
            Ok(Answer {
                id: row.get(0)?,
                attempt_id: row.get(1)?,
                section_id: row.get(2)?,
                question_index: row.get(3)?,
                selected: row.get(4)?,
                correct: row.get(5)?,
                answered_at: row.get(6)?,
            })
        })?;
        rows.collect()
    }

    pub fn get_stats(&self) -> Result<Stats> {
        let count_status = |status: SessionStatus| -> Result<i64> {
            self.conn.query_row(
                "SELECT COUNT(*) FROM session_progress WHERE status = ?1",
                params![status.as_str()],
                |row| row.get(0),
            )
        };

        let attempts: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM attempts", [], |row| row.get(0))?;

        let (answers, correct): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(correct), 0) FROM answers",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(Stats {
            completed: count_status(SessionStatus::Completed)?,
            in_progress: count_status(SessionStatus::InProgress)?,
            needs_work: count_status(SessionStatus::NeedsWork)?,
            attempts,
            answers,
            accuracy: if answers == 0 {
                0.0
            } else {
                correct as f64 / answers as f64 * 100.0
            },
        })
    }
}

impl ProgressStore for Database {
    fn status(&self, topic_id: &str, session_id: &str) -> Option<SessionStatus> {
        match self.get_progress(topic_id, session_id) {
            Ok(progress) => progress.map(|p| p.status),
            Err(e) => {
                warn!(topic_id, session_id, error = %e, "progress lookup failed");
                None
            }
        }
    }
}

/// Creates or updates the progress row. The first start time and the
/// latest completion time are kept.
fn upsert_status(
    conn: &Connection,
    topic_id: &str,
    session_id: &str,
    status: SessionStatus,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let started_at = (status != SessionStatus::NotStarted).then(|| now.clone());
    let completed_at = (status == SessionStatus::Completed).then(|| now.clone());

    conn.execute(
        r#"
        INSERT INTO session_progress (topic_id, session_id, status, started_at, completed_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(topic_id, session_id) DO UPDATE SET
            status = excluded.status,
            started_at = COALESCE(session_progress.started_at, excluded.started_at),
            completed_at = COALESCE(excluded.completed_at, session_progress.completed_at),
            updated_at = excluded.updated_at
        "#,
        params![topic_id, session_id, status.as_str(), started_at, completed_at, now],
    )?;
    Ok(())
}

const ATTEMPT_QUERY: &str = r#"
    SELECT a.id, a.topic_id, a.session_id, a.started_at, a.ended_at,
           COALESCE(SUM(ans.correct), 0), COUNT(ans.id)
    FROM attempts a
    LEFT JOIN answers ans ON ans.attempt_id = a.id
"#;

fn attempt_from_row(row: &Row<'_>) -> Result<Attempt> {
    Ok(Attempt {
        id: row.get(0)?,
        topic_id: row.get(1)?,
        session_id: row.get(2)?,
        started_at: row.get(3)?,
        ended_at: row.get(4)?,
        correct: row.get(5)?,
        answered: row.get(6)?,
    })
}

fn progress_from_row(row: &Row<'_>) -> Result<SessionProgress> {
    let status_str: String = row.get(2)?;
    let status = SessionStatus::from_str(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown status '{}'", status_str).into(),
        )
    })?;

    Ok(SessionProgress {
        topic_id: row.get(0)?,
        session_id: row.get(1)?,
        status,
        started_at: row.get(3)?,
        completed_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub completed: i64,
    pub in_progress: i64,
    pub needs_work: i64,
    pub attempts: i64,
    pub answers: i64,
    pub accuracy: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        let db = Database::open(":memory:").expect("Failed to create in-memory database");
        db.init().expect("Failed to initialize database");
        db
    }

    mod init_tests {
        use super::*;

        #[test]
        fn init_creates_tables() {
            let db = setup_db();
            for table in ["session_progress", "attempts", "answers"] {
                let count: i64 = db
                    .conn
                    .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                        row.get(0)
                    })
                    .unwrap_or_else(|_| panic!("{} table should exist", table));
                assert_eq!(count, 0);
            }
        }

        #[test]
        fn init_is_idempotent() {
            let db = setup_db();
            db.set_status("t", "s", SessionStatus::Completed).unwrap();

            db.init().expect("Re-init should succeed");

            assert_eq!(db.list_progress().unwrap().len(), 1);
        }
    }

    mod progress_tests {
        use super::*;

        #[test]
        fn get_progress_not_found() {
            let db = setup_db();
            assert!(db.get_progress("t", "s").unwrap().is_none());
            assert_eq!(db.status("t", "s"), None);
        }

        #[test]
        fn set_status_creates_row() {
            let db = setup_db();
            db.set_status("t", "s", SessionStatus::InProgress).unwrap();

            let p = db.get_progress("t", "s").unwrap().unwrap();
            assert_eq!(p.status, SessionStatus::InProgress);
            assert!(p.started_at.is_some());
            assert!(p.completed_at.is_none());
        }

        #[test]
        fn not_started_has_no_start_time() {
            let db = setup_db();
            db.set_status("t", "s", SessionStatus::NotStarted).unwrap();
            let p = db.get_progress("t", "s").unwrap().unwrap();
            assert!(p.started_at.is_none());
        }

        #[test]
        fn set_status_keeps_first_start_time() {
            let db = setup_db();
            db.set_status("t", "s", SessionStatus::InProgress).unwrap();
            let first = db.get_progress("t", "s").unwrap().unwrap().started_at;

            db.set_status("t", "s", SessionStatus::Completed).unwrap();
            let p = db.get_progress("t", "s").unwrap().unwrap();
            assert_eq!(p.started_at, first);
            assert_eq!(p.status, SessionStatus::Completed);
            assert!(p.completed_at.is_some());
        }

        #[test]
        fn completion_time_survives_later_review_flag() {
            let db = setup_db();
            db.set_status("t", "s", SessionStatus::Completed).unwrap();
            db.set_status("t", "s", SessionStatus::NeedsWork).unwrap();
            let p = db.get_progress("t", "s").unwrap().unwrap();
            assert_eq!(p.status, SessionStatus::NeedsWork);
            assert!(p.completed_at.is_some());
        }

        #[test]
        fn rows_are_keyed_by_topic_and_session() {
            let db = setup_db();
            db.set_status("a", "intro", SessionStatus::Completed).unwrap();
            db.set_status("b", "intro", SessionStatus::NeedsWork).unwrap();

            assert_eq!(db.status("a", "intro"), Some(SessionStatus::Completed));
            assert_eq!(db.status("b", "intro"), Some(SessionStatus::NeedsWork));
            assert_eq!(db.list_progress().unwrap().len(), 2);
        }

        #[test]
        fn snapshot_matches_rows() {
            let db = setup_db();
            db.set_status("a", "s1", SessionStatus::Completed).unwrap();
            db.set_status("a", "s2", SessionStatus::NeedsWork).unwrap();

            let snapshot = db.snapshot().unwrap();
            assert_eq!(snapshot.len(), 2);
            assert_eq!(snapshot.status("a", "s2"), Some(SessionStatus::NeedsWork));
        }

        #[test]
        fn invalid_status_rejected_by_schema() {
            let db = setup_db();
            let result = db.conn.execute(
                "INSERT INTO session_progress (topic_id, session_id, status, updated_at) VALUES ('t', 's', 'bogus', 'now')",
                [],
            );
            assert!(result.is_err());
        }
    }

    mod attempt_tests {
        use super::*;

        #[test]
        fn start_attempt_marks_in_progress() {
            let db = setup_db();
            let id = db.start_attempt("t", "s").unwrap();

            let attempt = db.get_attempt(id).unwrap().unwrap();
            assert_eq!(attempt.topic_id, "t");
            assert!(attempt.is_open());
            assert_eq!(attempt.answered, 0);
            assert_eq!(db.status("t", "s"), Some(SessionStatus::InProgress));
        }

        #[test]
        fn get_attempt_not_found() {
            let db = setup_db();
            assert!(db.get_attempt(99).unwrap().is_none());
        }

        #[test]
        fn answers_are_tallied() {
            let db = setup_db();
            let id = db.start_attempt("t", "s").unwrap();
            db.record_answer(id, "quiz", 0, 1, true).unwrap();
            db.record_answer(id, "quiz", 1, 0, false).unwrap();
            db.record_answer(id, "case", 0, 2, true).unwrap();

            let attempt = db.get_attempt(id).unwrap().unwrap();
            assert_eq!(attempt.correct, 2);
            assert_eq!(attempt.answered, 3);
        }

        #[test]
        fn reanswering_replaces_previous() {
            let db = setup_db();
            let id = db.start_attempt("t", "s").unwrap();
            db.record_answer(id, "quiz", 0, 0, false).unwrap();
            db.record_answer(id, "quiz", 0, 1, true).unwrap();

            let answers = db.list_answers(id).unwrap();
            assert_eq!(answers.len(), 1);
            assert_eq!(answers[0].selected, 1);
            assert!(answers[0].correct);
        }

        #[test]
        fn answer_for_unknown_attempt_fails() {
            let db = setup_db();
            assert!(db.record_answer(42, "quiz", 0, 0, true).is_err());
        }

        #[test]
        fn finish_attempt_only_once() {
            let db = setup_db();
            let id = db.start_attempt("t", "s").unwrap();
            assert!(db.finish_attempt(id, SessionStatus::Completed).unwrap());
            assert!(!db.finish_attempt(id, SessionStatus::NeedsWork).unwrap());
            assert!(!db.finish_attempt(999, SessionStatus::Completed).unwrap());
            assert!(!db.get_attempt(id).unwrap().unwrap().is_open());
            assert_eq!(db.status("t", "s"), Some(SessionStatus::Completed));
        }

        #[test]
        fn failed_status_write_leaves_attempt_open() {
            let db = setup_db();
            let id = db.start_attempt("t", "s").unwrap();
            db.conn
                .execute_batch(
                    "CREATE TRIGGER reject_progress BEFORE UPDATE ON session_progress
                     BEGIN SELECT RAISE(ABORT, 'progress locked'); END;",
                )
                .unwrap();

            assert!(db.finish_attempt(id, SessionStatus::Completed).is_err());
            assert!(db.get_attempt(id).unwrap().unwrap().is_open());
            assert_eq!(db.status("t", "s"), Some(SessionStatus::InProgress));
        }

        #[test]
        fn failed_attempt_insert_writes_no_progress() {
            let db = setup_db();
            db.conn
                .execute_batch(
                    "CREATE TRIGGER reject_attempts BEFORE INSERT ON attempts
                     BEGIN SELECT RAISE(ABORT, 'attempts locked'); END;",
                )
                .unwrap();

            assert!(db.start_attempt("t", "s").is_err());
            assert_eq!(db.status("t", "s"), None);
        }

        #[test]
        fn list_attempts_filters_by_topic() {
            let db = setup_db();
            db.start_attempt("a", "s1").unwrap();
            db.start_attempt("a", "s2").unwrap();
            db.start_attempt("b", "s1").unwrap();

            assert_eq!(db.list_attempts(None).unwrap().len(), 3);
            let for_a = db.list_attempts(Some("a")).unwrap();
            assert_eq!(for_a.len(), 2);
            assert!(for_a.iter().all(|a| a.topic_id == "a"));
        }

        #[test]
        fn list_attempts_newest_first() {
            let db = setup_db();
            let first = db.start_attempt("a", "s1").unwrap();
            let second = db.start_attempt("a", "s1").unwrap();
            let ids: Vec<i64> = db
                .list_attempts(None)
                .unwrap()
                .iter()
                .map(|a| a.id)
                .collect();
            assert_eq!(ids, vec![second, first]);
        }
    }

    mod stats_tests {
        use super::*;

        #[test]
        fn stats_empty_db() {
            let db = setup_db();
            let stats = db.get_stats().unwrap();
            assert_eq!(stats.completed, 0);
            assert_eq!(stats.attempts, 0);
            assert_eq!(stats.accuracy, 0.0);
        }

        #[test]
        fn stats_counts_statuses_and_accuracy() {
            let db = setup_db();
            db.set_status("a", "s1", SessionStatus::Completed).unwrap();
            db.set_status("a", "s2", SessionStatus::NeedsWork).unwrap();
            let id = db.start_attempt("b", "s1").unwrap();
            db.record_answer(id, "q", 0, 0, true).unwrap();
            db.record_answer(id, "q", 1, 0, false).unwrap();

            let stats = db.get_stats().unwrap();
            assert_eq!(stats.completed, 1);
            assert_eq!(stats.needs_work, 1);
            assert_eq!(stats.in_progress, 1);
            assert_eq!(stats.attempts, 1);
            assert_eq!(stats.answers, 2);
            assert_eq!(stats.accuracy, 50.0);
        }
    }
}
