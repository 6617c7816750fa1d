use std::collections::HashMap;

use crate::models::SessionStatus;

/// Read access to per-session status, keyed by topic and session id.
pub trait ProgressStore {
    fn status(&self, topic_id: &str, session_id: &str) -> Option<SessionStatus>;
}

impl<S: ProgressStore + ?Sized> ProgressStore for &S {
    fn status(&self, topic_id: &str, session_id: &str) -> Option<SessionStatus> {
        (**self).status(topic_id, session_id)
    }
}

/// In-memory copy of the progress table, taken once and scanned many times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    entries: HashMap<(String, String), SessionStatus>,
}

impl ProgressSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, topic_id: &str, session_id: &str, status: SessionStatus) -> Self {
        self.set(topic_id, session_id, status);
        self
    }

    pub fn set(&mut self, topic_id: &str, session_id: &str, status: SessionStatus) {
        self.entries
            .insert((topic_id.to_string(), session_id.to_string()), status);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ProgressStore for ProgressSnapshot {
    fn status(&self, topic_id: &str, session_id: &str) -> Option<SessionStatus> {
        self.entries
            .get(&(topic_id.to_string(), session_id.to_string()))
            .copied()
    }
}

impl FromIterator<(String, String, SessionStatus)> for ProgressSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, String, SessionStatus)>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|(topic_id, session_id, status)| ((topic_id, session_id), status))
            .collect();
        Self { entries }
    }
}
