use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::{Section, Session, Topic};

// Learning content compiled into the binary
const BUNDLED_CATALOG: &str = include_str!("../content/catalog.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("empty id in {0}")]
    EmptyId(String),

    #[error("duplicate topic id '{0}'")]
    DuplicateTopic(String),

    #[error("duplicate session id '{session_id}' in topic '{topic_id}'")]
    DuplicateSession {
        topic_id: String,
        session_id: String,
    },

    #[error("duplicate section id '{section_id}' in {topic_id}/{session_id}")]
    DuplicateSection {
        topic_id: String,
        session_id: String,
        section_id: String,
    },

    #[error("question {index} in section '{section_id}': {reason}")]
    InvalidQuestion {
        section_id: String,
        index: usize,
        reason: &'static str,
    },
}

/// Read-only tree of topics, sessions and sections.
///
/// Topic and session order is the order they were declared in, and is what
/// decides which session comes "next".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    topics: Vec<Topic>,
}

/// A session together with the topic that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRef<'a> {
    pub topic: &'a Topic,
    pub session: &'a Session,
}

impl<'a> SessionRef<'a> {
    pub fn topic_id(&self) -> &'a str {
        &self.topic.id
    }

    pub fn session_id(&self) -> &'a str {
        &self.session.id
    }
}

impl Catalog {
    pub fn new(topics: Vec<Topic>) -> Result<Self, CatalogError> {
        let catalog = Self { topics };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json_str(BUNDLED_CATALOG)
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Loads a catalog file, or the bundled content when no path is given.
    pub fn load(path: Option<&Path>) -> crate::error::Result<Self> {
        let catalog = match path {
            Some(path) => {
                debug!(path = %path.display(), "loading catalog file");
                let json = std::fs::read_to_string(path)?;
                Self::from_json_str(&json)?
            }
            None => Self::bundled()?,
        };
        debug!(
            topics = catalog.topics.len(),
            sessions = catalog.session_count(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn topic(&self, topic_id: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == topic_id)
    }

    pub fn session(&self, topic_id: &str, session_id: &str) -> Option<SessionRef<'_>> {
        let topic = self.topic(topic_id)?;
        let session = topic.session(session_id)?;
        Some(SessionRef { topic, session })
    }

    pub fn contains(&self, topic_id: &str, session_id: &str) -> bool {
        self.session(topic_id, session_id).is_some()
    }

    /// Every session, topics in order and sessions in order within each topic.
    pub fn sessions(&self) -> impl Iterator<Item = SessionRef<'_>> {
        self.topics.iter().flat_map(|topic| {
            topic
                .sessions
                .iter()
                .map(move |session| SessionRef { topic, session })
        })
    }

    pub fn session_count(&self) -> usize {
        self.topics.iter().map(|t| t.sessions.len()).sum()
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut topic_ids = HashSet::new();
        for topic in &self.topics {
            if topic.id.trim().is_empty() {
                return Err(CatalogError::EmptyId(format!("topic '{}'", topic.title)));
            }
            if !topic_ids.insert(topic.id.as_str()) {
                return Err(CatalogError::DuplicateTopic(topic.id.clone()));
            }

            let mut session_ids = HashSet::new();
            for session in &topic.sessions {
                if session.id.trim().is_empty() {
                    return Err(CatalogError::EmptyId(format!(
                        "session '{}' of topic '{}'",
                        session.title, topic.id
                    )));
                }
                if !session_ids.insert(session.id.as_str()) {
                    return Err(CatalogError::DuplicateSession {
                        topic_id: topic.id.clone(),
                        session_id: session.id.clone(),
                    });
                }
                validate_sections(topic, session)?;
            }
        }
        Ok(())
    }
}

fn validate_sections(topic: &Topic, session: &Session) -> Result<(), CatalogError> {
    let mut section_ids = HashSet::new();
    for section in &session.sections {
        if section.id.trim().is_empty() {
            return Err(CatalogError::EmptyId(format!(
                "section '{}' of {}/{}",
                section.title, topic.id, session.id
            )));
        }
        if !section_ids.insert(section.id.as_str()) {
            return Err(CatalogError::DuplicateSection {
                topic_id: topic.id.clone(),
                session_id: session.id.clone(),
                section_id: section.id.clone(),
            });
        }
        validate_questions(section)?;
    }
    Ok(())
}

fn validate_questions(section: &Section) -> Result<(), CatalogError> {
    for (index, question) in section.content.questions().iter().enumerate() {
        let reason = if question.options.len() < 2 {
            Some("needs at least two options")
        } else if question.answer >= question.options.len() {
            Some("answer index out of range")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(CatalogError::InvalidQuestion {
                section_id: section.id.clone(),
                index,
                reason,
            });
        }
    }
    Ok(())
}
