use thiserror::Error;

use crate::catalog::CatalogError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("unknown topic '{0}'")]
    UnknownTopic(String),

    #[error("unknown session '{session_id}' in topic '{topic_id}'")]
    UnknownSession {
        topic_id: String,
        session_id: String,
    },

    #[error("unknown attempt {0}")]
    UnknownAttempt(i64),

    #[error("attempt {0} is already finished")]
    AttemptClosed(i64),

    #[error("invalid answer: {0}")]
    InvalidAnswer(String),

    #[error("invalid status '{0}'. Use: not-started, in-progress, completed, needs-work")]
    InvalidStatus(String),
}

pub type Result<T> = std::result::Result<T, Error>;
