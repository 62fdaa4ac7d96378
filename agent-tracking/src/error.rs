//! Error types for agent-tracking

use thiserror::Error;

/// Main error type for the agent-tracking library
#[derive(Error, Debug)]
pub enum Error {
    /// The engine rejected the schema statements
    #[error("failed to create agent tracking schema: {0}")]
    Initialization(#[source] rusqlite::Error),

    /// A required argument was empty
    #[error("{0} is required")]
    Validation(&'static str),

    /// The targeted row does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: &str) -> Self {
        Error::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// True for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// True for [`Error::Validation`].
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// Result type alias for agent-tracking
pub type Result<T> = std::result::Result<T, Error>;
