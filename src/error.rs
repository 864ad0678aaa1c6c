use thiserror::Error;

/// Main error type for triedex operations
#[derive(Error, Debug)]
pub enum TriedexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Index corruption: {0}")]
    Corrupt(String),

    #[error("Query syntax error: {0}")]
    QueryParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for triedex operations
pub type Result<T> = std::result::Result<T, TriedexError>;

impl TriedexError {
    /// Shorthand for a corruption error
    pub fn corrupt(msg: impl Into<String>) -> Self {
        TriedexError::Corrupt(msg.into())
    }

    /// Check if this error indicates damaged index files.
    ///
    /// Corruption is never retried: the formats carry no redundancy.
    pub fn is_corruption(&self) -> bool {
        matches!(self, TriedexError::Corrupt(_))
    }
}
