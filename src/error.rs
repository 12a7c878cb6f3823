//! Evidentia error types

use thiserror::Error;

/// Evidentia error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// `freeze` was called before any transaction was accepted
    #[error("No relevant traffic captured")]
    EmptyArchive,

    /// Archive write or lookup error
    #[error("Archive error: {0}")]
    Archive(String),

    /// Archive file does not follow the record layout
    #[error("Malformed archive: {0}")]
    MalformedArchive(String),

    /// Relevance scorer collaborator failed
    #[error("Scorer error: {0}")]
    Scorer(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Evidentia operations
pub type Result<T> = std::result::Result<T, Error>;
