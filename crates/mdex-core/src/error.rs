//! Error types for mdex.

use thiserror::Error;

/// Result type alias using mdex's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for mdex operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Job not found
    #[error("Job not found: {0}")]
    JobNotFound(uuid::Uuid),

    /// Document metadata not found
    #[error("Metadata not found for document: {0}")]
    MetadataNotFound(uuid::Uuid),

    /// Extraction pipeline invocation failed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Search index propagation failed (best-effort path)
    #[error("Index error: {0}")]
    Index(String),

    /// Job orchestration error
    #[error("Job error: {0}")]
    Job(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Authenticated tenant does not match the requested tenant
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

impl Error {
    /// Failure category recorded on a job's terminal `failed` state.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Database(_) => "database",
            Error::NotFound(_) | Error::JobNotFound(_) | Error::MetadataNotFound(_) => "not_found",
            Error::Extraction(_) => "extraction",
            Error::Index(_) => "index",
            Error::Job(_) => "job",
            Error::Serialization(_) => "serialization",
            Error::Config(_) => "config",
            Error::InvalidInput(_) => "invalid_input",
            Error::Request(_) => "request",
            Error::Forbidden(_) => "forbidden",
            Error::Internal(_) => "internal",
            Error::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("test resource".to_string());
        assert_eq!(err.to_string(), "Not found: test resource");
    }

    #[test]
    fn test_error_display_job_not_found() {
        let id = Uuid::nil();
        let err = Error::JobNotFound(id);
        assert_eq!(err.to_string(), format!("Job not found: {}", id));
    }

    #[test]
    fn test_error_display_metadata_not_found() {
        let id = Uuid::new_v4();
        let err = Error::MetadataNotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_error_display_extraction() {
        let err = Error::Extraction("agent timeout".to_string());
        assert_eq!(err.to_string(), "Extraction error: agent timeout");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("bad selector".to_string());
        assert_eq!(err.to_string(), "Invalid input: bad selector");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_category() {
        assert_eq!(Error::Extraction("x".into()).category(), "extraction");
        assert_eq!(Error::InvalidInput("x".into()).category(), "invalid_input");
        assert_eq!(Error::Internal("x".into()).category(), "internal");
        assert_eq!(Error::JobNotFound(Uuid::nil()).category(), "not_found");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
