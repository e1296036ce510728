//! Error types for forger-core
//!
//! Three layers of failure:
//! - [`Error`]: the materialization call itself could not run
//! - [`TaskError`]: one copy-task failed; recorded in the report, never fatal
//! - [`FetchError`]: a template source could not produce a key

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using forger-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level errors returned by the materializer and task builders
#[derive(Error, Debug)]
pub enum Error {
    /// Concurrency limit below one
    #[error("Invalid concurrency limit: {limit}. Must be at least 1")]
    InvalidConcurrency { limit: usize },

    /// Manifest has no tasks but the caller requires at least one
    #[error("Manifest is empty: at least one copy-task is required")]
    EmptyManifest,

    /// Copy-task could not be constructed
    #[error("Invalid copy-task: {message}")]
    InvalidTask { message: String },

    /// S3 client could not be configured
    #[error("S3 configuration error: {message}")]
    S3Config { message: String },
}

impl Error {
    /// Create an invalid concurrency error
    pub fn invalid_concurrency(limit: usize) -> Self {
        Self::InvalidConcurrency { limit }
    }

    /// Create an invalid task error
    pub fn invalid_task(message: impl Into<String>) -> Self {
        Self::InvalidTask {
            message: message.into(),
        }
    }

    /// Create an S3 configuration error
    pub fn s3_config(message: impl Into<String>) -> Self {
        Self::S3Config {
            message: message.into(),
        }
    }
}

/// Failure of a single template fetch
#[derive(Error, Debug)]
pub enum FetchError {
    /// Key does not exist in the backend
    #[error("Template not found: {key}")]
    NotFound { key: String },

    /// Backend rejected or failed the request
    #[error("Failed to fetch template {key}: {message}")]
    Backend { key: String, message: String },

    /// Local IO failure while reading the template
    #[error("Failed to read template {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Create a not found error
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a backend error
    pub fn backend(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create an IO error
    pub fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            key: key.into(),
            source,
        }
    }

    /// The key that failed
    pub fn key(&self) -> &str {
        match self {
            Self::NotFound { key } | Self::Backend { key, .. } | Self::Io { key, .. } => key,
        }
    }

    /// Whether the key is simply absent from the backend
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Substitution map that cannot be compiled
#[derive(Error, Debug)]
pub enum SubstituteError {
    /// An empty placeholder would match between every byte
    #[error("Placeholder must not be empty")]
    EmptyPlaceholder,

    #[error("Invalid substitution pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Failure of one copy-task
#[derive(Error, Debug)]
pub enum TaskError {
    /// Template could not be fetched
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Substitution pattern could not be compiled
    #[error("Failed to prepare substitutions for {key}: {message}")]
    Substitute { key: String, message: String },

    /// Parent directory of the destination could not be created
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Destination file could not be written
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Task was never started because materialization was cancelled
    #[error("Cancelled before the task was started")]
    Cancelled,

    /// Task panicked while running
    #[error("Task panicked: {message}")]
    Panicked { message: String },
}

impl TaskError {
    /// Short machine-readable kind, used in JSON reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Substitute { .. } => "substitute",
            Self::CreateDirectory { .. } => "create_directory",
            Self::Write { .. } => "write",
            Self::Cancelled => "cancelled",
            Self::Panicked { .. } => "panicked",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_key() {
        assert_eq!(FetchError::not_found("a/b.txt").key(), "a/b.txt");
        assert_eq!(FetchError::backend("c.txt", "denied").key(), "c.txt");
        assert!(FetchError::not_found("x").is_not_found());
        assert!(!FetchError::backend("x", "boom").is_not_found());
    }

    #[test]
    fn test_task_error_display() {
        let err = TaskError::from(FetchError::not_found("templates/go/gin/main.txt"));
        assert_eq!(err.to_string(), "Template not found: templates/go/gin/main.txt");
        assert_eq!(err.kind(), "fetch");

        let err = TaskError::Write {
            path: PathBuf::from("/tmp/app/main.go"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().starts_with("Failed to write /tmp/app/main.go"));
        assert_eq!(err.kind(), "write");
    }

    #[test]
    fn test_invalid_concurrency_message() {
        let err = Error::invalid_concurrency(0);
        assert_eq!(
            err.to_string(),
            "Invalid concurrency limit: 0. Must be at least 1"
        );
    }
}
