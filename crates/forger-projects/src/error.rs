//! Error types for forger-projects

use thiserror::Error;

/// Result type alias using forger-projects's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Project generation error types
#[derive(Error, Debug)]
pub enum Error {
    /// Project already exists
    #[error("Project already exists at: {path}")]
    ProjectExists { path: String },

    /// Invalid project name
    #[error("Invalid project name: {name}. Use letters, digits, '-', '_' or '.', starting with a letter or digit")]
    InvalidProjectName { name: String },

    /// Unknown language
    #[error("Unknown language: {language}. Available languages: {available}")]
    UnknownLanguage { language: String, available: String },

    /// Unknown framework for a language
    #[error("Unsupported {language} framework: {framework}. Available frameworks: {available}")]
    UnknownFramework {
        language: String,
        framework: String,
        available: String,
    },

    /// Combination the catalog marks as unsupported
    #[error("Unsupported stack: {message}")]
    UnsupportedStack { message: String },

    /// Catalog failed validation
    #[error("Invalid stack catalog: {message}")]
    InvalidCatalog { message: String },

    /// Command not found
    #[error("Required command not found: {command}")]
    CommandNotFound { command: String },

    /// Setup step exited unsuccessfully
    #[error("Setup step failed: {command} ({status})\n{output}")]
    StepFailed {
        command: String,
        status: String,
        output: String,
    },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Materialization engine error
    #[error("Core error: {0}")]
    Core(#[from] forger_core::Error),
}

impl Error {
    /// Create a project exists error
    pub fn project_exists(path: impl Into<String>) -> Self {
        Self::ProjectExists { path: path.into() }
    }

    /// Create an invalid project name error
    pub fn invalid_project_name(name: impl Into<String>) -> Self {
        Self::InvalidProjectName { name: name.into() }
    }

    /// Create an unknown language error
    pub fn unknown_language(language: impl Into<String>, available: impl Into<String>) -> Self {
        Self::UnknownLanguage {
            language: language.into(),
            available: available.into(),
        }
    }

    /// Create an unknown framework error
    pub fn unknown_framework(
        language: impl Into<String>,
        framework: impl Into<String>,
        available: impl Into<String>,
    ) -> Self {
        Self::UnknownFramework {
            language: language.into(),
            framework: framework.into(),
            available: available.into(),
        }
    }

    /// Create an unsupported stack error
    pub fn unsupported_stack(message: impl Into<String>) -> Self {
        Self::UnsupportedStack {
            message: message.into(),
        }
    }

    /// Create an invalid catalog error
    pub fn invalid_catalog(message: impl Into<String>) -> Self {
        Self::InvalidCatalog {
            message: message.into(),
        }
    }

    /// Create a command not found error
    pub fn command_not_found(command: impl Into<String>) -> Self {
        Self::CommandNotFound {
            command: command.into(),
        }
    }
}
