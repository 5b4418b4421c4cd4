//! Error types for CLI operations.

use std::path::Path;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Input file not found
    #[error("{kind} file not found: {path}")]
    FileNotFound { kind: &'static str, path: String },

    /// Input file could not be parsed
    #[error("Failed to parse {kind} file {path}: {message}")]
    InputParse {
        kind: &'static str,
        path: String,
        message: String,
    },

    /// Pipeline wiring or execution error
    #[error("Pipeline execution failed: {message}")]
    PipelineExecution { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn file_not_found(kind: &'static str, path: &Path) -> Self {
        Self::FileNotFound {
            kind,
            path: path.display().to_string(),
        }
    }

    pub fn input_parse(kind: &'static str, path: &Path, message: impl Into<String>) -> Self {
        Self::InputParse {
            kind,
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    pub fn pipeline_execution(message: impl Into<String>) -> Self {
        Self::PipelineExecution {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
