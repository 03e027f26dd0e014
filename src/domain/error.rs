use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::csv::{BlockingError, StatusMessage};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppError {
    Internal(String),
    NotFound(String),
    ValidationError(String),
    EmptyInput(String),
    ExportPrecondition { title: String, body: String },
    UnexpectedParse(String),
    IoError(String),
    ConfigError(String),
}

impl AppError {
    pub fn export_precondition(title: impl Into<String>, body: impl Into<String>) -> Self {
        AppError::ExportPrecondition {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Status line shown to the user for this failure
    pub fn status_message(&self) -> StatusMessage {
        let text = match self {
            AppError::ValidationError(msg) | AppError::EmptyInput(msg) => msg.clone(),
            AppError::ExportPrecondition { body, .. } => body.clone(),
            AppError::UnexpectedParse(_) => {
                "Something went wrong while converting the file. Check the logs for details."
                    .to_string()
            }
            other => other.to_string(),
        };
        StatusMessage::error(text)
    }

    /// Modal payload, only present for export precondition failures
    pub fn blocking(&self) -> Option<BlockingError> {
        match self {
            AppError::ExportPrecondition { title, body } => Some(BlockingError {
                title: title.clone(),
                body: body.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::EmptyInput(msg) => write!(f, "Empty input: {}", msg),
            AppError::ExportPrecondition { title, body } => {
                write!(f, "Export blocked: {}: {}", title, body)
            }
            AppError::UnexpectedParse(msg) => write!(f, "Parse error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON serialization failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
