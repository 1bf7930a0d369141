//! Error types for the form submission pipeline

use thiserror::Error;

/// Main error type for all pipeline operations
#[derive(Error, Debug)]
pub enum FormsError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Invalid template configuration: {0}")]
    InvalidTemplate(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Folio generation failed: {0}")]
    FolioGeneration(String),

    #[error("Folio not found at path \"{path}\": {reason}")]
    FolioExtraction { path: String, reason: String },

    #[error("Timed out after {timeout_ms} ms waiting for the API")]
    DeliveryTimeout { timeout_ms: u64 },

    #[error("HTTP {status}: {body}")]
    DeliveryHttp { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Submitted form not found: {0}")]
    SubmissionNotFound(String),

    #[error("Submission cannot be retried: {0}")]
    NotRetryable(String),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, FormsError>;
