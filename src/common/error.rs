//! Error types for the contract test runner
//!
//! Per-case errors (declaration, parse) are contained within the case that
//! raised them; run-level errors (configuration, artifact discovery, report
//! output) abort the whole run with a distinct exit code.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the contract test runner
#[derive(Error, Debug)]
pub enum Error {
    // === Case Declaration Errors ===
    #[error("Case '{case}' is missing {field}")]
    MissingField { case: String, field: &'static str },

    #[error("Invalid case ID {0:?}. Expected an underscore-delimited ID like xxx_xxx_001")]
    InvalidCaseId(String),

    #[error("Case '{case}': invalid expected status_code {value:?}")]
    InvalidExpectedStatus { case: String, value: String },

    #[error("Case '{case}': invalid HTTP method {method:?}")]
    InvalidMethod { case: String, method: String },

    #[error("Case '{case}': invalid URL {url:?}: {reason}")]
    InvalidUrl {
        case: String,
        url: String,
        reason: String,
    },

    #[error("Case '{case}': invalid header {name:?}: {reason}")]
    InvalidHeader {
        case: String,
        name: String,
        reason: String,
    },

    // === Response Errors ===
    #[error("Response is not valid JSON (HTTP {http_status}): {body}")]
    ResponseNotJson { http_status: u16, body: String },

    // === Artifact Errors ===
    #[error("Failed to read artifact '{path}': {error}")]
    ArtifactRead { path: String, error: String },

    #[error("Failed to write artifact '{path}': {error}")]
    ArtifactWrite { path: String, error: String },

    #[error("Sheet '{sheet}' not found in '{path}'")]
    SheetNotFound { path: String, sheet: String },

    #[error("Artifact '{0}' has no case rows")]
    EmptyArtifact(String),

    #[error("Template artifact '{0}' does not exist")]
    TemplateMissing(String),

    // === Transport Errors ===
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === Report Errors ===
    #[error("Failed to write report: {0}")]
    Report(String),

    // === IO Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Test Errors ===
    #[error("Test assertion failed: {0}")]
    TestAssertion(String),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a missing field error for a case
    pub fn missing_field(case: &str, field: &'static str) -> Self {
        Self::MissingField {
            case: case.to_string(),
            field,
        }
    }

    /// Create an invalid URL error
    pub fn invalid_url(case: &str, url: &str, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            case: case.to_string(),
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid header error
    pub fn invalid_header(case: &str, name: &str, reason: impl ToString) -> Self {
        Self::InvalidHeader {
            case: case.to_string(),
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an artifact read error
    pub fn artifact_read(path: &std::path::Path, error: impl ToString) -> Self {
        Self::ArtifactRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Create an artifact write error
    pub fn artifact_write(path: &std::path::Path, error: impl ToString) -> Self {
        Self::ArtifactWrite {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Whether this error aborts the whole run rather than a single case
    pub fn is_run_level(&self) -> bool {
        matches!(
            self,
            Error::ArtifactRead { .. }
                | Error::SheetNotFound { .. }
                | Error::EmptyArtifact(_)
                | Error::TemplateMissing(_)
                | Error::Config(_)
                | Error::ConfigParse(_)
                | Error::Report(_)
                | Error::FileRead { .. }
                | Error::HttpClient(_)
        )
    }
}
