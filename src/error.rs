//! Error taxonomy for the full-text pipeline.
//!
//! Only [`AppError::Input`] and [`AppError::DependencyUnavailable`] abort a
//! request. Every other variant is logged and degrades output quality while
//! the response stays a structurally valid feed. Per-article fetch failures
//! are not errors at all: they are recorded as unsuccessful `FetchResult`s.

use thiserror::Error;

/// Public message for a missing or unusable `url` parameter.
pub const INPUT_ERROR_MESSAGE: &str = "Invalid or missing 'url' parameter.";

/// Public message for a collaborator that could not be initialized.
pub const DEPENDENCY_ERROR_MESSAGE: &str = "Dependencies not available. See error log.";

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or invalid feed URL. Fatal to the request.
    #[error("invalid input: {0}")]
    Input(String),

    /// A required collaborator (HTTP client, listener) could not be set up.
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// The feed could not be fetched or parsed.
    #[error("feed parse error: {0}")]
    FeedParse(String),

    /// The HTML parser rejected a document.
    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("render error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),
}

impl AppError {
    /// The message shown to callers. Diagnostics never leak into responses.
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::Input(_) => INPUT_ERROR_MESSAGE,
            _ => DEPENDENCY_ERROR_MESSAGE,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
