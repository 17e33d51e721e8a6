//! Error types for the extraction pipeline.

use thiserror::Error;

use crate::config::ConfigError;

/// Every way a single extraction can fail.
///
/// A page that simply has no Wistia markers is not an error; that outcome is
/// an [`ExtractionResult`](crate::pipeline::ExtractionResult) with
/// `success: false`.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{0}")]
    Validation(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Request to {url} timed out")]
    Timeout { url: String },
    #[error("Unlocker API returned status {status}")]
    Unlocker { status: u16, body: String },
    #[error("Failed to load login page: status {0}")]
    LoginPage(u16),
    #[error("Target page {url} returned status {status}")]
    TargetStatus { status: u16, url: String },
    #[error("TLS setup failed: {0}")]
    Tls(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ExtractError {
    /// Wrap a reqwest error, promoting timeouts to [`ExtractError::Timeout`].
    pub fn from_request(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            ExtractError::Timeout {
                url: url.to_string(),
            }
        } else {
            ExtractError::Http(err)
        }
    }

    /// HTTP status this error maps to at the dispatcher.
    pub fn status_code(&self) -> u16 {
        match self {
            ExtractError::Validation(_) => 400,
            ExtractError::Authentication(_) => 401,
            ExtractError::MethodNotAllowed => 405,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
