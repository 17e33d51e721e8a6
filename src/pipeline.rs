//! One extraction request, end to end.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::auth::Authenticator;
use crate::error::{ExtractError, Result};
use crate::extract::{wistia_id_from_url, Extractor};
use crate::fetch::{FetchRequest, PageFetcher};

/// Incoming request body.
#[derive(Clone, Default, Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Credentials once validated.
#[derive(Clone, Copy)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

impl ExtractRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, email: impl Into<String>, password: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self.password = Some(password.into());
        self
    }

    /// The target URL, if present and non-blank.
    pub fn target_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    /// Email and password, present together or not at all.
    pub fn credentials(&self) -> Option<Credentials<'_>> {
        let email = self.email.as_deref().filter(|e| !e.is_empty())?;
        let password = self.password.as_deref().filter(|p| !p.is_empty())?;
        Some(Credentials { email, password })
    }

    /// Check required fields. Runs before any network activity.
    pub fn validate(&self, require_credentials: bool) -> Result<()> {
        if self.target_url().is_none() {
            return Err(ExtractError::Validation("URL is required".to_string()));
        }

        let has_email = self.email.as_deref().is_some_and(|e| !e.is_empty());
        let has_password = self.password.as_deref().is_some_and(|p| !p.is_empty());
        match (has_email, has_password) {
            (true, true) => Ok(()),
            (false, false) if !require_credentials => Ok(()),
            (false, false) => Err(ExtractError::Validation(
                "URL, email, and password are required".to_string(),
            )),
            _ => Err(ExtractError::Validation(
                "Email and password must be provided together".to_string(),
            )),
        }
    }
}

// Passwords never reach logs.
impl std::fmt::Debug for ExtractRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractRequest")
            .field("url", &self.url)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl std::fmt::Debug for Credentials<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credentials {{ email: {}, password: <redacted> }}", self.email)
    }
}

/// Where a found ID came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdSource {
    Url,
    Page,
}

/// Response body for a completed extraction, found or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    pub success: bool,
    #[serde(rename = "wistiaId")]
    pub wistia_id: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<IdSource>,
}

impl ExtractionResult {
    pub fn found(id: String, source: IdSource) -> Self {
        Self {
            success: true,
            message: format!("Wistia ID found: {}", id),
            wistia_id: Some(id),
            source: Some(source),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            success: false,
            wistia_id: None,
            message: message.into(),
            source: None,
        }
    }
}

pub const NOT_FOUND_MESSAGE: &str = "No Wistia video ID found on the page";
pub const LOGIN_REQUIRED_MESSAGE: &str =
    "No Wistia video ID found. The page appears to require login; provide email and password or check the credentials";

/// URL scan, optional login, page fetch, HTML extraction.
#[derive(Clone)]
pub struct Pipeline {
    fetcher: PageFetcher,
    authenticator: Authenticator,
    extractor: Extractor,
}

impl Pipeline {
    pub fn new(fetcher: PageFetcher, authenticator: Authenticator, extractor: Extractor) -> Self {
        Self {
            fetcher,
            authenticator,
            extractor,
        }
    }

    pub fn fetcher(&self) -> &PageFetcher {
        &self.fetcher
    }

    /// Run one request. The caller is expected to have validated it.
    pub async fn run(&self, request: &ExtractRequest) -> Result<ExtractionResult> {
        let url = request
            .target_url()
            .ok_or_else(|| ExtractError::Validation("URL is required".to_string()))?;
        info!("Processing URL: {}", url);

        if let Some(id) = wistia_id_from_url(url) {
            info!("Found Wistia ID in URL: {}", id);
            return Ok(ExtractionResult::found(id, IdSource::Url));
        }

        let cookies = match request.credentials() {
            Some(creds) => {
                let jar = self
                    .authenticator
                    .login(&self.fetcher, url, creds.email, creds.password)
                    .await?;
                let target = Url::parse(url)
                    .map_err(|e| ExtractError::Validation(format!("Invalid URL: {}", e)))?;
                jar.header_for(&target)
            }
            None => String::new(),
        };

        let page = self
            .fetcher
            .fetch(FetchRequest::get(url).with_cookies(&cookies))
            .await?;
        if !page.is_success() {
            warn!("Target page {} returned status {}", url, page.status);
            return Err(ExtractError::TargetStatus {
                status: page.status,
                url: url.to_string(),
            });
        }

        if let Some(found) = self.extractor.extract(&page.body) {
            info!("Found Wistia ID {} via {} rule", found.id, found.rule.as_str());
            return Ok(ExtractionResult::found(found.id, IdSource::Page));
        }

        if page.body.to_lowercase().contains("login") {
            info!("No Wistia ID on {}, page mentions login", url);
            Ok(ExtractionResult::not_found(LOGIN_REQUIRED_MESSAGE))
        } else {
            info!("No Wistia ID on {}", url);
            Ok(ExtractionResult::not_found(NOT_FOUND_MESSAGE))
        }
    }
}
