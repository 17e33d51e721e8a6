//! Site login: token scraping, credential POST and cookie threading.
//!
//! The flow is strictly linear:
//! 1. GET the login page (must be 200)
//! 2. scrape the anti-forgery token (empty string if absent)
//! 3. collect the page's cookies
//! 4. POST the credentials with those cookies, without following redirects
//! 5. merge the response cookies
//! 6. decide success heuristically
//!
//! Nothing is retried.

mod cookies;
mod token;

pub use cookies::CookieJar;
pub use token::extract_authenticity_token;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ExtractError, Result};
use crate::fetch::{FetchRequest, FetchResult, PageFetcher};

/// Login form layout of the target site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginForm {
    /// Login page URL. Defaults to `<target origin>/login`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Field name prefix: `member` gives `member[email]`, `user` gives `user[email]`.
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Hidden input carrying the anti-forgery token.
    #[serde(default = "default_token_field")]
    pub token_field: String,
    /// Value sent as `commit`, mimicking the submit button.
    #[serde(default = "default_submit_value")]
    pub submit_value: String,
    /// Body text that marks a rejected login.
    #[serde(default = "default_failure_phrases")]
    pub failure_phrases: Vec<String>,
}

fn default_scope() -> String {
    "member".to_string()
}

fn default_token_field() -> String {
    "authenticity_token".to_string()
}

fn default_submit_value() -> String {
    "Sign In".to_string()
}

fn default_failure_phrases() -> Vec<String> {
    vec![
        "Sign in to your account".to_string(),
        "Invalid email or password".to_string(),
    ]
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            url: None,
            scope: default_scope(),
            token_field: default_token_field(),
            submit_value: default_submit_value(),
            failure_phrases: default_failure_phrases(),
        }
    }
}

/// Which heuristic accepted the login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginSignal {
    /// The POST answered with a 3xx that stays on a login page.
    Redirect,
    /// The POST landed, or redirected, off the login page.
    UrlChanged,
    /// No failure phrase in the response body.
    NoFailurePhrase,
}

impl LoginForm {
    /// Resolve the login page for a target URL.
    pub fn login_url(&self, target_url: &str) -> Result<String> {
        if let Some(ref url) = self.url {
            return Ok(url.clone());
        }
        let target = Url::parse(target_url)
            .map_err(|e| ExtractError::Validation(format!("Invalid URL: {}", e)))?;
        let login = target
            .join("/login")
            .map_err(|e| ExtractError::Validation(format!("Invalid URL: {}", e)))?;
        Ok(login.to_string())
    }

    /// URL-encoded credential body.
    pub fn encode(&self, email: &str, password: &str, token: &str) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair(&self.token_field, token)
            .append_pair(&format!("{}[email]", self.scope), email)
            .append_pair(&format!("{}[password]", self.scope), password)
            .append_pair("commit", &self.submit_value)
            .finish()
    }

    /// Judge the login POST response. Any one signal counts as success.
    ///
    /// The POST is sent without following redirects, so where it lands is the
    /// `Location` header resolved against the login URL, else the response URL.
    /// This is deliberately loose and can report false positives, e.g. a
    /// site that renders its error page without one of the failure phrases.
    pub fn assess(&self, login_url: &str, response: &FetchResult) -> Option<LoginSignal> {
        let landed = response
            .location()
            .and_then(|location| Url::parse(login_url).ok()?.join(location).ok())
            .map(String::from)
            .unwrap_or_else(|| response.final_url.clone());
        if !same_page(&landed, login_url) && !landed.to_lowercase().contains("login") {
            return Some(LoginSignal::UrlChanged);
        }

        if response.is_redirect() {
            return Some(LoginSignal::Redirect);
        }

        if !self
            .failure_phrases
            .iter()
            .any(|phrase| response.body.contains(phrase.as_str()))
        {
            return Some(LoginSignal::NoFailurePhrase);
        }

        None
    }
}

fn same_page(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

/// Logs into a site and returns the session cookies.
#[derive(Debug, Clone, Default)]
pub struct Authenticator {
    form: LoginForm,
}

impl Authenticator {
    pub fn new(form: LoginForm) -> Self {
        Self { form }
    }

    /// Run the login flow for `target_url`'s site.
    ///
    /// Login traffic always uses the fetcher's own transport, never an
    /// unlocking API, so the site's cookies reach us.
    pub async fn login(
        &self,
        fetcher: &PageFetcher,
        target_url: &str,
        email: &str,
        password: &str,
    ) -> Result<CookieJar> {
        let login_url = self.form.login_url(target_url)?;
        let login = Url::parse(&login_url)
            .map_err(|e| ExtractError::Validation(format!("Invalid URL: {}", e)))?;
        info!("Logging in at {}", login_url);

        let page = fetcher
            .fetch_transport(FetchRequest::get(login_url.as_str()))
            .await?;
        if page.status != 200 {
            warn!("Login page {} returned status {}", login_url, page.status);
            return Err(ExtractError::LoginPage(page.status));
        }

        let token =
            extract_authenticity_token(&page.body, &self.form.token_field).unwrap_or_default();
        if token.is_empty() {
            debug!("No authenticity token on login page, submitting an empty one");
        }

        let jar = CookieJar::new();
        let stored = jar.store(&login, page.set_cookies());
        debug!("Login page set {} cookies", stored);

        let body = self.form.encode(email, password, &token);
        let response = fetcher
            .fetch_transport(
                FetchRequest::post_form(login_url.as_str(), body)
                    .with_cookies(&jar.header_for(&login))
                    .without_redirects(),
            )
            .await?;

        let stored = jar.store(&login, response.set_cookies());
        debug!("Login response set {} cookies", stored);

        match self.form.assess(&login_url, &response) {
            Some(signal) => {
                info!("Login accepted ({:?})", signal);
                Ok(jar)
            }
            None => {
                warn!("Login rejected at {} (status {})", login_url, response.status);
                Err(ExtractError::Authentication(
                    "Invalid email or password".to_string(),
                ))
            }
        }
    }
}
