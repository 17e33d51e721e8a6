//! Configuration management for wistia-extract.
//!
//! Layering, lowest to highest precedence:
//! 1. config file (TOML, YAML or JSON, discovered via `prefer` or given with `--config`)
//! 2. `WISTIA_EXTRACT_*` environment variables (a `.env` file is loaded first)
//! 3. CLI flags
//!
//! Credentials for the proxy and unlocker strategies have no built-in
//! defaults. Selecting one of those strategies without its credentials is a
//! startup error.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{Authenticator, LoginForm};
use crate::error::ExtractError;
use crate::extract::Extractor;
use crate::fetch::{FetchStrategy, PageFetcher, TlsVersion, DEFAULT_TIMEOUT, DESKTOP_USER_AGENT};
use crate::pipeline::Pipeline;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "WISTIA_EXTRACT_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("{key} is required for the {strategy} fetch strategy (set {env})")]
    Missing {
        strategy: &'static str,
        key: &'static str,
        env: String,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Fetch strategy selector as written in config files and on the CLI.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Direct,
    Proxy,
    Unlocker,
    Impersonate,
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Ok(StrategyKind::Direct),
            "proxy" | "forward-proxy" => Ok(StrategyKind::Proxy),
            "unlocker" => Ok(StrategyKind::Unlocker),
            "impersonate" | "fingerprint" => Ok(StrategyKind::Impersonate),
            other => Err(format!("unknown fetch strategy: {}", other)),
        }
    }
}

/// Unlocking API settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnlockerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

/// CORS response headers for the HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allow_methods")]
    pub allow_methods: Vec<String>,
    #[serde(default = "default_allow_headers")]
    pub allow_headers: Vec<String>,
}

fn default_allow_methods() -> Vec<String> {
    vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()]
}

fn default_allow_headers() -> Vec<String> {
    vec!["Content-Type".to_string()]
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_methods: default_allow_methods(),
            allow_headers: default_allow_headers(),
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Fetch strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyKind>,
    /// Forward proxy URL, credentials embedded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    /// Unlocking API settings.
    #[serde(default)]
    pub unlocker: UnlockerConfig,
    /// Pinned TLS version for the impersonate strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_version: Option<TlsVersion>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// User agent string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Login form layout.
    #[serde(default)]
    pub login: LoginForm,
    /// Reject requests that omit email/password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_credentials: Option<bool>,
    /// Enable the "token near the word wistia" fallback rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contextual_fallback: Option<bool>,
    /// CORS headers.
    #[serde(default)]
    pub cors: CorsConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Falls back to defaults when no config file is found.
    pub async fn load() -> Self {
        match prefer::load("wistia-extract").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("{}; using defaults", e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse config text in the format named by `ext`.
    pub fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "toml" => toml::from_str(contents).map_err(|e| format!("invalid TOML: {}", e)),
            "yaml" | "yml" => {
                serde_yaml::from_str(contents).map_err(|e| format!("invalid YAML: {}", e))
            }
            _ => serde_json::from_str(contents).map_err(|e| format!("invalid JSON: {}", e)),
        }
    }

    /// Apply `WISTIA_EXTRACT_*` environment variable overrides.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_env(|key| env::var(key).ok().filter(|v| !v.is_empty()))
    }

    /// Apply overrides from an arbitrary lookup (keys carry the full prefix).
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(strategy) = var("STRATEGY") {
            self.strategy = Some(strategy.parse().map_err(ConfigError::Invalid)?);
        }
        if let Some(url) = var("PROXY_URL") {
            self.proxy_url = Some(url);
        }
        if let Some(endpoint) = var("UNLOCKER_ENDPOINT") {
            self.unlocker.endpoint = Some(endpoint);
        }
        if let Some(key) = var("UNLOCKER_API_KEY") {
            self.unlocker.api_key = Some(key);
        }
        if let Some(zone) = var("UNLOCKER_ZONE") {
            self.unlocker.zone = Some(zone);
        }
        if let Some(version) = var("TLS_VERSION") {
            self.tls_version = Some(version.parse().map_err(ConfigError::Invalid)?);
        }
        if let Some(timeout) = var("REQUEST_TIMEOUT") {
            let secs = timeout.parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!("request timeout must be seconds, got {}", timeout))
            })?;
            self.request_timeout = Some(secs);
        }
        if let Some(ua) = var("USER_AGENT") {
            self.user_agent = Some(ua);
        }
        if let Some(url) = var("LOGIN_URL") {
            self.login.url = Some(url);
        }
        if let Some(flag) = var("REQUIRE_CREDENTIALS") {
            self.require_credentials = Some(parse_flag(&flag)?);
        }
        if let Some(flag) = var("CONTEXTUAL_FALLBACK") {
            self.contextual_fallback = Some(parse_flag(&flag)?);
        }

        Ok(self)
    }

    /// Validate and resolve into runtime settings.
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        let kind = self.strategy.unwrap_or_default();
        let strategy = match kind {
            StrategyKind::Direct => FetchStrategy::Direct,
            StrategyKind::Proxy => FetchStrategy::ForwardProxy {
                proxy_url: required(self.proxy_url, "proxy", "proxy_url", "PROXY_URL")?,
            },
            StrategyKind::Unlocker => FetchStrategy::Unlocker {
                endpoint: required(
                    self.unlocker.endpoint,
                    "unlocker",
                    "unlocker.endpoint",
                    "UNLOCKER_ENDPOINT",
                )?,
                api_key: required(
                    self.unlocker.api_key,
                    "unlocker",
                    "unlocker.api_key",
                    "UNLOCKER_API_KEY",
                )?,
                zone: required(self.unlocker.zone, "unlocker", "unlocker.zone", "UNLOCKER_ZONE")?,
            },
            StrategyKind::Impersonate => FetchStrategy::Impersonate {
                tls_version: self.tls_version.unwrap_or_default(),
            },
        };

        let request_timeout = match self.request_timeout {
            Some(0) => {
                return Err(ConfigError::Invalid(
                    "request timeout must be at least 1 second".to_string(),
                ))
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_TIMEOUT,
        };

        if self.login.scope.trim().is_empty() || self.login.token_field.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "login.scope and login.token_field must not be empty".to_string(),
            ));
        }

        Ok(Settings {
            strategy,
            request_timeout,
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DESKTOP_USER_AGENT.to_string()),
            login: self.login,
            require_credentials: self.require_credentials.unwrap_or(false),
            contextual_fallback: self.contextual_fallback.unwrap_or(true),
            cors: self.cors,
        })
    }
}

fn required(
    value: Option<String>,
    strategy: &'static str,
    key: &'static str,
    env_suffix: &str,
) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::Missing {
            strategy,
            key,
            env: format!("{}{}", ENV_PREFIX, env_suffix),
        })
}

fn parse_flag(value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid(format!("expected a boolean, got {}", other))),
    }
}

/// Validated runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub strategy: FetchStrategy,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub login: LoginForm,
    pub require_credentials: bool,
    pub contextual_fallback: bool,
    pub cors: CorsConfig,
}

impl Settings {
    /// Build the extraction pipeline these settings describe.
    pub fn build_pipeline(&self) -> Result<Pipeline, ExtractError> {
        let fetcher = PageFetcher::new(
            self.strategy.clone(),
            self.request_timeout,
            &self.user_agent,
        )?;
        Ok(Pipeline::new(
            fetcher,
            Authenticator::new(self.login.clone()),
            Extractor::new(self.contextual_fallback),
        ))
    }
}
