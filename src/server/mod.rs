//! HTTP endpoint for Wistia ID extraction.
//!
//! Stateless: each request builds nothing new and shares the pipeline (and
//! its pooled HTTP clients) through `AppState`.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::{CorsConfig, Settings};
use crate::pipeline::Pipeline;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub require_credentials: bool,
    pub cors: Arc<CorsConfig>,
}

impl AppState {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self::with_pipeline(settings.build_pipeline()?, settings))
    }

    /// State around an already-built pipeline.
    pub fn with_pipeline(pipeline: Pipeline, settings: &Settings) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            require_credentials: settings.require_credentials,
            cors: Arc::new(settings.cors.clone()),
        }
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings)?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!(
        "Starting server at http://{} ({} strategy)",
        addr,
        settings.strategy
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
