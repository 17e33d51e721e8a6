//! Router configuration for the extraction service.

use axum::{
    http::{HeaderName, Method},
    routing::{any, get},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, Any, CorsLayer};

use super::handlers;
use super::AppState;
use crate::config::CorsConfig;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors);

    Router::new()
        // Method dispatch happens in the handler so OPTIONS and 405 stay JSON-shaped
        .route("/", any(handlers::extract_wistia_id))
        .route("/api/extract-wistia-id", any(handlers::extract_wistia_id))
        .route("/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let methods: Vec<Method> = config
        .allow_methods
        .iter()
        .filter_map(|m| m.trim().parse().ok())
        .collect();
    let headers: Vec<HeaderName> = config
        .allow_headers
        .iter()
        .filter_map(|h| HeaderName::from_bytes(h.trim().as_bytes()).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(AllowMethods::list(methods))
        .allow_headers(AllowHeaders::list(headers))
}
