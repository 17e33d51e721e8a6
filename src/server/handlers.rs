//! HTTP handlers for the extraction endpoint.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error, warn};

use super::AppState;
use crate::config::CorsConfig;
use crate::error::ExtractError;
use crate::pipeline::ExtractRequest;

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// `POST` a `{url, email?, password?}` body, get `{success, wistiaId, message}`.
///
/// `OPTIONS` always answers 200 with CORS headers and no body; every other
/// method is 405. Validation happens before any network call.
pub async fn extract_wistia_id(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return preflight(&state.cors);
    }
    if method != Method::POST {
        return error_response(&ExtractError::MethodNotAllowed);
    }

    // Unparseable bodies are treated as empty ones.
    let request: ExtractRequest = serde_json::from_slice(&body).unwrap_or_else(|e| {
        debug!("Ignoring unparseable request body: {}", e);
        ExtractRequest::default()
    });

    if let Err(e) = request.validate(state.require_credentials) {
        return error_response(&e);
    }

    match state.pipeline.run(&request).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Empty 200 carrying the configured CORS headers.
fn preflight(cors: &CorsConfig) -> Response {
    let mut response = Response::new(Body::empty());
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    if let Ok(methods) = HeaderValue::from_str(&cors.allow_methods.join(", ")) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, methods);
    }
    if let Ok(allowed) = HeaderValue::from_str(&cors.allow_headers.join(", ")) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, allowed);
    }
    response
}

/// Map an error onto its status and JSON body.
fn error_response(err: &ExtractError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if !status.is_server_error() {
        warn!("Rejected request: {}", err);
        return (status, Json(json!({ "error": err.to_string() }))).into_response();
    }

    error!("Extraction failed: {}", err);
    let mut body = json!({
        "error": "Internal server error",
        "message": err.to_string(),
        "success": false,
    });
    match err {
        ExtractError::Unlocker { status, body: upstream } => {
            body["details"] = json!({ "status": status, "body": upstream });
        }
        ExtractError::TargetStatus { status, url } => {
            body["details"] = json!({ "status": status, "url": url });
        }
        ExtractError::LoginPage(status) => {
            body["details"] = json!({ "status": status });
        }
        _ => {}
    }
    (status, Json(body)).into_response()
}
