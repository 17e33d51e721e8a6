//! In-process stand-in for a member site and an unlocking API.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};

use wistia_extract::auth::Authenticator;
use wistia_extract::extract::Extractor;
use wistia_extract::fetch::{FetchStrategy, PageFetcher, DESKTOP_USER_AGENT};
use wistia_extract::Pipeline;

pub const EMAIL: &str = "member@example.com";
pub const PASSWORD: &str = "correct horse";
pub const TOKEN: &str = "tok/123+abc=";
pub const LESSON_ID: &str = "l3ss0n0001";
pub const PUBLIC_ID: &str = "pub1icv1d0";
pub const UNLOCKED_ID: &str = "unl0ck3d01";
pub const API_KEY: &str = "test-api-key";

/// Request counters and captured inputs.
#[derive(Clone, Default)]
pub struct SiteState {
    pub lesson_hits: Arc<AtomicUsize>,
    pub login_posts: Arc<AtomicUsize>,
    pub unlocker_calls: Arc<AtomicUsize>,
    pub last_login_cookie: Arc<Mutex<Option<String>>>,
    pub last_unlocker_payload: Arc<Mutex<Option<serde_json::Value>>>,
}

impl SiteState {
    pub fn lesson_hits(&self) -> usize {
        self.lesson_hits.load(Ordering::SeqCst)
    }

    pub fn login_posts(&self) -> usize {
        self.login_posts.load(Ordering::SeqCst)
    }

    pub fn unlocker_calls(&self) -> usize {
        self.unlocker_calls.load(Ordering::SeqCst)
    }
}

/// A running fake site.
pub struct Site {
    pub addr: SocketAddr,
    pub state: SiteState,
}

impl Site {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the fake site on an ephemeral port.
pub async fn spawn_site() -> Site {
    let state = SiteState::default();
    let app = Router::new()
        .route("/login", get(login_page).post(login_submit))
        .route("/library", get(|| async { "<h1>Your library</h1>" }))
        .route("/lessons/1", get(lesson))
        .route("/public", get(public_page))
        .route("/plain", get(|| async { "<html><body><p>Nothing here</p></body></html>" }))
        .route("/members-only", get(members_only_page))
        .route("/gone", get(|| async { StatusCode::NOT_FOUND }))
        .route("/slow", get(slow_page))
        .route("/browser-only", get(browser_only_page))
        .route("/unlocker", post(unlocker))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Site { addr, state }
}

/// Pipeline over the given strategy with default login form and rules.
pub fn pipeline(strategy: FetchStrategy) -> Pipeline {
    pipeline_with_timeout(strategy, Duration::from_secs(5))
}

pub fn pipeline_with_timeout(strategy: FetchStrategy, timeout: Duration) -> Pipeline {
    let fetcher = PageFetcher::new(strategy, timeout, DESKTOP_USER_AGENT).unwrap();
    Pipeline::new(fetcher, Authenticator::default(), Extractor::default())
}

/// Split a `Cookie` header into sorted `name=value` pairs.
pub fn cookie_pairs(header: &str) -> Vec<String> {
    let mut pairs: Vec<String> = header.split("; ").map(str::to_string).collect();
    pairs.sort();
    pairs
}

pub fn unlocker_strategy(site: &Site, zone: &str) -> FetchStrategy {
    FetchStrategy::Unlocker {
        endpoint: site.url("/unlocker"),
        api_key: API_KEY.to_string(),
        zone: zone.to_string(),
    }
}

async fn login_page() -> Response {
    let html = format!(
        r#"<html><head><meta name="csrf-token" content="meta-token"></head>
<body><h2>Sign in to your account</h2>
<form action="/login" method="post">
<input type="hidden" name="authenticity_token" value="{}">
<input name="member[email]"><input name="member[password]" type="password">
</form></body></html>"#,
        TOKEN
    );
    (
        [(header::SET_COOKIE, "_site_session=anonymous; path=/; HttpOnly")],
        html,
    )
        .into_response()
}

async fn login_submit(State(state): State<SiteState>, headers: HeaderMap, body: String) -> Response {
    state.login_posts.fetch_add(1, Ordering::SeqCst);
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *state.last_login_cookie.lock().unwrap() = cookie;

    let form: Vec<(String, String)> = url::form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect();
    let field = |name: &str| {
        form.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    };

    let accepted = field("authenticity_token") == Some(TOKEN)
        && field("member[email]") == Some(EMAIL)
        && field("member[password]") == Some(PASSWORD)
        && field("commit") == Some("Sign In");

    if accepted {
        let mut headers = HeaderMap::new();
        headers.append(
            header::SET_COOKIE,
            "_site_session=member; path=/; HttpOnly".parse().unwrap(),
        );
        headers.append(header::SET_COOKIE, "remember_me=1; path=/".parse().unwrap());
        (headers, Redirect::to("/library")).into_response()
    } else {
        (
            StatusCode::OK,
            "<h2>Sign in to your account</h2><p>Invalid email or password</p>",
        )
            .into_response()
    }
}

async fn lesson(State(state): State<SiteState>, headers: HeaderMap) -> Response {
    state.lesson_hits.fetch_add(1, Ordering::SeqCst);
    let signed_in = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|c| c.contains("_site_session=member"));

    if signed_in {
        format!(
            r#"<html><body><div class="wistia_responsive_padding">
<div class="wistia_embed wistia_async_{} videoFoam=true"></div></div></body></html>"#,
            LESSON_ID
        )
        .into_response()
    } else {
        Redirect::to("/login").into_response()
    }
}

async fn public_page() -> String {
    format!(
        r#"<html><body>
<div data-video-id="zzzzzzzzzz"></div>
<script>window._wq = window._wq || []; Wistia.embed("{}", {{ autoPlay: false }});</script>
</body></html>"#,
        PUBLIC_ID
    )
}

async fn slow_page() -> String {
    tokio::time::sleep(Duration::from_secs(5)).await;
    public_page().await
}

/// Only answers requests that carry Chrome's navigation headers.
async fn browser_only_page(headers: HeaderMap) -> Response {
    let navigating = headers
        .get("sec-fetch-mode")
        .is_some_and(|v| v == "navigate");
    if !navigating || !headers.contains_key("sec-ch-ua") {
        return (StatusCode::FORBIDDEN, "Access denied").into_response();
    }
    public_page().await.into_response()
}

async fn members_only_page() -> &'static str {
    "<html><body><p>This lesson is for members. Please login to watch.</p></body></html>"
}

async fn unlocker(
    State(state): State<SiteState>,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    state.unlocker_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_unlocker_payload.lock().unwrap() = Some(payload.clone());

    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(&format!("Bearer {}", API_KEY)[..]);
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "bad api key").into_response();
    }
    if payload["zone"] == "disabled_zone" {
        return (StatusCode::FORBIDDEN, "zone disabled").into_response();
    }

    format!(
        r#"<script>var media = {{"hashed_id": "{}", "duration": 61}};</script>"#,
        UNLOCKED_ID
    )
    .into_response()
}
