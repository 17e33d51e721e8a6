//! End-to-end pipeline tests against an in-process site.

mod common;

use std::time::Duration;

use common::*;
use wistia_extract::fetch::{FetchStrategy, TlsVersion};
use wistia_extract::pipeline::{IdSource, LOGIN_REQUIRED_MESSAGE, NOT_FOUND_MESSAGE};
use wistia_extract::{ExtractError, ExtractRequest};

#[tokio::test]
async fn test_embed_url_skips_network() {
    let site = spawn_site().await;
    // Unroutable proxy: any network attempt would fail.
    let pipeline = pipeline(FetchStrategy::ForwardProxy {
        proxy_url: "http://127.0.0.1:9".to_string(),
    });

    let result = pipeline
        .run(&ExtractRequest::new(
            "https://fast.wistia.net/embed/iframe/ab12cd34ef?videoFoam=true",
        ))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.wistia_id.as_deref(), Some("ab12cd34ef"));
    assert_eq!(result.source, Some(IdSource::Url));
    assert_eq!(site.state.lesson_hits(), 0);
}

#[tokio::test]
async fn test_public_page_without_login() {
    let site = spawn_site().await;
    let result = pipeline(FetchStrategy::Direct)
        .run(&ExtractRequest::new(site.url("/public")))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.wistia_id.as_deref(), Some(PUBLIC_ID));
    assert_eq!(result.source, Some(IdSource::Page));
    assert_eq!(site.state.login_posts(), 0);
}

#[tokio::test]
async fn test_login_then_extract() {
    let site = spawn_site().await;
    let request = ExtractRequest::new(site.url("/lessons/1")).with_credentials(EMAIL, PASSWORD);

    let result = pipeline(FetchStrategy::Direct).run(&request).await.unwrap();

    assert!(result.success);
    assert_eq!(result.wistia_id.as_deref(), Some(LESSON_ID));
    assert_eq!(result.message, format!("Wistia ID found: {}", LESSON_ID));
    assert_eq!(site.state.login_posts(), 1);
    assert_eq!(site.state.lesson_hits(), 1);

    // Login page cookies go back with the credential POST.
    let cookie = site.state.last_login_cookie.lock().unwrap().clone();
    assert_eq!(cookie.as_deref(), Some("_site_session=anonymous"));
}

#[tokio::test]
async fn test_rejected_login_never_fetches_target() {
    let site = spawn_site().await;
    let request =
        ExtractRequest::new(site.url("/lessons/1")).with_credentials(EMAIL, "wrong password");

    let err = pipeline(FetchStrategy::Direct).run(&request).await.unwrap_err();

    assert!(matches!(err, ExtractError::Authentication(_)));
    assert_eq!(err.status_code(), 401);
    assert_eq!(site.state.login_posts(), 1);
    assert_eq!(site.state.lesson_hits(), 0);
}

#[tokio::test]
async fn test_login_wall_without_credentials() {
    let site = spawn_site().await;
    let result = pipeline(FetchStrategy::Direct)
        .run(&ExtractRequest::new(site.url("/lessons/1")))
        .await
        .unwrap();

    // Redirected to the login page, which has no markers.
    assert!(!result.success);
    assert!(result.wistia_id.is_none());
    assert_eq!(result.message, LOGIN_REQUIRED_MESSAGE);
}

#[tokio::test]
async fn test_page_mentioning_login() {
    let site = spawn_site().await;
    let result = pipeline(FetchStrategy::Direct)
        .run(&ExtractRequest::new(site.url("/members-only")))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.message, LOGIN_REQUIRED_MESSAGE);
}

#[tokio::test]
async fn test_page_without_markers() {
    let site = spawn_site().await;
    let result = pipeline(FetchStrategy::Direct)
        .run(&ExtractRequest::new(site.url("/plain")))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.message, NOT_FOUND_MESSAGE);
}

#[tokio::test]
async fn test_target_error_status() {
    let site = spawn_site().await;
    let err = pipeline(FetchStrategy::Direct)
        .run(&ExtractRequest::new(site.url("/gone")))
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::TargetStatus { status: 404, .. }));
    assert_eq!(err.status_code(), 500);
}

#[tokio::test]
async fn test_unlocker_fetches_target() {
    let site = spawn_site().await;
    let target = site.url("/lessons/1");
    let result = pipeline(unlocker_strategy(&site, "web_unlocker1"))
        .run(&ExtractRequest::new(target.clone()))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.wistia_id.as_deref(), Some(UNLOCKED_ID));
    assert_eq!(site.state.unlocker_calls(), 1);
    assert_eq!(site.state.lesson_hits(), 0);

    let payload = site.state.last_unlocker_payload.lock().unwrap().clone().unwrap();
    assert_eq!(payload["zone"], "web_unlocker1");
    assert_eq!(payload["url"], target.as_str());
    assert_eq!(payload["format"], "raw");
    assert!(payload.get("headers").is_none());
}

#[tokio::test]
async fn test_unlocker_forwards_session_cookies() {
    let site = spawn_site().await;
    let request = ExtractRequest::new(site.url("/lessons/1")).with_credentials(EMAIL, PASSWORD);

    let result = pipeline(unlocker_strategy(&site, "web_unlocker1"))
        .run(&request)
        .await
        .unwrap();

    assert!(result.success);
    // Login went over the direct transport, the page through the unlocker.
    assert_eq!(site.state.login_posts(), 1);
    assert_eq!(site.state.unlocker_calls(), 1);

    let payload = site.state.last_unlocker_payload.lock().unwrap().clone().unwrap();
    let cookie = payload["headers"]["Cookie"].as_str().unwrap();
    assert_eq!(
        cookie_pairs(cookie),
        vec!["_site_session=member", "remember_me=1"]
    );
}

#[tokio::test]
async fn test_unlocker_error_status() {
    let site = spawn_site().await;
    let err = pipeline(unlocker_strategy(&site, "disabled_zone"))
        .run(&ExtractRequest::new(site.url("/public")))
        .await
        .unwrap_err();

    match err {
        ExtractError::Unlocker { status, ref body } => {
            assert_eq!(status, 403);
            assert_eq!(body, "zone disabled");
        }
        other => panic!("expected unlocker error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_repeated_runs_agree() {
    let site = spawn_site().await;
    let pipeline = pipeline(FetchStrategy::Direct);
    let request = ExtractRequest::new(site.url("/public"));

    let first = pipeline.run(&request).await.unwrap();
    let second = pipeline.run(&request).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_slow_target_times_out() {
    let site = spawn_site().await;
    let err = pipeline_with_timeout(FetchStrategy::Direct, Duration::from_secs(1))
        .run(&ExtractRequest::new(site.url("/slow")))
        .await
        .unwrap_err();

    match err {
        ExtractError::Timeout { ref url } => assert_eq!(url, &site.url("/slow")),
        ref other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(err.status_code(), 500);
}

#[tokio::test]
async fn test_forward_proxy_carries_request() {
    // The site answers absolute-form requests too, so it doubles as the proxy.
    let site = spawn_site().await;
    let result = pipeline(FetchStrategy::ForwardProxy {
        proxy_url: format!("http://{}", site.addr),
    })
    .run(&ExtractRequest::new("http://lessons.example.test/public"))
    .await
    .unwrap();

    assert!(result.success);
    assert_eq!(result.wistia_id.as_deref(), Some(PUBLIC_ID));
}

#[tokio::test]
async fn test_unreachable_proxy_is_http_error() {
    let err = pipeline(FetchStrategy::ForwardProxy {
        proxy_url: "http://127.0.0.1:9".to_string(),
    })
    .run(&ExtractRequest::new("http://lessons.example.test/public"))
    .await
    .unwrap_err();

    assert!(matches!(err, ExtractError::Http(_)), "got {:?}", err);
    assert_eq!(err.status_code(), 500);
}

#[tokio::test]
async fn test_impersonate_sends_browser_headers() {
    let site = spawn_site().await;
    let impersonate = FetchStrategy::Impersonate {
        tls_version: TlsVersion::Tls13,
    };

    let result = pipeline(impersonate)
        .run(&ExtractRequest::new(site.url("/browser-only")))
        .await
        .unwrap();
    assert_eq!(result.wistia_id.as_deref(), Some(PUBLIC_ID));

    let err = pipeline(FetchStrategy::Direct)
        .run(&ExtractRequest::new(site.url("/browser-only")))
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::TargetStatus { status: 403, .. }));
}

#[tokio::test]
async fn test_impersonate_handshake_failure_is_http_error() {
    // Plain HTTP listener: the ClientHello gets no TLS answer.
    let site = spawn_site().await;
    let target = format!("https://{}/public", site.addr);

    let err = pipeline(FetchStrategy::Impersonate {
        tls_version: TlsVersion::Tls12,
    })
    .run(&ExtractRequest::new(target))
    .await
    .unwrap_err();

    assert!(matches!(err, ExtractError::Http(_)), "got {:?}", err);
    assert_eq!(err.status_code(), 500);
}
