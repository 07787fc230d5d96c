use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use gaffer_api::query::QueryParams;
use gaffer_api::transport::{Transport, TransportConfig, USER_AGENT};
use gaffer_api::{Credential, GafferError};
use gaffer_test_support::MockUpstream;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const BACKOFF: Duration = Duration::from_millis(40);

fn transport(base_url: &str, key: &str) -> Transport {
    let mut config = TransportConfig::new(base_url, Credential::new(key));
    config.initial_backoff = BACKOFF;
    config.attempt_timeout = Duration::from_millis(500);
    Transport::new(config).expect("valid transport config")
}

#[tokio::test]
async fn retries_exhaust_after_four_attempts_with_growing_gaps() {
    let app = Router::new().route(
        "/api/v1/projects",
        get(|| async {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": {"code": "UNAVAILABLE", "message": "try later"}})),
            )
        }),
    );
    let upstream = MockUpstream::start(app).await.expect("start upstream");
    let t = transport(upstream.base_url(), "gaf_key");

    let err = t
        .execute("/projects", &QueryParams::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(err.to_string(), "try later");

    let requests = upstream.requests();
    assert_eq!(requests.len(), 4);
    let gaps: Vec<Duration> = requests
        .windows(2)
        .map(|w| w[1].at.duration_since(w[0].at))
        .collect();
    assert!(gaps[0] >= BACKOFF, "first gap {:?}", gaps[0]);
    assert!(gaps[1] >= BACKOFF * 2, "second gap {:?}", gaps[1]);
    assert!(gaps[2] >= BACKOFF * 4, "third gap {:?}", gaps[2]);
}

#[tokio::test]
async fn non_retryable_status_fails_on_first_attempt() {
    let app = Router::new().route(
        "/api/v1/projects",
        get(|| async {
            (
                StatusCode::NOT_FOUND,
                Json(json!({"error": {"message": "not found"}})),
            )
        }),
    );
    let upstream = MockUpstream::start(app).await.expect("start upstream");
    let t = transport(upstream.base_url(), "gaf_key");

    let err = t
        .execute("/projects", &QueryParams::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "not found");
    assert!(matches!(err, GafferError::Api { status: 404, .. }));
    assert_eq!(upstream.hits("/api/v1/projects"), 1);
}

#[tokio::test]
async fn error_without_envelope_gets_generic_message() {
    let app = Router::new().route(
        "/api/v1/projects",
        get(|| async { (StatusCode::FORBIDDEN, "nope") }),
    );
    let upstream = MockUpstream::start(app).await.expect("start upstream");
    let t = transport(upstream.base_url(), "gaf_key");

    let err = t
        .execute("/projects", &QueryParams::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "API request failed with status 403");
}

#[tokio::test]
async fn rate_limit_waits_for_retry_after() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let app = Router::new().route(
        "/api/v1/projects",
        get(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    let mut headers = HeaderMap::new();
                    headers.insert("retry-after", "1".parse().expect("header value"));
                    (StatusCode::TOO_MANY_REQUESTS, headers, Json(json!({}))).into_response()
                } else {
                    Json(json!({"ok": true})).into_response()
                }
            }
        }),
    );
    let upstream = MockUpstream::start(app).await.expect("start upstream");
    let t = transport(upstream.base_url(), "gaf_key");

    let body = t
        .execute("/projects", &QueryParams::new())
        .await
        .expect("second attempt succeeds");
    assert_eq!(body, json!({"ok": true}));

    let requests = upstream.requests();
    assert_eq!(requests.len(), 2);
    let gap = requests[1].at.duration_since(requests[0].at);
    assert!(gap >= Duration::from_secs(1), "gap {gap:?}");
}

#[tokio::test]
async fn timed_out_attempt_is_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let app = Router::new().route(
        "/api/v1/projects",
        get(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Json(json!({"attempt": "fast"}))
            }
        }),
    );
    let upstream = MockUpstream::start(app).await.expect("start upstream");
    let t = transport(upstream.base_url(), "gaf_key");

    let body = t
        .execute("/projects", &QueryParams::new())
        .await
        .expect("retry after timeout succeeds");
    assert_eq!(body, json!({"attempt": "fast"}));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn timeout_on_every_attempt_surfaces_timeout_message() {
    let app = Router::new().route(
        "/api/v1/projects",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({}))
        }),
    );
    let upstream = MockUpstream::start(app).await.expect("start upstream");
    let mut config = TransportConfig::new(upstream.base_url(), Credential::new("gaf_key"));
    config.initial_backoff = Duration::from_millis(5);
    config.attempt_timeout = Duration::from_millis(100);
    let t = Transport::new(config).expect("valid transport config");

    let err = t
        .execute("/projects", &QueryParams::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GafferError::Timeout { .. }));
    assert_eq!(err.to_string(), "Request timed out after 100ms");
    assert_eq!(upstream.hits("/api/v1/projects"), 4);
}

#[tokio::test]
async fn connection_failure_is_retried_then_reported() {
    // Bind then drop to get a port nobody listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    drop(listener);

    let mut config = TransportConfig::new(format!("http://{addr}"), Credential::new("gaf_key"));
    config.initial_backoff = Duration::from_millis(5);
    let t = Transport::new(config).expect("valid transport config");

    let started = std::time::Instant::now();
    let err = t
        .execute("/projects", &QueryParams::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GafferError::Transport(_)), "{err:?}");
    assert!(err.to_string().starts_with("Network error:"));
    // 5 + 10 + 20 ms of backoff across three retries.
    assert!(started.elapsed() >= Duration::from_millis(35));
}

#[tokio::test]
async fn non_json_success_body_is_not_retried() {
    let app = Router::new().route("/api/v1/projects", get(|| async { "<html>oops</html>" }));
    let upstream = MockUpstream::start(app).await.expect("start upstream");
    let t = transport(upstream.base_url(), "gaf_key");

    let err = t
        .execute("/projects", &QueryParams::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GafferError::Decode(_)));
    assert_eq!(upstream.hits("/api/v1/projects"), 1);
}

#[tokio::test]
async fn request_carries_credential_accept_and_user_agent() {
    let app = Router::new().route(
        "/api/v1/projects",
        get(|| async { Json(json!({"projects": []})) }),
    );
    let upstream = MockUpstream::start(app).await.expect("start upstream");
    let t = transport(&format!("{}/", upstream.base_url()), "gaf_secret");

    let query = QueryParams::new()
        .with("limit", 5)
        .with_opt("organizationId", None::<&str>)
        .with_opt("branch", Some("feature/x y"));
    let body: Value = t.get("/projects", &query).await.expect("success");
    assert_eq!(body, json!({"projects": []}));

    let requests = upstream.requests();
    let req = &requests[0];
    assert_eq!(req.method, "GET");
    assert_eq!(req.path, "/api/v1/projects");
    assert_eq!(req.query.as_deref(), Some("limit=5&branch=feature%2Fx%20y"));
    assert_eq!(req.header("x-api-key"), Some("gaf_secret"));
    assert_eq!(req.header("accept"), Some("application/json"));
    assert_eq!(req.header("user-agent"), Some(USER_AGENT));
}

#[tokio::test]
async fn unauthorized_is_retried_like_other_transient_statuses() {
    let app = Router::new().route(
        "/api/v1/projects",
        get(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": {"code": "UNAUTHORIZED", "message": "Invalid API key"}})),
            )
        }),
    );
    let upstream = MockUpstream::start(app).await.expect("start upstream");
    let mut config = TransportConfig::new(upstream.base_url(), Credential::new("gaf_key"));
    config.initial_backoff = Duration::from_millis(5);
    let t = Transport::new(config).expect("valid transport config");

    let err = t
        .execute("/projects", &QueryParams::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid API key");
    assert_eq!(upstream.hits("/api/v1/projects"), 4);
}
