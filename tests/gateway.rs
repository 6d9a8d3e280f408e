use axum::body::{Body, to_bytes};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;

use culturemap_gateway::clock::ManualClock;
use culturemap_gateway::config::Args;
use culturemap_gateway::handlers::router;
use culturemap_gateway::maintenance;
use culturemap_gateway::metrics::{CACHE_HITS, REQUEST_LATENCY};
use culturemap_gateway::models::{ApiUsage, DirectionsResponse};
use culturemap_gateway::rate_limit::Policy;
use culturemap_gateway::state::AppState;

#[derive(Clone, Default)]
struct Backend {
    place_calls: Arc<AtomicUsize>,
    login_calls: Arc<AtomicUsize>,
    directions_calls: Arc<AtomicUsize>,
    category_calls: Arc<AtomicUsize>,
    kakao_auth: Arc<Mutex<Vec<String>>>,
}

async fn login(State(backend): State<Backend>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    backend.login_calls.fetch_add(1, Ordering::SeqCst);
    if body["password"] == "correct" {
        (StatusCode::OK, Json(json!({"accessToken": "token"})))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"message": "bad credentials"})))
    }
}

async fn search(
    State(backend): State<Backend>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    backend.place_calls.fetch_add(1, Ordering::SeqCst);
    let keyword = params.get("keyword").cloned().unwrap_or_default();
    Json(json!([{"name": format!("{keyword} hall")}]))
}

async fn popular(State(backend): State<Backend>) -> Json<Value> {
    backend.place_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!([{"name": "National Museum"}, {"name": "Arts Center"}]))
}

async fn mobility(State(backend): State<Backend>) -> Json<Value> {
    backend.directions_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "routes": [{
            "summary": {"distance": 1200, "duration": 300},
            "sections": [{"roads": [{"vertexes": [126.97, 37.56, 126.98, 37.55]}]}]
        }]
    }))
}

// radius 500 has two pages of results, any other radius more than three
async fn category(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    backend.category_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        backend.kakao_auth.lock().unwrap().push(auth.to_string());
    }

    let page: u64 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let pageable: u64 = if params.get("radius").map(String::as_str) == Some("500") { 20 } else { 60 };
    let start = (page - 1) * 15;
    let end = (page * 15).min(pageable);
    let documents: Vec<Value> =
        (start..end).map(|i| json!({"place_name": format!("hall {i}"), "category_group_code": "CT1"})).collect();
    Json(json!({
        "meta": {"total_count": pageable + 5, "pageable_count": pageable, "is_end": end >= pageable},
        "documents": documents,
    }))
}

async fn spawn_backend(backend: Backend) -> String {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/places", get(search))
        .route("/api/places/popular", get(popular))
        .route("/v1/directions", get(mobility))
        .route("/category.json", get(category))
        .with_state(backend);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

struct Harness {
    app: Router,
    state: Arc<AppState>,
    clock: ManualClock,
    backend: Backend,
}

async fn harness(extra: &[&str]) -> Harness {
    let backend = Backend::default();
    let base = spawn_backend(backend.clone()).await;
    let mobility_url = format!("{base}/v1/directions");
    let mut argv = vec![
        "culturemap-gateway",
        "--kakao-mobility-url",
        mobility_url.as_str(),
        "--kakao-local-url",
        base.as_str(),
    ];
    if !extra.contains(&"--upstream") {
        argv.extend_from_slice(&["--upstream", base.as_str()]);
    }
    // keep a KAKAO_REST_API_KEY from the environment out of the tests
    if !extra.contains(&"--kakao-rest-api-key") {
        argv.extend_from_slice(&["--kakao-rest-api-key", ""]);
    }
    argv.extend_from_slice(extra);
    let args = Args::parse_from(argv);

    let clock = ManualClock::default();
    let state = Arc::new(AppState::new(&args, Arc::new(clock.clone())));
    Harness { app: router(state.clone()), state, clock, backend }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

fn login_request(ip: &str, email: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(json!({"email": email, "password": password}).to_string()))
        .unwrap()
}

fn get_request(uri: &str, user_id: Option<u64>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).header("x-forwarded-for", "203.0.113.9");
    if let Some(id) = user_id {
        builder = builder.header("x-user-id", id.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

fn directions_request(dest_lat: f64) -> Request<Body> {
    let body = json!({
        "originLat": 37.5665, "originLng": 126.9780,
        "destLat": dest_lat, "destLng": 126.9882
    });
    Request::builder()
        .method(Method::POST)
        .uri("/api/directions")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn sixth_failed_login_is_rejected_without_reaching_the_backend() {
    let h = harness(&[]).await;

    for _ in 0..5 {
        let (status, _) = send(&h.app, login_request("10.0.0.1", "kim@example.com", "wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, body) = send(&h.app, login_request("10.0.0.1", "kim@example.com", "wrong")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["message"].as_str().unwrap().contains("login_attempt"));
    assert_eq!(h.backend.login_calls.load(Ordering::SeqCst), 5);

    // another address is a different identity
    let (status, _) = send(&h.app, login_request("10.0.0.2", "kim@example.com", "wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    h.clock.advance(Duration::from_secs(300));
    let (status, _) = send(&h.app, login_request("10.0.0.1", "kim@example.com", "correct")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn successful_login_forgives_earlier_failures() {
    let h = harness(&[]).await;
    let identity = "10.0.0.3:lee@example.com";

    for _ in 0..4 {
        send(&h.app, login_request("10.0.0.3", "lee@example.com", "wrong")).await;
    }
    assert_eq!(h.state.throttle.count(Policy::LoginAttempt, identity), 4);

    let (status, body) = send(&h.app, login_request("10.0.0.3", "lee@example.com", "correct")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accessToken"], "token");
    assert_eq!(h.state.throttle.count(Policy::LoginAttempt, identity), 0);

    for _ in 0..5 {
        let (status, _) = send(&h.app, login_request("10.0.0.3", "lee@example.com", "wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn login_identity_uses_the_email_as_sent() {
    let h = harness(&[]).await;
    send(&h.app, login_request("10.0.0.5", " choi@example.com", "wrong")).await;

    assert_eq!(h.state.throttle.count(Policy::LoginAttempt, "10.0.0.5: choi@example.com"), 1);
    assert_eq!(h.state.throttle.count(Policy::LoginAttempt, "10.0.0.5:choi@example.com"), 0);
}

#[tokio::test]
async fn keyword_search_is_cached_per_user_for_ten_minutes() {
    let h = harness(&[]).await;

    let (status, first) = send(&h.app, get_request("/api/places?keyword=Museum", Some(7))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = send(&h.app, get_request("/api/places?keyword=museum", Some(7))).await;
    assert_eq!(first, second);
    assert_eq!(h.backend.place_calls.load(Ordering::SeqCst), 1);

    // other users and anonymous callers have their own results
    send(&h.app, get_request("/api/places?keyword=museum", Some(8))).await;
    send(&h.app, get_request("/api/places?keyword=museum", None)).await;
    send(&h.app, get_request("/api/places?keyword=museum", None)).await;
    assert_eq!(h.backend.place_calls.load(Ordering::SeqCst), 4);

    h.clock.advance(Duration::from_secs(601));
    send(&h.app, get_request("/api/places?keyword=museum", Some(7))).await;
    assert_eq!(h.backend.place_calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn recent_searches_can_be_listed_and_cleared() {
    let h = harness(&[]).await;
    send(&h.app, get_request("/api/places?keyword=Seoul", Some(3))).await;
    send(&h.app, get_request("/api/places?keyword=Busan", Some(3))).await;
    h.clock.advance(Duration::from_secs(601));
    send(&h.app, get_request("/api/places?keyword=seoul", Some(3))).await;

    let (_, recent) = send(&h.app, get_request("/api/places/recent-searches", Some(3))).await;
    assert_eq!(recent, json!(["seoul", "busan"]));
    let (_, anonymous) = send(&h.app, get_request("/api/places/recent-searches", None)).await;
    assert_eq!(anonymous, json!([]));

    let clear = Request::builder()
        .method(Method::DELETE)
        .uri("/api/places/recent-searches")
        .header("x-user-id", "3")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&h.app, clear).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, recent) = send(&h.app, get_request("/api/places/recent-searches", Some(3))).await;
    assert_eq!(recent, json!([]));
}

#[tokio::test]
async fn cache_hits_leave_recent_searches_alone() {
    let h = harness(&[]).await;
    for keyword in ["a", "b", "a"] {
        let (status, _) =
            send(&h.app, get_request(&format!("/api/places?keyword={keyword}"), Some(11))).await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(h.backend.place_calls.load(Ordering::SeqCst), 2);
    let (_, recent) = send(&h.app, get_request("/api/places/recent-searches", Some(11))).await;
    assert_eq!(recent, json!(["b", "a"]));
}

#[tokio::test]
async fn failed_search_is_not_recorded() {
    let h = harness(&["--upstream", "127.0.0.1:1"]).await;

    let (status, _) = send(&h.app, get_request("/api/places?keyword=zzz", Some(12))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(h.state.places.recent(12).is_empty());
    assert_eq!(h.state.cached_entries(), 0);
}

#[tokio::test]
async fn popular_places_are_cached_for_an_hour() {
    let h = harness(&[]).await;

    let (_, places) = send(&h.app, get_request("/api/places/popular", None)).await;
    assert_eq!(places.as_array().map(Vec::len), Some(2));
    h.clock.advance(Duration::from_secs(3599));
    let hits = CACHE_HITS.with_label_values(&["popular"]).get();
    let observed = REQUEST_LATENCY.get_sample_count();
    send(&h.app, get_request("/api/places/popular", None)).await;
    assert_eq!(h.backend.place_calls.load(Ordering::SeqCst), 1);
    // other tests share the registry, so only lower bounds hold
    assert!(CACHE_HITS.with_label_values(&["popular"]).get() > hits);
    assert!(REQUEST_LATENCY.get_sample_count() > observed);

    h.clock.advance(Duration::from_secs(2));
    send(&h.app, get_request("/api/places/popular", None)).await;
    assert_eq!(h.backend.place_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn nearby_search_is_throttled_before_the_disabled_check() {
    let h = harness(&[]).await;
    let uri = "/api/places/kakao/nearby?lng=126.97&lat=37.56";

    for _ in 0..30 {
        let (status, _) = send(&h.app, get_request(uri, None)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
    let (status, _) = send(&h.app, get_request(uri, None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    h.clock.advance(Duration::from_secs(60));
    let (status, _) = send(&h.app, get_request(uri, None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn nearby_search_merges_kakao_pages_and_counts_usage() {
    let h = harness(&["--kakao-rest-api-key", "test-key"]).await;

    let (status, body) =
        send(&h.app, get_request("/api/places/kakao/nearby?lng=126.97&lat=37.56", None)).await;
    assert_eq!(status, StatusCode::OK);
    // three pages at most, even though more are pageable
    assert_eq!(body["documents"].as_array().map(Vec::len), Some(45));
    assert_eq!(body["meta"], json!({"total_count": 65, "pageable_count": 60, "is_end": true}));
    assert_eq!(h.backend.category_calls.load(Ordering::SeqCst), 3);

    let (status, body) = send(
        &h.app,
        get_request("/api/places/kakao/nearby?lng=126.97&lat=37.56&radius=500", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["documents"].as_array().map(Vec::len), Some(20));
    assert_eq!(h.backend.category_calls.load(Ordering::SeqCst), 5);

    let auth = h.backend.kakao_auth.lock().unwrap().clone();
    assert_eq!(auth.len(), 5);
    assert!(auth.iter().all(|value| value == "KakaoAK test-key"));

    let (_, usage) = send(&h.app, get_request("/api/admin/api-usage", None)).await;
    let usage: ApiUsage = serde_json::from_value(usage).unwrap();
    assert_eq!((usage.search_today, usage.search_total), (2, 2));
    assert_eq!(usage.directions_total, 0);
}

#[tokio::test]
async fn directions_are_cached_and_budgeted() {
    let h = harness(&["--kakao-rest-api-key", "test-key", "--directions-per-minute", "1"]).await;

    let (status, body) = send(&h.app, directions_request(37.5512)).await;
    assert_eq!(status, StatusCode::OK);
    let first: DirectionsResponse = serde_json::from_value(body).unwrap();
    assert!(!first.from_cache);
    assert_eq!(first.path.len(), 2);

    let (_, body) = send(&h.app, directions_request(37.5512)).await;
    let second: DirectionsResponse = serde_json::from_value(body).unwrap();
    assert!(second.from_cache);
    assert_eq!(h.backend.directions_calls.load(Ordering::SeqCst), 1);

    // a new route needs the provider, and this minute's budget is spent
    let (status, _) = send(&h.app, directions_request(37.50)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    h.clock.advance(Duration::from_secs(60));
    let (status, _) = send(&h.app, directions_request(37.50)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, usage) = send(&h.app, get_request("/api/admin/api-usage", None)).await;
    let usage: ApiUsage = serde_json::from_value(usage).unwrap();
    assert_eq!((usage.directions_today, usage.directions_total), (2, 2));
    assert_eq!(usage.search_total, 0);
}

#[tokio::test]
async fn directions_without_key_are_unavailable() {
    let h = harness(&[]).await;
    let (status, body) = send(&h.app, directions_request(37.5512)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["message"].as_str().unwrap().contains("directions"));
}

#[tokio::test]
async fn sweep_clears_expired_counters_and_entries() {
    let h = harness(&[]).await;
    send(&h.app, get_request("/api/places?keyword=park", Some(1))).await;
    send(&h.app, get_request("/api/places/popular", None)).await;
    send(&h.app, login_request("10.0.0.4", "park@example.com", "wrong")).await;
    assert_eq!(maintenance::sweep(&h.state), 0);

    h.clock.advance(Duration::from_secs(601));
    // search entry and login counter are gone, popular places stay
    assert_eq!(maintenance::sweep(&h.state), 2);
    assert_eq!(h.state.cached_entries(), 1);
    assert_eq!(h.state.throttle.tracked(Policy::LoginAttempt), 0);
    assert_eq!(h.state.places.recent(1), vec!["park"]);
}

#[tokio::test]
async fn health_reports_status() {
    let h = harness(&[]).await;
    let (status, body) = send(&h.app, get_request("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}
