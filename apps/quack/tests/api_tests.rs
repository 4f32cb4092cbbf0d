//! Integration tests for the Quack HTTP API.
//!
//! Uses axum-test to drive the router without binding a real socket.

// Tests hold AUTH_TEST_MUTEX across awaits so env-var changes never overlap.
#![allow(clippy::unwrap_used, clippy::panic, clippy::await_holding_lock)]

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use chrono::{Duration, TimeZone, Utc};
use quack::api::{AppState, ErrorResponse, HealthResponse, LikeResponse, create_router};
use quack_core::{ManualClock, Network, Role, UserProfile};
use serde_json::{Value, json};
use std::sync::Mutex;

/// Serializes every test, since the router reads its security knobs from env vars.
static AUTH_TEST_MUTEX: Mutex<()> = Mutex::new(());

const ENV_VARS: [&str; 3] = ["QUACK_API_KEY", "QUACK_RATE_LIMIT", "QUACK_CORS_ORIGINS"];

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Holds the mutex and clears the env vars on drop.
struct TestGuard {
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        clear_env();
    }
}

fn clear_env() {
    for var in ENV_VARS {
        // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
        unsafe { std::env::remove_var(var) };
    }
}

fn lock() -> TestGuard {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();
    TestGuard { _guard: guard }
}

fn server_for(network: Network) -> TestServer {
    TestServer::new(create_router(AppState::new(network))).unwrap()
}

/// A fresh in-memory network.
fn create_test_server() -> (TestServer, TestGuard) {
    let guard = lock();
    (server_for(Network::new()), guard)
}

/// alice and bob registered, bob has uploaded `bob_1`.
async fn create_populated_test_server() -> (TestServer, TestGuard) {
    let (server, guard) = create_test_server();
    register(&server, "alice").await;
    register(&server, "bob").await;
    server
        .post("/posts")
        .json(&json!({"owner": "bob", "image_path": "img/bob_1.png", "caption": "pond day"}))
        .await
        .assert_status(StatusCode::CREATED);
    (server, guard)
}

async fn register(server: &TestServer, username: &str) {
    server
        .post("/users")
        .json(&json!({"username": username, "password": "pw"}))
        .await
        .assert_status(StatusCode::CREATED);
}

fn assert_error(response: &axum_test::TestResponse, status: StatusCode, kind: &str) {
    response.assert_status(status);
    let body: ErrorResponse = response.json();
    assert_eq!(body.kind, kind);
    assert!(!body.error.is_empty());
}

// =============================================================================
// HEALTH / STATUS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _guard) = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_status_counts_relations() {
    let (server, _guard) = create_populated_test_server().await;

    let status: Value = server.get("/status").await.json();
    assert_eq!(status["backend"], "memory");
    assert_eq!(status["users"], 2);
    assert_eq!(status["posts"], 1);
    assert_eq!(status["likes"], 0);
}

// =============================================================================
// ACCOUNTS
// =============================================================================

#[tokio::test]
async fn test_register_returns_profile() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/users")
        .json(&json!({"username": "alice", "password": "pw", "bio": "quack", "role": "Admin"}))
        .await;

    response.assert_status(StatusCode::CREATED);
    let profile: UserProfile = response.json();
    assert_eq!(profile.username.as_str(), "alice");
    assert_eq!(profile.bio, "quack");
    assert_eq!(profile.posts_count, 0);
    assert!(response.text().find("pw").is_none());
}

#[tokio::test]
async fn test_register_accepts_lowercase_role() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/users")
        .json(&json!({"username": "root", "password": "pw", "role": "admin"}))
        .await;

    response.assert_status(StatusCode::CREATED);
    let profile: UserProfile = response.json();
    assert_eq!(profile.role, Role::Admin);
}

#[tokio::test]
async fn test_register_duplicate_is_conflict() {
    let (server, _guard) = create_test_server();
    register(&server, "alice").await;

    let response = server
        .post("/users")
        .json(&json!({"username": "alice", "password": "other"}))
        .await;

    assert_error(&response, StatusCode::CONFLICT, "conflict");
}

#[tokio::test]
async fn test_register_empty_username_is_bad_request() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/users")
        .json(&json!({"username": "", "password": "pw"}))
        .await;

    assert_error(&response, StatusCode::BAD_REQUEST, "validation_failed");
}

#[tokio::test]
async fn test_unknown_profile_is_not_found() {
    let (server, _guard) = create_test_server();

    let response = server.get("/users/ghost").await;

    assert_error(&response, StatusCode::NOT_FOUND, "not_found");
}

#[tokio::test]
async fn test_update_bio() {
    let (server, _guard) = create_populated_test_server().await;

    let response = server
        .put("/users/alice/bio")
        .json(&json!({"bio": "likes bread"}))
        .await;

    response.assert_status_ok();
    let profile: UserProfile = response.json();
    assert_eq!(profile.bio, "likes bread");
}

#[tokio::test]
async fn test_login() {
    let (server, _guard) = create_populated_test_server().await;

    let ok = server
        .post("/login")
        .json(&json!({"username": "alice", "password": "pw"}))
        .await;
    ok.assert_status_ok();
    assert_eq!(ok.json::<Value>()["authenticated"], true);

    let wrong = server
        .post("/login")
        .json(&json!({"username": "alice", "password": "nope"}))
        .await;
    wrong.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json::<Value>()["authenticated"], false);

    let ghost = server
        .post("/login")
        .json(&json!({"username": "ghost", "password": "pw"}))
        .await;
    ghost.assert_status(StatusCode::UNAUTHORIZED);
}

// =============================================================================
// FOLLOWS
// =============================================================================

#[tokio::test]
async fn test_follow_rules() {
    let (server, _guard) = create_populated_test_server().await;
    let edge = json!({"follower": "alice", "followed": "bob"});

    server
        .post("/follow")
        .json(&edge)
        .await
        .assert_status(StatusCode::CREATED);

    let again = server.post("/follow").json(&edge).await;
    assert_error(&again, StatusCode::CONFLICT, "conflict");

    let self_follow = server
        .post("/follow")
        .json(&json!({"follower": "alice", "followed": "alice"}))
        .await;
    assert_error(&self_follow, StatusCode::CONFLICT, "conflict");

    let unknown = server
        .post("/follow")
        .json(&json!({"follower": "alice", "followed": "ghost"}))
        .await;
    assert_error(&unknown, StatusCode::NOT_FOUND, "not_found");

    let followers: Vec<String> = server.get("/users/bob/followers").await.json();
    assert_eq!(followers, vec!["alice"]);
    let following: Vec<String> = server.get("/users/alice/following").await.json();
    assert_eq!(following, vec!["bob"]);
}

#[tokio::test]
async fn test_followers_of_unknown_user_is_not_found() {
    let (server, _guard) = create_test_server();

    let response = server.get("/users/ghost/followers").await;

    assert_error(&response, StatusCode::NOT_FOUND, "not_found");
}

// =============================================================================
// CONTENT
// =============================================================================

#[tokio::test]
async fn test_create_post_assigns_sequential_ids() {
    let (server, _guard) = create_populated_test_server().await;

    let second: Value = server
        .post("/posts")
        .json(&json!({"owner": "bob", "image_path": "img/bob_2.png"}))
        .await
        .json();
    assert_eq!(second["id"], "bob_2");
    assert_eq!(second["caption"], "");

    let posts: Vec<Value> = server.get("/users/bob/posts").await.json();
    let ids: Vec<&str> = posts.iter().filter_map(|p| p["id"].as_str()).collect();
    assert_eq!(ids, vec!["bob_2", "bob_1"]);
}

#[tokio::test]
async fn test_create_post_for_unknown_owner_is_not_found() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/posts")
        .json(&json!({"owner": "ghost", "image_path": "x.png"}))
        .await;

    assert_error(&response, StatusCode::NOT_FOUND, "not_found");
}

#[tokio::test]
async fn test_post_detail_and_caption() {
    let (server, _guard) = create_populated_test_server().await;

    let updated: Value = server
        .put("/posts/bob_1/caption")
        .json(&json!({"caption": "new caption"}))
        .await
        .json();
    assert_eq!(updated["caption"], "new caption");

    let detail: Value = server.get("/posts/bob_1").await.json();
    assert_eq!(detail["post"]["id"], "bob_1");
    assert_eq!(detail["post"]["caption"], "new caption");
    assert_eq!(detail["like_count"], 0);
    assert_eq!(detail["comments"], json!([]));
}

#[tokio::test]
async fn test_malformed_post_id_is_bad_request() {
    let (server, _guard) = create_populated_test_server().await;

    let response = server.get("/posts/not-a-post-id").await;

    assert_error(&response, StatusCode::BAD_REQUEST, "validation_failed");
}

#[tokio::test]
async fn test_unknown_post_is_not_found() {
    let (server, _guard) = create_populated_test_server().await;

    let response = server
        .post("/posts/bob_9/like")
        .json(&json!({"username": "alice"}))
        .await;

    assert_error(&response, StatusCode::NOT_FOUND, "not_found");
}

// =============================================================================
// ENGAGEMENT
// =============================================================================

#[tokio::test]
async fn test_like_toggles() {
    let (server, _guard) = create_populated_test_server().await;
    let body = json!({"username": "alice"});

    let first: LikeResponse = server.post("/posts/bob_1/like").json(&body).await.json();
    assert!(first.liked);
    assert_eq!(first.like_count, 1);
    assert_eq!(first.post_id.to_string(), "bob_1");

    let second: LikeResponse = server.post("/posts/bob_1/like").json(&body).await.json();
    assert!(!second.liked);
    assert_eq!(second.like_count, 0);
}

#[tokio::test]
async fn test_comment() {
    let (server, _guard) = create_populated_test_server().await;

    let response = server
        .post("/posts/bob_1/comments")
        .json(&json!({"username": "alice", "text": "nice pond"}))
        .await;
    response.assert_status(StatusCode::CREATED);
    let comment: Value = response.json();
    assert_eq!(comment["post"], "bob_1");
    assert_eq!(comment["username"], "alice");

    let empty = server
        .post("/posts/bob_1/comments")
        .json(&json!({"username": "alice", "text": "   "}))
        .await;
    assert_error(&empty, StatusCode::BAD_REQUEST, "validation_failed");

    let detail: Value = server.get("/posts/bob_1").await.json();
    assert_eq!(detail["comments"].as_array().map(Vec::len), Some(1));
    assert_eq!(detail["comments"][0]["text"], "nice pond");
}

#[tokio::test]
async fn test_engagement_notifies_owner_but_not_self() {
    let (server, _guard) = create_populated_test_server().await;

    server
        .post("/follow")
        .json(&json!({"follower": "alice", "followed": "bob"}))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/posts/bob_1/like")
        .json(&json!({"username": "alice"}))
        .await
        .assert_status_ok();

    let notifications: Vec<Value> = server.get("/users/bob/notifications").await.json();
    let messages: Vec<&str> = notifications
        .iter()
        .filter_map(|n| n["message"].as_str())
        .collect();
    assert_eq!(
        messages,
        vec![
            "alice liked your picture - just now",
            "alice started following you - just now",
        ]
    );

    let own_like: LikeResponse = server
        .post("/posts/bob_1/like")
        .json(&json!({"username": "bob"}))
        .await
        .json();
    assert_eq!(own_like.like_count, 2);
    server
        .post("/posts/bob_1/comments")
        .json(&json!({"username": "bob", "text": "thanks"}))
        .await
        .assert_status(StatusCode::CREATED);

    let after: Vec<Value> = server.get("/users/bob/notifications").await.json();
    assert_eq!(after.len(), 2);
}

#[tokio::test]
async fn test_notification_age_follows_clock() {
    let _guard = lock();
    let start = Utc
        .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .unwrap();
    let clock = ManualClock::at(start);
    let server = server_for(Network::new().with_clock(clock.clone()));
    register(&server, "alice").await;
    register(&server, "bob").await;
    server
        .post("/follow")
        .json(&json!({"follower": "alice", "followed": "bob"}))
        .await
        .assert_status(StatusCode::CREATED);

    clock.advance(Duration::days(1) + Duration::minutes(30));

    let notifications: Vec<Value> = server.get("/users/bob/notifications").await.json();
    assert_eq!(
        notifications[0]["message"],
        "alice started following you - 1 day and 30 minutes ago"
    );
    assert_eq!(notifications[0]["source_type"], "follow");
}

// =============================================================================
// FEEDS
// =============================================================================

#[tokio::test]
async fn test_feed_contains_only_followees() {
    let (server, _guard) = create_populated_test_server().await;
    register(&server, "carol").await;
    server
        .post("/posts")
        .json(&json!({"owner": "carol", "image_path": "c.png"}))
        .await
        .assert_status(StatusCode::CREATED);

    let empty: Vec<Value> = server.get("/users/alice/feed").await.json();
    assert!(empty.is_empty());

    server
        .post("/follow")
        .json(&json!({"follower": "alice", "followed": "bob"}))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/posts/bob_1/like")
        .json(&json!({"username": "alice"}))
        .await
        .assert_status_ok();

    let feed: Vec<Value> = server.get("/users/alice/feed").await.json();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["post_id"], "bob_1");
    assert_eq!(feed[0]["owner"], "bob");
    assert_eq!(feed[0]["like_count"], 1);
    assert_eq!(feed[0]["is_liked_by_viewer"], true);
}

#[tokio::test]
async fn test_feed_of_unknown_user_is_not_found() {
    let (server, _guard) = create_test_server();

    let response = server.get("/users/ghost/feed").await;

    assert_error(&response, StatusCode::NOT_FOUND, "not_found");
}

#[tokio::test]
async fn test_explore() {
    let (server, _guard) = create_populated_test_server().await;
    server
        .post("/posts/bob_1/like")
        .json(&json!({"username": "alice"}))
        .await
        .assert_status_ok();

    let anonymous: Vec<Value> = server.get("/explore").await.json();
    assert_eq!(anonymous.len(), 1);
    assert_eq!(anonymous[0]["is_liked_by_viewer"], false);

    let as_alice: Vec<Value> = server
        .get("/explore")
        .add_query_param("viewer", "alice")
        .await
        .json();
    assert_eq!(as_alice[0]["is_liked_by_viewer"], true);

    let ghost = server
        .get("/explore")
        .add_query_param("viewer", "ghost")
        .await;
    assert_error(&ghost, StatusCode::NOT_FOUND, "not_found");
}

// =============================================================================
// PERSISTENCE
// =============================================================================

#[tokio::test]
async fn test_redb_backend_survives_restart() {
    let _guard = lock();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quack.redb");

    {
        let server = server_for(Network::with_redb(&path).unwrap());
        register(&server, "bob").await;
        server
            .post("/posts")
            .json(&json!({"owner": "bob", "image_path": "b.png"}))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let server = server_for(Network::with_redb(&path).unwrap());
    let status: Value = server.get("/status").await.json();
    assert_eq!(status["backend"], "redb");
    assert_eq!(status["users"], 1);

    let next: Value = server
        .post("/posts")
        .json(&json!({"owner": "bob", "image_path": "b2.png"}))
        .await
        .json();
    assert_eq!(next["id"], "bob_2");
}

// =============================================================================
// ROUTING / BODY HANDLING
// =============================================================================

#[tokio::test]
async fn test_404_on_unknown_endpoint() {
    let (server, _guard) = create_test_server();

    let response = server.get("/nonexistent").await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_method_not_allowed() {
    let (server, _guard) = create_test_server();

    let response = server.post("/health").await;

    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_invalid_json_body() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/users")
        .bytes(bytes::Bytes::from("not valid json"))
        .content_type("application/json")
        .await;

    assert!(response.status_code().is_client_error());
}

#[tokio::test]
async fn test_cors_preflight_allows_localhost() {
    use tower::ServiceExt;

    let _guard = lock();
    let router = create_router(AppState::new(Network::new()));
    let request = axum::http::Request::builder()
        .method("OPTIONS")
        .uri("/users/alice/bio")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );
}

// =============================================================================
// LOGGING
// =============================================================================

/// Counts events whose message matches `target`.
struct MessageCounter {
    target: &'static str,
    hits: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

struct MessageVisitor(Option<String>);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{:?}", value));
        }
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for MessageCounter {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = MessageVisitor(None);
        event.record(&mut visitor);
        if visitor.0.as_deref() == Some(self.target) {
            self.hits.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }
}

async fn count_events(
    target: &'static str,
    router: axum::Router,
    request: axum::http::Request<axum::body::Body>,
) -> (StatusCode, usize) {
    use tower::ServiceExt;
    use tracing_subscriber::layer::SubscriberExt;

    let hits = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(MessageCounter {
        target,
        hits: hits.clone(),
    });
    let _default = tracing::subscriber::set_default(subscriber);

    let response = router.oneshot(request).await.unwrap();
    (
        response.status(),
        hits.load(std::sync::atomic::Ordering::SeqCst),
    )
}

fn json_request(uri: &str, body: Value) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_register_and_upload_log_once() {
    let _guard = lock();
    let mut network = Network::new();
    network
        .register("bob", "", "pw", Role::Regular)
        .expect("register bob");
    let router = create_router(AppState::new(network));

    let (status, registered) = count_events(
        "user registered",
        router.clone(),
        json_request("/users", json!({"username": "alice", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(registered, 1);

    let (status, created) = count_events(
        "post created",
        router,
        json_request("/posts", json!({"owner": "bob", "image_path": "bob_1.png"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created, 1);
}

// =============================================================================
// AUTHENTICATION MIDDLEWARE
// =============================================================================

/// Server with authentication enabled. Call while holding the guard.
fn create_auth_test_server(api_key: &str) -> TestServer {
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::set_var("QUACK_API_KEY", api_key) };
    server_for(Network::new())
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let _guard = lock();
    let api_key = "test-secret-key-12345";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/status")
        .add_header(
            header::AUTHORIZATION,
            format!("Bearer {}", api_key)
                .parse::<HeaderValue>()
                .unwrap(),
        )
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_valid_raw_token() {
    let _guard = lock();
    let api_key = "test-raw-key-67890";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/status")
        .add_header(
            header::AUTHORIZATION,
            api_key.parse::<HeaderValue>().unwrap(),
        )
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_invalid_token_rejected() {
    let _guard = lock();
    let server = create_auth_test_server("correct-key");

    let response = server
        .get("/status")
        .add_header(
            header::AUTHORIZATION,
            "Bearer wrong-key".parse::<HeaderValue>().unwrap(),
        )
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_missing_header_rejected() {
    let _guard = lock();
    let server = create_auth_test_server("required-key");

    let response = server
        .post("/users")
        .json(&json!({"username": "alice", "password": "pw"}))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_bearer_prefix_only_rejected() {
    let _guard = lock();
    let server = create_auth_test_server("actual-key");

    let response = server
        .get("/status")
        .add_header(
            header::AUTHORIZATION,
            "Bearer ".parse::<HeaderValue>().unwrap(),
        )
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_health_endpoint_bypasses_auth() {
    let _guard = lock();
    let server = create_auth_test_server("secret-key-for-bypass-test");

    let response = server.get("/health").await;

    response.assert_status_ok();
}

// =============================================================================
// RATE LIMITING
// =============================================================================

#[tokio::test]
async fn test_rate_limit_rejects_burst() {
    let _guard = lock();
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::set_var("QUACK_RATE_LIMIT", "1") };
    let server = server_for(Network::new());

    server.get("/health").await.assert_status_ok();
    let second = server.get("/health").await;

    second.assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_rate_limit_zero_disables() {
    let _guard = lock();
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::set_var("QUACK_RATE_LIMIT", "0") };
    let server = server_for(Network::new());

    for _ in 0..5 {
        server.get("/health").await.assert_status_ok();
    }
}
