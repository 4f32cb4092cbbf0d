//! # Quack HTTP API Module
//!
//! The HTTP REST API server, built on axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Network metrics
//! - `POST /users` - Register a user
//! - `GET /users/{username}` - Profile
//! - `PUT /users/{username}/bio` - Replace bio
//! - `POST /login` - Check a username/password pair
//! - `POST /follow` - Follow a user
//! - `GET /users/{username}/followers` - Followers
//! - `GET /users/{username}/following` - Followees
//! - `GET /users/{username}/posts` - A user's pictures
//! - `GET /users/{username}/feed` - Home feed
//! - `GET /users/{username}/notifications` - Notifications
//! - `POST /posts` - Upload a picture
//! - `GET /posts/{id}` - Picture with likes and comments
//! - `PUT /posts/{id}/caption` - Replace caption
//! - `POST /posts/{id}/like` - Toggle a like
//! - `POST /posts/{id}/comments` - Comment
//! - `GET /explore` - Every picture (`?viewer=` marks likes)
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `QUACK_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `QUACK_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `QUACK_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::get_api_key_from_env;
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    ApiError, BioRequest, CaptionRequest, CommentRequest, CreatePostRequest, ErrorResponse,
    FollowRequest, FollowResponse, HealthResponse, LikeRequest, LikeResponse, LoginRequest,
    LoginResponse, RegisterRequest, StatusResponse, status_for,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post, put},
};
use quack_core::{Network, QuackError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Maximum request body size (2 MB).
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// The network every handler operates on.
    pub network: Arc<RwLock<Network>>,
}

impl AppState {
    /// Wrap a network for sharing across handlers.
    #[must_use]
    pub fn new(network: Network) -> Self {
        Self {
            network: Arc::new(RwLock::new(network)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::OPTIONS];

/// Build the CORS layer from `QUACK_CORS_ORIGINS`.
///
/// - `"*"`: any origin
/// - unset, or no valid entry: localhost only
/// - otherwise: the comma-separated origins
fn build_cors_layer() -> CorsLayer {
    match std::env::var("QUACK_CORS_ORIGINS").ok().as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (QUACK_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) if !trimmed.is_empty() => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Ok(_) => None,
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in QUACK_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods(CORS_METHODS)
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No QUACK_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// CORS layer allowing only local development origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate limiting (if enabled)
/// 5. Authentication (if configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set QUACK_API_KEY to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/users", post(handlers::register_handler))
        .route("/users/{username}", get(handlers::profile_handler))
        .route("/users/{username}/bio", put(handlers::bio_handler))
        .route("/users/{username}/followers", get(handlers::followers_handler))
        .route("/users/{username}/following", get(handlers::following_handler))
        .route("/users/{username}/posts", get(handlers::user_posts_handler))
        .route("/users/{username}/feed", get(handlers::feed_handler))
        .route(
            "/users/{username}/notifications",
            get(handlers::notifications_handler),
        )
        .route("/login", post(handlers::login_handler))
        .route("/follow", post(handlers::follow_handler))
        .route("/posts", post(handlers::create_post_handler))
        .route("/posts/{id}", get(handlers::post_detail_handler))
        .route("/posts/{id}/caption", put(handlers::caption_handler))
        .route("/posts/{id}/like", post(handlers::like_handler))
        .route("/posts/{id}/comments", post(handlers::comment_handler))
        .route("/explore", get(handlers::explore_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve `network` on `addr` until Ctrl+C.
pub async fn run_server(addr: &str, network: Network) -> Result<(), QuackError> {
    let router = create_router(AppState::new(network));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| QuackError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Quack HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| QuackError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
