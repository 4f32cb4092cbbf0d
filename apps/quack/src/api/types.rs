//! # API Request/Response Types
//!
//! JSON structures for the HTTP API, and the mapping from engine errors to
//! HTTP statuses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use quack_core::{ErrorKind, NetworkMetrics, PostId, QuackError, Role, Username};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH / STATUS
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Network status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub backend: String,
    #[serde(flatten)]
    pub metrics: NetworkMetrics,
}

// =============================================================================
// ACCOUNTS
// =============================================================================

/// `POST /users`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub role: Role,
}

/// `POST /login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Outcome of a credential check. Sent with 200 or 401.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub username: Username,
    pub authenticated: bool,
}

/// `PUT /users/{username}/bio`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BioRequest {
    pub bio: String,
}

// =============================================================================
// FOLLOWS
// =============================================================================

/// `POST /follow`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowRequest {
    pub follower: String,
    pub followed: String,
}

/// A created follow edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowResponse {
    pub follower: Username,
    pub followed: Username,
}

// =============================================================================
// CONTENT
// =============================================================================

/// `POST /posts`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub owner: String,
    pub image_path: String,
    #[serde(default)]
    pub caption: String,
}

/// `PUT /posts/{id}/caption`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionRequest {
    pub caption: String,
}

/// `POST /posts/{id}/like`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeRequest {
    pub username: String,
}

/// Like state after a toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeResponse {
    pub post_id: PostId,
    pub liked: bool,
    pub like_count: usize,
}

/// `POST /posts/{id}/comments`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRequest {
    pub username: String,
    pub text: String,
}

/// `GET /explore?viewer=...`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExploreQuery {
    pub viewer: Option<String>,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// An engine error on its way to an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub QuackError);

impl From<QuackError> for ApiError {
    fn from(err: QuackError) -> Self {
        Self(err)
    }
}

/// HTTP status for an error kind.
#[must_use]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::ValidationFailed => StatusCode::BAD_REQUEST,
        ErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            tracing::error!(kind = kind.as_str(), "request failed: {}", self.0);
        } else {
            tracing::debug!(kind = kind.as_str(), "request rejected: {}", self.0);
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
            kind: kind.as_str().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
