//! # Authentication Module
//!
//! API key authentication for the Quack HTTP API.
//!
//! This guards the API itself, not user accounts: user passwords are checked
//! by `POST /login` through the network's `Authenticator`.
//!
//! ## Configuration
//!
//! - `QUACK_API_KEY`: If set, all requests (except /health) require this key
//!
//! ## Usage
//!
//! ```text
//! Authorization: Bearer <your-api-key>
//! ```

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use quack_core::identity::constant_time_eq;

/// Get API key from environment variable.
///
/// Returns `Some(key)` if `QUACK_API_KEY` is set and non-empty,
/// `None` otherwise (disabling authentication).
pub fn get_api_key_from_env() -> Option<String> {
    std::env::var("QUACK_API_KEY").ok().filter(|k| !k.is_empty())
}

/// Check an `Authorization` header value against the expected key.
///
/// Accepts both `Bearer <key>` and a raw `<key>`.
fn header_matches(header_value: &str, expected: &str) -> bool {
    let provided = header_value.strip_prefix("Bearer ").unwrap_or(header_value);
    constant_time_eq(provided.as_bytes(), expected.as_bytes())
}

/// API key authentication middleware.
///
/// If `QUACK_API_KEY` is set:
/// - `/health` is always allowed (for load balancer health checks)
/// - Every other endpoint requires `Authorization: Bearer <key>`
///
/// If `QUACK_API_KEY` is not set, all requests are allowed.
pub async fn api_key_auth_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let Some(expected) = get_api_key_from_env() else {
        return Ok(next.run(request).await);
    };

    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(value) if header_matches(value, &expected) => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!(
                event = "auth_failure",
                reason = "invalid_api_key",
                "Authentication failed: invalid API key"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                "Missing Authorization header"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}
