//! # API Endpoint Handlers
//!
//! Every handler takes the shared network, runs one operation and returns
//! JSON. Failures go out as [`ApiError`], which picks the status from the
//! error kind.

use super::{
    AppState,
    types::{
        ApiError, BioRequest, CaptionRequest, CommentRequest, CreatePostRequest, ExploreQuery,
        FollowRequest, FollowResponse, HealthResponse, LikeRequest, LikeResponse, LoginRequest,
        LoginResponse, RegisterRequest, StatusResponse,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use quack_core::{
    Comment, FeedItem, Post, PostDetail, PostId, RenderedNotification, UserProfile, Username,
};

type ApiResult<T> = Result<T, ApiError>;

fn parse_post_id(raw: &str) -> ApiResult<PostId> {
    Ok(raw.parse::<PostId>()?)
}

// =============================================================================
// HEALTH / STATUS
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Network metrics.
pub async fn status_handler(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    let network = state.network.read().await;
    Ok(Json(StatusResponse {
        backend: network.backend_name().to_string(),
        metrics: network.metrics()?,
    }))
}

// =============================================================================
// ACCOUNTS
// =============================================================================

/// Register a user.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let mut network = state.network.write().await;
    let profile = network.register(
        &request.username,
        &request.bio,
        &request.password,
        request.role,
    )?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Check a username/password pair.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<(StatusCode, Json<LoginResponse>)> {
    let network = state.network.read().await;
    let username = Username::new(request.username);
    let authenticated = network.verify_credential(&username, &request.password)?;
    let status = if authenticated {
        StatusCode::OK
    } else {
        tracing::warn!(event = "login_failure", username = %username, "Login failed");
        StatusCode::UNAUTHORIZED
    };
    Ok((
        status,
        Json(LoginResponse {
            username,
            authenticated,
        }),
    ))
}

/// Public profile.
pub async fn profile_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    let network = state.network.read().await;
    Ok(Json(network.profile(&Username::new(username))?))
}

/// Replace a bio; returns the updated profile.
pub async fn bio_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(request): Json<BioRequest>,
) -> ApiResult<Json<UserProfile>> {
    let mut network = state.network.write().await;
    let username = Username::new(username);
    network.update_bio(&username, &request.bio)?;
    Ok(Json(network.profile(&username)?))
}

// =============================================================================
// FOLLOWS
// =============================================================================

/// Create a follow edge.
pub async fn follow_handler(
    State(state): State<AppState>,
    Json(request): Json<FollowRequest>,
) -> ApiResult<(StatusCode, Json<FollowResponse>)> {
    let mut network = state.network.write().await;
    let follower = Username::new(request.follower);
    let followed = Username::new(request.followed);
    network.follow(&follower, &followed)?;
    Ok((
        StatusCode::CREATED,
        Json(FollowResponse { follower, followed }),
    ))
}

/// Followers of a user.
pub async fn followers_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<Vec<Username>>> {
    let network = state.network.read().await;
    let username = Username::new(username);
    network.user(&username)?;
    Ok(Json(network.followers(&username)?))
}

/// Users a user follows.
pub async fn following_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<Vec<Username>>> {
    let network = state.network.read().await;
    let username = Username::new(username);
    network.user(&username)?;
    Ok(Json(network.following(&username)?))
}

// =============================================================================
// CONTENT
// =============================================================================

/// Upload a picture.
pub async fn create_post_handler(
    State(state): State<AppState>,
    Json(request): Json<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let mut network = state.network.write().await;
    let post = network.create_post(
        &Username::new(request.owner),
        &request.image_path,
        &request.caption,
    )?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// A user's pictures, newest first.
pub async fn user_posts_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<Vec<Post>>> {
    let network = state.network.read().await;
    let username = Username::new(username);
    network.user(&username)?;
    Ok(Json(network.posts_by_owner(&username)?))
}

/// A picture with its like count and comments.
pub async fn post_detail_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PostDetail>> {
    let id = parse_post_id(&id)?;
    let network = state.network.read().await;
    Ok(Json(network.post_detail(&id)?))
}

/// Replace a caption; returns the updated post.
pub async fn caption_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CaptionRequest>,
) -> ApiResult<Json<Post>> {
    let id = parse_post_id(&id)?;
    let mut network = state.network.write().await;
    network.update_caption(&id, &request.caption)?;
    Ok(Json(network.post(&id)?))
}

// =============================================================================
// ENGAGEMENT
// =============================================================================

/// Toggle a like.
pub async fn like_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<LikeRequest>,
) -> ApiResult<Json<LikeResponse>> {
    let id = parse_post_id(&id)?;
    let mut network = state.network.write().await;
    let outcome = network.like(&Username::new(request.username), &id)?;
    let like_count = network.like_count(&id)?;
    Ok(Json(LikeResponse {
        post_id: id,
        liked: outcome.is_liked(),
        like_count,
    }))
}

/// Comment on a picture.
pub async fn comment_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let id = parse_post_id(&id)?;
    let mut network = state.network.write().await;
    let comment = network.comment(&Username::new(request.username), &id, &request.text)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

// =============================================================================
// FEEDS
// =============================================================================

/// Home feed.
pub async fn feed_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<Vec<FeedItem>>> {
    let network = state.network.read().await;
    let viewer = Username::new(username);
    network.user(&viewer)?;
    Ok(Json(network.feed(&viewer)?))
}

/// Every picture, optionally decorated for a viewer.
pub async fn explore_handler(
    State(state): State<AppState>,
    Query(query): Query<ExploreQuery>,
) -> ApiResult<Json<Vec<FeedItem>>> {
    let network = state.network.read().await;
    let viewer = query.viewer.map(Username::new);
    if let Some(v) = &viewer {
        network.user(v)?;
    }
    Ok(Json(network.explore(viewer.as_ref())?))
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Notifications, newest first, with messages rendered at request time.
pub async fn notifications_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<Vec<RenderedNotification>>> {
    let network = state.network.read().await;
    let recipient = Username::new(username);
    network.user(&recipient)?;
    Ok(Json(network.rendered_notifications(&recipient)?))
}
