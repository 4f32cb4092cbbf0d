//! # CLI Command Implementations
//!
//! Each command opens the configured network, runs one operation and prints
//! the result, either as text or (with `--json-mode`) as pretty JSON.

use crate::api;
use crate::config::{BackendKind, Settings};
use quack_core::{FeedItem, Network, Post, PostId, QuackError, Role, Username};
use serde::Serialize;

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(settings: &Settings) -> Result<(), QuackError> {
    let network = load_network(settings)?;

    println!("Quack Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", settings.host);
    println!("  Port:     {}", settings.port);
    println!("  Backend:  {}", settings.backend);
    println!("  Database: {:?}", settings.database);
    println!();
    println!("Endpoints:");
    println!("  GET  /health                        - Health check");
    println!("  GET  /status                        - Network metrics");
    println!("  POST /users                         - Register");
    println!("  POST /login                         - Check credentials");
    println!("  POST /follow                        - Follow a user");
    println!("  POST /posts                         - Upload a picture");
    println!("  POST /posts/{{id}}/like               - Toggle a like");
    println!("  POST /posts/{{id}}/comments           - Comment");
    println!("  GET  /users/{{username}}/feed         - Home feed");
    println!("  GET  /users/{{username}}/notifications - Notifications");
    println!("  GET  /explore                       - Every picture");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(&settings.addr(), network).await
}

// =============================================================================
// INIT / STATUS COMMANDS
// =============================================================================

/// Initialize a new database.
pub fn cmd_init(settings: &Settings, force: bool) -> Result<(), QuackError> {
    if settings.backend == BackendKind::Memory {
        println!("The memory backend keeps no files; nothing to initialize.");
        return Ok(());
    }

    let path = &settings.database;
    if path.exists() {
        if !force {
            return Err(QuackError::ValidationFailed(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(path).map_err(|e| {
            QuackError::IoError(format!("Cannot remove '{}': {}", path.display(), e))
        })?;
        tracing::warn!(path = %path.display(), "existing database removed");
    }

    let _network = Network::with_redb(path)?;
    println!("Initialized new redb database at {:?}", path);
    Ok(())
}

/// Show network status.
pub fn cmd_status(settings: &Settings, json_mode: bool) -> Result<(), QuackError> {
    let network = load_network(settings)?;
    let metrics = network.metrics()?;

    if json_mode {
        let output = serde_json::json!({
            "database": settings.database.to_string_lossy(),
            "backend": network.backend_name(),
            "users": metrics.users,
            "follows": metrics.follows,
            "posts": metrics.posts,
            "likes": metrics.likes,
            "comments": metrics.comments,
            "notifications": metrics.notifications,
            "follows_per_user_millionths": metrics.follows_per_user_millionths,
        });
        print_json(&output);
        return Ok(());
    }

    println!("Quack Network Status");
    println!("====================");
    println!("Database: {:?}", settings.database);
    println!("Backend:  {}", network.backend_name());
    println!();
    println!("Users:         {}", metrics.users);
    println!("Follows:       {}", metrics.follows);
    println!("Posts:         {}", metrics.posts);
    println!("Likes:         {}", metrics.likes);
    println!("Comments:      {}", metrics.comments);
    println!("Notifications: {}", metrics.notifications);
    println!(
        "Follows/user:  {} millionths",
        metrics.follows_per_user_millionths
    );

    Ok(())
}

/// Reclaim free space in the database file.
pub fn cmd_compact(settings: &Settings, json_mode: bool) -> Result<(), QuackError> {
    let mut network = load_network(settings)?;
    let compacted = network.compact()?;

    if json_mode {
        let output = serde_json::json!({
            "database": settings.database.to_string_lossy(),
            "backend": network.backend_name(),
            "compacted": compacted,
        });
        print_json(&output);
    } else if compacted {
        println!("Compacted {:?}", settings.database);
    } else {
        println!("Nothing to compact.");
    }
    Ok(())
}

// =============================================================================
// ACCOUNT COMMANDS
// =============================================================================

/// Register a new user.
pub fn cmd_register(
    settings: &Settings,
    json_mode: bool,
    username: &str,
    password: &str,
    bio: &str,
    role: Role,
) -> Result<(), QuackError> {
    let mut network = load_network(settings)?;
    let profile = network.register(username, bio, password, role)?;

    if json_mode {
        print_json(&profile);
    } else {
        println!("Registered {} ({})", profile.username, profile.role);
    }
    Ok(())
}

/// Check a password. An invalid pair exits with an error.
pub fn cmd_login(
    settings: &Settings,
    json_mode: bool,
    username: &str,
    password: &str,
) -> Result<(), QuackError> {
    let network = load_network(settings)?;
    let authenticated = network.verify_credential(&Username::new(username), password)?;

    if json_mode {
        print_json(&serde_json::json!({
            "username": username,
            "authenticated": authenticated,
        }));
    }
    if !authenticated {
        return Err(QuackError::ValidationFailed(
            "invalid username or password".to_string(),
        ));
    }
    if !json_mode {
        println!("Welcome back, {}!", username);
    }
    Ok(())
}

/// Show a profile.
pub fn cmd_profile(settings: &Settings, json_mode: bool, username: &str) -> Result<(), QuackError> {
    let network = load_network(settings)?;
    let profile = network.profile(&Username::new(username))?;

    if json_mode {
        print_json(&profile);
        return Ok(());
    }

    println!("@{} [{}]", profile.username, profile.role);
    if !profile.bio.is_empty() {
        println!("{}", profile.bio);
    }
    println!();
    println!("Posts:     {}", profile.posts_count);
    println!("Followers: {}", profile.followers_count);
    println!("Following: {}", profile.following_count);
    Ok(())
}

/// Replace a bio.
pub fn cmd_bio(settings: &Settings, username: &str, bio: &str) -> Result<(), QuackError> {
    let mut network = load_network(settings)?;
    network.update_bio(&Username::new(username), bio)?;
    println!("Bio updated for {}", username);
    Ok(())
}

// =============================================================================
// FOLLOW COMMANDS
// =============================================================================

/// Follow a user.
pub fn cmd_follow(settings: &Settings, follower: &str, followed: &str) -> Result<(), QuackError> {
    let mut network = load_network(settings)?;
    network.follow(&Username::new(follower), &Username::new(followed))?;
    println!("{} now follows {}", follower, followed);
    Ok(())
}

/// List followers.
pub fn cmd_followers(
    settings: &Settings,
    json_mode: bool,
    username: &str,
) -> Result<(), QuackError> {
    let network = load_network(settings)?;
    let username = Username::new(username);
    network.user(&username)?;
    print_users(&network.followers(&username)?, json_mode);
    Ok(())
}

/// List followees.
pub fn cmd_following(
    settings: &Settings,
    json_mode: bool,
    username: &str,
) -> Result<(), QuackError> {
    let network = load_network(settings)?;
    let username = Username::new(username);
    network.user(&username)?;
    print_users(&network.following(&username)?, json_mode);
    Ok(())
}

// =============================================================================
// CONTENT COMMANDS
// =============================================================================

/// Upload a picture.
pub fn cmd_post(
    settings: &Settings,
    json_mode: bool,
    owner: &str,
    image: &str,
    caption: &str,
) -> Result<(), QuackError> {
    let mut network = load_network(settings)?;
    let post = network.create_post(&Username::new(owner), image, caption)?;

    if json_mode {
        print_json(&post);
    } else {
        println!("Uploaded {}", post.id);
    }
    Ok(())
}

/// List a user's pictures.
pub fn cmd_posts(settings: &Settings, json_mode: bool, username: &str) -> Result<(), QuackError> {
    let network = load_network(settings)?;
    let username = Username::new(username);
    network.user(&username)?;
    let posts = network.posts_by_owner(&username)?;

    if json_mode {
        print_json(&posts);
        return Ok(());
    }
    if posts.is_empty() {
        println!("No pictures yet.");
    }
    for post in &posts {
        print_post_line(post);
    }
    Ok(())
}

/// Replace a caption.
pub fn cmd_caption(settings: &Settings, post: &str, caption: &str) -> Result<(), QuackError> {
    let id: PostId = post.parse()?;
    let mut network = load_network(settings)?;
    network.update_caption(&id, caption)?;
    println!("Caption updated for {}", id);
    Ok(())
}

/// Show a picture with likes and comments.
pub fn cmd_show(settings: &Settings, json_mode: bool, post: &str) -> Result<(), QuackError> {
    let id: PostId = post.parse()?;
    let network = load_network(settings)?;
    let detail = network.post_detail(&id)?;

    if json_mode {
        print_json(&detail);
        return Ok(());
    }

    println!("{} by @{}", detail.post.id, detail.post.id.owner);
    println!("Image:   {}", detail.post.image_path);
    println!("Caption: {}", detail.post.caption);
    println!("Posted:  {}", detail.post.created_at.to_rfc3339());
    println!("Likes:   {}", detail.like_count);
    if !detail.comments.is_empty() {
        println!();
        println!("Comments:");
        for comment in &detail.comments {
            println!("  {}: {}", comment.username, comment.text);
        }
    }
    Ok(())
}

// =============================================================================
// ENGAGEMENT COMMANDS
// =============================================================================

/// Toggle a like.
pub fn cmd_like(
    settings: &Settings,
    json_mode: bool,
    actor: &str,
    post: &str,
) -> Result<(), QuackError> {
    let id: PostId = post.parse()?;
    let mut network = load_network(settings)?;
    let outcome = network.like(&Username::new(actor), &id)?;
    let like_count = network.like_count(&id)?;

    if json_mode {
        print_json(&serde_json::json!({
            "post_id": id.to_string(),
            "liked": outcome.is_liked(),
            "like_count": like_count,
        }));
    } else if outcome.is_liked() {
        println!("{} liked {} ({} likes)", actor, id, like_count);
    } else {
        println!("{} unliked {} ({} likes)", actor, id, like_count);
    }
    Ok(())
}

/// Comment on a picture.
pub fn cmd_comment(
    settings: &Settings,
    json_mode: bool,
    actor: &str,
    post: &str,
    text: &str,
) -> Result<(), QuackError> {
    let id: PostId = post.parse()?;
    let mut network = load_network(settings)?;
    let comment = network.comment(&Username::new(actor), &id, text)?;

    if json_mode {
        print_json(&comment);
    } else {
        println!("Comment #{} added to {}", comment.id, id);
    }
    Ok(())
}

// =============================================================================
// FEED COMMANDS
// =============================================================================

/// Show a home feed.
pub fn cmd_feed(settings: &Settings, json_mode: bool, username: &str) -> Result<(), QuackError> {
    let network = load_network(settings)?;
    let viewer = Username::new(username);
    network.user(&viewer)?;
    let items = network.feed(&viewer)?;

    if json_mode {
        print_json(&items);
    } else if items.is_empty() {
        println!("Nothing here yet. Follow someone to fill your feed.");
    } else {
        print_feed(&items);
    }
    Ok(())
}

/// List every picture.
pub fn cmd_explore(
    settings: &Settings,
    json_mode: bool,
    viewer: Option<&str>,
) -> Result<(), QuackError> {
    let network = load_network(settings)?;
    let viewer = viewer.map(Username::new);
    if let Some(v) = &viewer {
        network.user(v)?;
    }
    let items = network.explore(viewer.as_ref())?;

    if json_mode {
        print_json(&items);
    } else {
        print_feed(&items);
    }
    Ok(())
}

// =============================================================================
// NOTIFICATION COMMANDS
// =============================================================================

/// Show notifications.
pub fn cmd_notifications(
    settings: &Settings,
    json_mode: bool,
    username: &str,
) -> Result<(), QuackError> {
    let network = load_network(settings)?;
    let recipient = Username::new(username);
    network.user(&recipient)?;
    let notifications = network.rendered_notifications(&recipient)?;

    if json_mode {
        print_json(&notifications);
        return Ok(());
    }
    if notifications.is_empty() {
        println!("No notifications.");
    }
    for notification in &notifications {
        println!("{}", notification.message);
    }
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the network described by `settings`.
pub fn load_network(settings: &Settings) -> Result<Network, QuackError> {
    let network = settings.open_network()?;
    tracing::debug!(backend = network.backend_name(), "network opened");
    Ok(network)
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

fn print_users(users: &[Username], json_mode: bool) {
    if json_mode {
        print_json(users);
        return;
    }
    if users.is_empty() {
        println!("(none)");
    }
    for user in users {
        println!("{}", user);
    }
}

fn print_post_line(post: &Post) {
    println!(
        "{}  {}  {}",
        post.id,
        post.created_at.format("%Y-%m-%d %H:%M"),
        post.caption
    );
}

fn print_feed(items: &[FeedItem]) {
    for item in items {
        let heart = if item.is_liked_by_viewer { "*" } else { " " };
        println!(
            "{} {}  @{}  {} likes  {}",
            heart, item.post_id, item.owner, item.like_count, item.caption
        );
    }
}
