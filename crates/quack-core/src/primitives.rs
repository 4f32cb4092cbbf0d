//! # Primitives
//!
//! Fixed limits and rendering constants for the Quack engine.
//!
//! These are compiled into the binary and are immutable at runtime.

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a username, in bytes.
pub const MAX_USERNAME_LENGTH: usize = 32;

/// Maximum length of a bio, in bytes.
pub const MAX_BIO_LENGTH: usize = 1024;

/// Maximum length of a credential, in bytes.
pub const MAX_CREDENTIAL_LENGTH: usize = 256;

/// Maximum length of a post caption, in bytes.
pub const MAX_CAPTION_LENGTH: usize = 2200;

/// Maximum length of an image path handle, in bytes.
pub const MAX_IMAGE_PATH_LENGTH: usize = 1024;

/// Maximum length of a comment, in bytes.
pub const MAX_COMMENT_LENGTH: usize = 1000;

// =============================================================================
// NOTIFICATION RENDERING
// =============================================================================

/// Elapsed-time text when less than a minute has passed.
pub const JUST_NOW: &str = "just now";

/// Text of the notification appended when someone follows a user.
#[must_use]
pub fn follow_notification_text(follower: &str) -> String {
    format!("{} started following you", follower)
}

/// Text of the notification appended when someone likes a post.
#[must_use]
pub fn like_notification_text(actor: &str) -> String {
    format!("{} liked your picture", actor)
}

/// Text of the notification appended when someone comments on a post.
#[must_use]
pub fn comment_notification_text(actor: &str) -> String {
    format!("{} commented on your picture", actor)
}
