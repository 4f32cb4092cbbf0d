//! # Core Type Definitions
//!
//! This module contains the records the engine stores and returns:
//! - Identifiers (`Username`, `PostId`)
//! - Rows of the six relations (`User`, `Post`, `Comment`, `Notification`, plus
//!   follow edges and likes, which are bare key pairs)
//! - Outcomes (`LikeToggle`)
//! - Error types (`QuackError`, `ErrorKind`)
//!
//! ## Ordering Guarantees
//!
//! Every identifier implements `Ord` so that stores can keep rows in
//! `BTreeMap`/`BTreeSet` and every listing has a deterministic order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Point in time used for posts, comments and notifications.
pub type Timestamp = DateTime<Utc>;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Unique, immutable user name. Primary key of the Users relation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Username(pub String);

impl Username {
    /// Create a username from a string. Format rules are checked at registration.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Username {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identity of a post: its owner plus an owner-scoped sequence number.
///
/// Rendered as `"{owner}_{seq}"`, the same name the uploaded image file gets.
/// The sequence is assigned by the store inside the insert itself and is
/// never reused, so two uploads by the same owner cannot collide.
/// Serialized in that string form as well.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PostId {
    /// The user who uploaded the post.
    pub owner: Username,
    /// 1-based upload number for this owner.
    pub seq: u64,
}

impl PostId {
    /// Create a post id.
    #[must_use]
    pub fn new(owner: Username, seq: u64) -> Self {
        Self { owner, seq }
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.owner, self.seq)
    }
}

impl FromStr for PostId {
    type Err = QuackError;

    /// Parse `"{owner}_{seq}"`. The owner may itself contain underscores;
    /// the sequence is whatever follows the last one.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner, seq) = s
            .rsplit_once('_')
            .ok_or_else(|| QuackError::ValidationFailed(format!("malformed post id '{}'", s)))?;
        if owner.is_empty() {
            return Err(QuackError::ValidationFailed(format!(
                "malformed post id '{}'",
                s
            )));
        }
        let seq = seq
            .parse::<u64>()
            .map_err(|_| QuackError::ValidationFailed(format!("malformed post id '{}'", s)))?;
        Ok(Self::new(Username::new(owner), seq))
    }
}

impl From<PostId> for String {
    fn from(id: PostId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for PostId {
    type Error = QuackError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// =============================================================================
// USERS
// =============================================================================

/// Role attached to a user. Carries no behavior inside the engine.
///
/// Serialized as its label and parsed with [`FromStr`], so JSON bodies
/// and command-line flags accept the same spellings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(into = "String", try_from = "String")]
pub enum Role {
    #[default]
    Regular,
    Admin,
}

impl Role {
    /// Human-readable label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Role::Regular => "RegularUser",
            Role::Admin => "AdminUser",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = QuackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "regular" | "regularuser" => Ok(Role::Regular),
            "admin" | "adminuser" => Ok(Role::Admin),
            other => Err(QuackError::ValidationFailed(format!(
                "unknown role '{}'",
                other
            ))),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.label().to_string()
    }
}

impl TryFrom<String> for Role {
    type Error = QuackError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Opaque secret stored with a user.
///
/// Write-only from the outside: it is never part of a profile or API
/// response and its `Debug` output is redacted. Only an
/// [`Authenticator`](crate::identity::Authenticator) reads it back.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential(String);

impl Credential {
    /// Wrap a secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Raw secret, for authenticators only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Check if the secret is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// A row of the Users relation.
///
/// Follower, following and post counts are not stored here; `UserProfile`
/// computes them from the other relations on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: Username,
    pub bio: String,
    pub credential: Credential,
    pub role: Role,
}

impl User {
    /// Create a new user record.
    #[must_use]
    pub fn new(
        username: Username,
        bio: impl Into<String>,
        credential: Credential,
        role: Role,
    ) -> Self {
        Self {
            username,
            bio: bio.into(),
            credential,
            role,
        }
    }
}

// =============================================================================
// CONTENT
// =============================================================================

/// A row of the Posts relation.
///
/// Like count and comments are derived from the Likes and Comments relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    /// Opaque handle to an externally stored image. Never interpreted here.
    pub image_path: String,
    pub caption: String,
    pub created_at: Timestamp,
}

impl Post {
    /// The user who uploaded this post.
    #[must_use]
    pub fn owner(&self) -> &Username {
        &self.id.owner
    }
}

/// Input for inserting a post. The store assigns the sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub owner: Username,
    pub image_path: String,
    pub caption: String,
    pub created_at: Timestamp,
}

/// Result of flipping a like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LikeToggle {
    /// A like row was inserted.
    Liked,
    /// The existing like row was removed.
    Unliked,
}

impl LikeToggle {
    /// Whether the post is liked after the toggle.
    #[must_use]
    pub fn is_liked(&self) -> bool {
        matches!(self, LikeToggle::Liked)
    }
}

/// A row of the Comments relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Store-assigned, strictly increasing.
    pub id: u64,
    pub post: PostId,
    pub username: Username,
    pub text: String,
    pub created_at: Timestamp,
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// What produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Like,
    Comment,
    Follow,
    Other,
}

impl SourceType {
    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Like => "like",
            SourceType::Comment => "comment",
            SourceType::Follow => "follow",
            SourceType::Other => "other",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the Notifications relation. Never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Store-assigned, strictly increasing.
    pub id: u64,
    pub recipient: Username,
    pub text: String,
    pub source_type: SourceType,
    pub source_id: String,
    pub timestamp: Timestamp,
}

/// Input for appending a notification. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient: Username,
    pub text: String,
    pub source_type: SourceType,
    pub source_id: String,
    pub timestamp: Timestamp,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Coarse error taxonomy callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A referenced user or post does not exist.
    NotFound,
    /// A business rule rejected the write (duplicate follow, self-follow, taken name).
    Conflict,
    /// The backing store could not be read or written.
    StoreUnavailable,
    /// A required field is empty, too long or malformed.
    ValidationFailed,
}

impl ErrorKind {
    /// Snake-case wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::ValidationFailed => "validation_failed",
        }
    }
}

/// Errors that can occur in the Quack engine.
///
/// Business-rule violations are ordinary variants so callers can react to
/// them (for example by disabling a Follow button) instead of only
/// displaying a message.
#[derive(Debug, Error)]
pub enum QuackError {
    /// The referenced user does not exist.
    #[error("User not found: {0}")]
    UserNotFound(Username),

    /// The referenced post does not exist.
    #[error("Post not found: {0}")]
    PostNotFound(PostId),

    /// The follow edge already exists.
    #[error("{follower} already follows {followed}")]
    AlreadyFollowing {
        follower: Username,
        followed: Username,
    },

    /// A user tried to follow themselves.
    #[error("{0} cannot follow themselves")]
    SelfFollow(Username),

    /// Registration with a name that is already in use.
    #[error("Username already exists: {0}")]
    UsernameTaken(Username),

    /// The backing store is unreachable or failed mid-operation.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A required field is empty or out of bounds.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// A stored row could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A file or socket operation outside the store failed.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl QuackError {
    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuackError::UserNotFound(_) | QuackError::PostNotFound(_) => ErrorKind::NotFound,
            QuackError::AlreadyFollowing { .. }
            | QuackError::SelfFollow(_)
            | QuackError::UsernameTaken(_) => ErrorKind::Conflict,
            QuackError::StoreUnavailable(_)
            | QuackError::SerializationError(_)
            | QuackError::IoError(_) => ErrorKind::StoreUnavailable,
            QuackError::ValidationFailed(_) => ErrorKind::ValidationFailed,
        }
    }

    /// Whether this is a business-rule conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_id_display_matches_upload_name() {
        let id = PostId::new(Username::new("bob"), 3);
        assert_eq!(id.to_string(), "bob_3");
    }

    #[test]
    fn post_id_parses_owner_with_underscores() {
        let id: PostId = "mr_duck_12".parse().expect("parse");
        assert_eq!(id.owner, Username::new("mr_duck"));
        assert_eq!(id.seq, 12);
    }

    #[test]
    fn post_id_rejects_garbage() {
        assert!("nounderscore".parse::<PostId>().is_err());
        assert!("_4".parse::<PostId>().is_err());
        assert!("bob_x".parse::<PostId>().is_err());
    }

    #[test]
    fn post_ids_order_by_owner_then_seq() {
        let a = PostId::new(Username::new("a"), 9);
        let b1 = PostId::new(Username::new("b"), 1);
        let b2 = PostId::new(Username::new("b"), 2);
        assert!(a < b1);
        assert!(b1 < b2);
    }

    #[test]
    fn credential_debug_is_redacted() {
        let cred = Credential::new("hunter2");
        assert!(!format!("{:?}", cred).contains("hunter2"));
        assert_eq!(cred.expose(), "hunter2");
    }

    #[test]
    fn role_parses_labels() {
        assert_eq!("admin".parse::<Role>().expect("parse"), Role::Admin);
        assert_eq!("RegularUser".parse::<Role>().expect("parse"), Role::Regular);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn error_kinds() {
        let u = Username::new("a");
        assert_eq!(QuackError::SelfFollow(u.clone()).kind(), ErrorKind::Conflict);
        assert!(
            QuackError::AlreadyFollowing {
                follower: u.clone(),
                followed: Username::new("b"),
            }
            .is_conflict()
        );
        assert_eq!(QuackError::UserNotFound(u).kind(), ErrorKind::NotFound);
        assert_eq!(
            QuackError::StoreUnavailable("down".into()).kind(),
            ErrorKind::StoreUnavailable
        );
        assert_eq!(
            QuackError::ValidationFailed("empty".into()).kind(),
            ErrorKind::ValidationFailed
        );
    }
}
