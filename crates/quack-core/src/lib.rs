//! # quack-core
//!
//! The social-graph, feed and notification engine for Quack.
//!
//! Users register, upload posts, follow each other, like and comment, and
//! receive notifications. This crate holds every rule of that system:
//! - No self-follow, no duplicate follow
//! - A post's like count always equals its like rows
//! - One notification per engagement event, never for self-engagement
//! - A home feed contains followees' posts only, newest first
//!
//! ## Architectural Constraints
//!
//! - Synchronous, NO async, NO network dependencies (pure Rust)
//! - One storage boundary ([`SocialStore`]) with an in-memory and a redb backend
//! - Time is injected through [`Clock`]; nothing reads the wall clock directly
//! - Derived counters are recomputed from rows, never cached

// =============================================================================
// MODULES
// =============================================================================

pub mod clock;
pub mod content;
pub mod engagement;
pub mod feed;
pub mod follow;
pub mod identity;
pub mod metrics;
pub mod network;
pub mod notification;
pub mod primitives;
pub mod storage;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Comment, Credential, ErrorKind, LikeToggle, NewNotification, NewPost, Notification, Post,
    PostId, QuackError, Role, SourceType, Timestamp, User, Username,
};

// =============================================================================
// RE-EXPORTS: Storage
// =============================================================================

pub use storage::{RedbStore, StorageBackend};
pub use store::{MemoryStore, SocialStore};

// =============================================================================
// RE-EXPORTS: Components
// =============================================================================

pub use clock::{Clock, ManualClock, SystemClock};
pub use content::{ContentStore, PostDetail};
pub use engagement::EngagementEngine;
pub use feed::{FeedComposer, FeedItem};
pub use follow::FollowGraph;
pub use identity::{Authenticator, IdentityStore, PlaintextAuthenticator, UserProfile};
pub use metrics::NetworkMetrics;
pub use network::Network;
pub use notification::{NotificationCenter, RenderedNotification};
