//! # Network
//!
//! The handle every surface works through.
//!
//! A `Network` owns one storage backend, the clock that stamps every write,
//! and the authenticator used for credential checks. It is constructed
//! explicitly and passed in; nothing in the engine reaches for a global
//! connection.
//!
//! ## Storage Backends
//!
//! - `InMemory`: [`MemoryStore`](crate::MemoryStore) (fast, volatile)
//! - `Persistent`: [`RedbStore`](crate::RedbStore) (disk-backed, ACID)

use crate::clock::{Clock, SystemClock};
use crate::content::{ContentStore, PostDetail};
use crate::engagement::EngagementEngine;
use crate::feed::{FeedComposer, FeedItem};
use crate::follow::FollowGraph;
use crate::identity::{Authenticator, IdentityStore, PlaintextAuthenticator, UserProfile};
use crate::metrics::NetworkMetrics;
use crate::notification::{NotificationCenter, RenderedNotification};
use crate::storage::{RedbStore, StorageBackend};
use crate::{
    Comment, LikeToggle, Notification, Post, PostId, QuackError, Role, SourceType, Timestamp,
    User, Username,
};
use std::path::Path;

/// A social network instance: storage, clock and authenticator.
pub struct Network {
    backend: StorageBackend,
    clock: Box<dyn Clock>,
    authenticator: Box<dyn Authenticator>,
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::with_backend(StorageBackend::default())
    }
}

impl Network {
    /// Create a network with in-memory storage, the system clock and
    /// plaintext credential checks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a network with persistent redb storage.
    ///
    /// Opens or creates a redb database at the given path.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, QuackError> {
        let store = RedbStore::open(path)?;
        Ok(Self::with_backend(StorageBackend::Persistent(store)))
    }

    /// Create a network over an existing backend.
    #[must_use]
    pub fn with_backend(backend: StorageBackend) -> Self {
        Self {
            backend,
            clock: Box::new(SystemClock),
            authenticator: Box::new(PlaintextAuthenticator),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the authenticator.
    #[must_use]
    pub fn with_authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticator = Box::new(authenticator);
        self
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.backend.is_persistent()
    }

    /// Name of the storage backend (`"memory"` or `"redb"`).
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Reclaim free space in the database file.
    ///
    /// Returns `Ok(true)` if the file was compacted, `Ok(false)` if there
    /// was nothing to do or the backend is in memory.
    pub fn compact(&mut self) -> Result<bool, QuackError> {
        let compacted = self.backend.compact()?;
        tracing::info!(backend = self.backend.name(), compacted, "compaction finished");
        Ok(compacted)
    }

    /// Current time according to the injected clock.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // =========================================================================
    // IDENTITY
    // =========================================================================

    /// Register a new user.
    pub fn register(
        &mut self,
        username: &str,
        bio: &str,
        secret: &str,
        role: Role,
    ) -> Result<UserProfile, QuackError> {
        IdentityStore::register(&mut self.backend, username, bio, secret, role)
    }

    /// Fetch a user record.
    pub fn user(&self, username: &Username) -> Result<User, QuackError> {
        IdentityStore::get_user(&self.backend, username)
    }

    /// Public profile with derived counters.
    pub fn profile(&self, username: &Username) -> Result<UserProfile, QuackError> {
        IdentityStore::profile(&self.backend, username)
    }

    /// Replace a user's bio.
    pub fn update_bio(&mut self, username: &Username, bio: &str) -> Result<(), QuackError> {
        IdentityStore::update_bio(&mut self.backend, username, bio)
    }

    /// Check a secret against a user's stored credential.
    pub fn verify_credential(&self, username: &Username, secret: &str) -> Result<bool, QuackError> {
        IdentityStore::verify_credential(
            &self.backend,
            self.authenticator.as_ref(),
            username,
            secret,
        )
    }

    // =========================================================================
    // FOLLOW GRAPH
    // =========================================================================

    /// Follow a user; the followed user is notified.
    pub fn follow(&mut self, follower: &Username, followed: &Username) -> Result<(), QuackError> {
        let now = self.clock.now();
        EngagementEngine::follow_with_notification(&mut self.backend, follower, followed, now)
    }

    /// Check whether `follower` follows `followed`.
    pub fn is_following(
        &self,
        follower: &Username,
        followed: &Username,
    ) -> Result<bool, QuackError> {
        FollowGraph::is_following(&self.backend, follower, followed)
    }

    /// Users following `username`, sorted.
    pub fn followers(&self, username: &Username) -> Result<Vec<Username>, QuackError> {
        FollowGraph::list_followers(&self.backend, username)
    }

    /// Users `username` follows, sorted.
    pub fn following(&self, username: &Username) -> Result<Vec<Username>, QuackError> {
        FollowGraph::list_following(&self.backend, username)
    }

    // =========================================================================
    // CONTENT
    // =========================================================================

    /// Upload a post.
    pub fn create_post(
        &mut self,
        owner: &Username,
        image_path: &str,
        caption: &str,
    ) -> Result<Post, QuackError> {
        let now = self.clock.now();
        ContentStore::create_post(&mut self.backend, owner, image_path, caption, now)
    }

    /// Fetch a post.
    pub fn post(&self, id: &PostId) -> Result<Post, QuackError> {
        ContentStore::get_post(&self.backend, id)
    }

    /// Fetch a post with like count and comments.
    pub fn post_detail(&self, id: &PostId) -> Result<PostDetail, QuackError> {
        ContentStore::post_detail(&self.backend, id)
    }

    /// Posts of one owner, newest first.
    pub fn posts_by_owner(&self, owner: &Username) -> Result<Vec<Post>, QuackError> {
        ContentStore::posts_by_owner(&self.backend, owner)
    }

    /// Posts of several owners, newest first.
    pub fn posts_by_owners(&self, owners: &[Username]) -> Result<Vec<Post>, QuackError> {
        ContentStore::posts_by_owners(&self.backend, owners)
    }

    /// Every post, newest first.
    pub fn all_posts(&self) -> Result<Vec<Post>, QuackError> {
        ContentStore::all_posts(&self.backend)
    }

    /// Replace a post's caption.
    pub fn update_caption(&mut self, id: &PostId, caption: &str) -> Result<(), QuackError> {
        ContentStore::update_caption(&mut self.backend, id, caption)
    }

    /// Number of likes on a post.
    pub fn like_count(&self, id: &PostId) -> Result<usize, QuackError> {
        ContentStore::like_count(&self.backend, id)
    }

    /// Comments on a post, oldest first.
    pub fn comments(&self, id: &PostId) -> Result<Vec<Comment>, QuackError> {
        ContentStore::comments(&self.backend, id)
    }

    /// Number of comments on a post.
    pub fn comment_count(&self, id: &PostId) -> Result<usize, QuackError> {
        ContentStore::comment_count(&self.backend, id)
    }

    /// Check whether `username` likes a post.
    pub fn is_liked_by(&self, id: &PostId, username: &Username) -> Result<bool, QuackError> {
        ContentStore::is_liked_by(&self.backend, id, username)
    }

    // =========================================================================
    // ENGAGEMENT
    // =========================================================================

    /// Toggle a like; the owner is notified on `Liked` unless they are the actor.
    pub fn like(&mut self, actor: &Username, post: &PostId) -> Result<LikeToggle, QuackError> {
        let now = self.clock.now();
        EngagementEngine::like(&mut self.backend, actor, post, now)
    }

    /// Comment on a post; the owner is notified unless they are the actor.
    pub fn comment(
        &mut self,
        actor: &Username,
        post: &PostId,
        text: &str,
    ) -> Result<Comment, QuackError> {
        let now = self.clock.now();
        EngagementEngine::comment(&mut self.backend, actor, post, text, now)
    }

    // =========================================================================
    // FEEDS
    // =========================================================================

    /// Home feed of `viewer`.
    pub fn feed(&self, viewer: &Username) -> Result<Vec<FeedItem>, QuackError> {
        FeedComposer::compose_feed(&self.backend, viewer)
    }

    /// Every post, decorated for an optional viewer.
    pub fn explore(&self, viewer: Option<&Username>) -> Result<Vec<FeedItem>, QuackError> {
        FeedComposer::explore(&self.backend, viewer)
    }

    // =========================================================================
    // NOTIFICATIONS
    // =========================================================================

    /// Append a notification directly, e.g. a system message of kind `Other`.
    pub fn notify(
        &mut self,
        recipient: &Username,
        text: &str,
        source_type: SourceType,
        source_id: &str,
    ) -> Result<Notification, QuackError> {
        IdentityStore::ensure_exists(&self.backend, recipient)?;
        let now = self.clock.now();
        NotificationCenter::append(&mut self.backend, recipient, text, source_type, source_id, now)
    }

    /// Notifications of `recipient`, newest first.
    pub fn notifications(&self, recipient: &Username) -> Result<Vec<Notification>, QuackError> {
        NotificationCenter::list_for(&self.backend, recipient)
    }

    /// Notifications of `recipient`, newest first, with display messages
    /// rendered against the current time.
    pub fn rendered_notifications(
        &self,
        recipient: &Username,
    ) -> Result<Vec<RenderedNotification>, QuackError> {
        let now = self.clock.now();
        Ok(self
            .notifications(recipient)?
            .iter()
            .map(|n| NotificationCenter::to_rendered(n, now))
            .collect())
    }

    /// Display message of one notification at the current time.
    #[must_use]
    pub fn render_notification(&self, notification: &Notification) -> String {
        NotificationCenter::render(notification, self.clock.now())
    }

    // =========================================================================
    // METRICS
    // =========================================================================

    /// Row counts across all relations.
    pub fn metrics(&self) -> Result<NetworkMetrics, QuackError> {
        NetworkMetrics::collect(&self.backend)
    }
}
