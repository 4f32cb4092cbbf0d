//! # Storage Backends
//!
//! Concrete [`SocialStore`] choices for a [`Network`](crate::Network):
//! - `InMemory`: `MemoryStore` (fast, volatile)
//! - `Persistent`: `RedbStore` (disk-backed, ACID)

pub mod redb_store;

pub use redb_store::RedbStore;

use crate::store::{MemoryStore, SocialStore};
use crate::{
    Comment, LikeToggle, NewNotification, NewPost, Notification, Post, PostId, QuackError,
    Timestamp, User, Username,
};

/// Storage backend of a network.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory store (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    /// Check if this is the persistent backend.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, StorageBackend::Persistent(_))
    }

    /// Short name used in status output.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::InMemory(_) => "memory",
            StorageBackend::Persistent(_) => "redb",
        }
    }

    /// Compact the database file. The memory backend has nothing to compact.
    pub fn compact(&mut self) -> Result<bool, QuackError> {
        match self {
            StorageBackend::InMemory(_) => Ok(false),
            StorageBackend::Persistent(store) => store.compact(),
        }
    }
}

/// Forward a call to whichever store the backend holds.
macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            StorageBackend::InMemory($store) => $call,
            StorageBackend::Persistent($store) => $call,
        }
    };
}

impl SocialStore for StorageBackend {
    fn insert_user(&mut self, user: User) -> Result<(), QuackError> {
        dispatch!(self, s => s.insert_user(user))
    }

    fn get_user(&self, username: &Username) -> Result<Option<User>, QuackError> {
        dispatch!(self, s => s.get_user(username))
    }

    fn set_bio(&mut self, username: &Username, bio: &str) -> Result<(), QuackError> {
        dispatch!(self, s => s.set_bio(username, bio))
    }

    fn user_count(&self) -> Result<usize, QuackError> {
        dispatch!(self, s => s.user_count())
    }

    fn insert_follow(
        &mut self,
        follower: &Username,
        followed: &Username,
    ) -> Result<bool, QuackError> {
        dispatch!(self, s => s.insert_follow(follower, followed))
    }

    fn contains_follow(
        &self,
        follower: &Username,
        followed: &Username,
    ) -> Result<bool, QuackError> {
        dispatch!(self, s => s.contains_follow(follower, followed))
    }

    fn followers(&self, username: &Username) -> Result<Vec<Username>, QuackError> {
        dispatch!(self, s => s.followers(username))
    }

    fn following(&self, username: &Username) -> Result<Vec<Username>, QuackError> {
        dispatch!(self, s => s.following(username))
    }

    fn follow_count(&self) -> Result<usize, QuackError> {
        dispatch!(self, s => s.follow_count())
    }

    fn insert_post(&mut self, post: NewPost) -> Result<Post, QuackError> {
        dispatch!(self, s => s.insert_post(post))
    }

    fn get_post(&self, id: &PostId) -> Result<Option<Post>, QuackError> {
        dispatch!(self, s => s.get_post(id))
    }

    fn posts_by_owner(&self, owner: &Username) -> Result<Vec<Post>, QuackError> {
        dispatch!(self, s => s.posts_by_owner(owner))
    }

    fn all_posts(&self) -> Result<Vec<Post>, QuackError> {
        dispatch!(self, s => s.all_posts())
    }

    fn set_caption(&mut self, id: &PostId, caption: &str) -> Result<(), QuackError> {
        dispatch!(self, s => s.set_caption(id, caption))
    }

    fn post_count(&self) -> Result<usize, QuackError> {
        dispatch!(self, s => s.post_count())
    }

    fn toggle_like(
        &mut self,
        post: &PostId,
        username: &Username,
    ) -> Result<LikeToggle, QuackError> {
        dispatch!(self, s => s.toggle_like(post, username))
    }

    fn contains_like(&self, post: &PostId, username: &Username) -> Result<bool, QuackError> {
        dispatch!(self, s => s.contains_like(post, username))
    }

    fn likers(&self, post: &PostId) -> Result<Vec<Username>, QuackError> {
        dispatch!(self, s => s.likers(post))
    }

    fn like_count(&self, post: &PostId) -> Result<usize, QuackError> {
        dispatch!(self, s => s.like_count(post))
    }

    fn total_likes(&self) -> Result<usize, QuackError> {
        dispatch!(self, s => s.total_likes())
    }

    fn insert_comment(
        &mut self,
        post: &PostId,
        username: &Username,
        text: &str,
        created_at: Timestamp,
    ) -> Result<Comment, QuackError> {
        dispatch!(self, s => s.insert_comment(post, username, text, created_at))
    }

    fn comments(&self, post: &PostId) -> Result<Vec<Comment>, QuackError> {
        dispatch!(self, s => s.comments(post))
    }

    fn total_comments(&self) -> Result<usize, QuackError> {
        dispatch!(self, s => s.total_comments())
    }

    fn append_notification(
        &mut self,
        notification: NewNotification,
    ) -> Result<Notification, QuackError> {
        dispatch!(self, s => s.append_notification(notification))
    }

    fn notifications_for(&self, recipient: &Username) -> Result<Vec<Notification>, QuackError> {
        dispatch!(self, s => s.notifications_for(recipient))
    }

    fn total_notifications(&self) -> Result<usize, QuackError> {
        dispatch!(self, s => s.total_notifications())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backend_is_in_memory() {
        let backend = StorageBackend::default();
        assert!(!backend.is_persistent());
        assert_eq!(backend.name(), "memory");
        assert_eq!(backend.user_count().expect("count"), 0);
    }
}
