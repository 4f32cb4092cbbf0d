//! # Content Store
//!
//! Posts, likes and comments.
//!
//! - Like counts and comment lists are derived from their relations on
//!   every read, never cached on the post
//! - `toggle_like` is the only path that mutates the Likes relation
//! - Post listings are ordered newest first, ties broken by `PostId` descending

use crate::identity::IdentityStore;
use crate::primitives::{MAX_CAPTION_LENGTH, MAX_COMMENT_LENGTH, MAX_IMAGE_PATH_LENGTH};
use crate::store::SocialStore;
use crate::{Comment, LikeToggle, NewPost, Post, PostId, QuackError, Timestamp, Username};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A post together with its derived engagement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDetail {
    pub post: Post,
    pub like_count: usize,
    /// Oldest first.
    pub comments: Vec<Comment>,
}

/// Presentation order for posts: `created_at` descending, then `PostId` descending.
pub fn newest_first(a: &Post, b: &Post) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// The ContentStore owns the Posts, Likes and Comments relations.
pub struct ContentStore;

impl ContentStore {
    fn validate_caption(caption: &str) -> Result<(), QuackError> {
        if caption.len() > MAX_CAPTION_LENGTH {
            return Err(QuackError::ValidationFailed(format!(
                "caption longer than {} characters",
                MAX_CAPTION_LENGTH
            )));
        }
        Ok(())
    }

    /// Create a post for `owner`.
    ///
    /// The store assigns the owner's next sequence number in the same write
    /// as the insert.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if `owner` is not registered
    /// - `ValidationFailed` for an empty or over-long image path or an
    ///   over-long caption
    pub fn create_post<S: SocialStore>(
        store: &mut S,
        owner: &Username,
        image_path: &str,
        caption: &str,
        now: Timestamp,
    ) -> Result<Post, QuackError> {
        if image_path.is_empty() {
            return Err(QuackError::ValidationFailed(
                "image path must not be empty".to_string(),
            ));
        }
        if image_path.len() > MAX_IMAGE_PATH_LENGTH {
            return Err(QuackError::ValidationFailed(format!(
                "image path longer than {} characters",
                MAX_IMAGE_PATH_LENGTH
            )));
        }
        Self::validate_caption(caption)?;
        IdentityStore::ensure_exists(store, owner)?;

        let post = store.insert_post(NewPost {
            owner: owner.clone(),
            image_path: image_path.to_string(),
            caption: caption.to_string(),
            created_at: now,
        })?;
        tracing::info!(post = %post.id, "post created");
        Ok(post)
    }

    /// Fetch a post.
    pub fn get_post<S: SocialStore>(store: &S, id: &PostId) -> Result<Post, QuackError> {
        store
            .get_post(id)?
            .ok_or_else(|| QuackError::PostNotFound(id.clone()))
    }

    /// Fetch a post with its like count and comments.
    pub fn post_detail<S: SocialStore>(store: &S, id: &PostId) -> Result<PostDetail, QuackError> {
        let post = Self::get_post(store, id)?;
        Ok(PostDetail {
            like_count: store.like_count(id)?,
            comments: store.comments(id)?,
            post,
        })
    }

    /// Posts of one owner, newest first.
    pub fn posts_by_owner<S: SocialStore>(
        store: &S,
        owner: &Username,
    ) -> Result<Vec<Post>, QuackError> {
        let mut posts = store.posts_by_owner(owner)?;
        posts.sort_by(newest_first);
        Ok(posts)
    }

    /// Posts of several owners merged newest first. Empty input yields empty output.
    pub fn posts_by_owners<S: SocialStore>(
        store: &S,
        owners: &[Username],
    ) -> Result<Vec<Post>, QuackError> {
        let mut posts = Vec::new();
        for owner in owners {
            posts.extend(store.posts_by_owner(owner)?);
        }
        posts.sort_by(newest_first);
        Ok(posts)
    }

    /// Every post, newest first.
    pub fn all_posts<S: SocialStore>(store: &S) -> Result<Vec<Post>, QuackError> {
        let mut posts = store.all_posts()?;
        posts.sort_by(newest_first);
        Ok(posts)
    }

    /// Replace a post's caption.
    pub fn update_caption<S: SocialStore>(
        store: &mut S,
        id: &PostId,
        caption: &str,
    ) -> Result<(), QuackError> {
        Self::validate_caption(caption)?;
        store.set_caption(id, caption)
    }

    /// Append a comment. Comments are never edited or removed.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for empty or over-long text
    /// - `UserNotFound` if the commenter is not registered
    /// - `PostNotFound` if the post does not exist
    pub fn add_comment<S: SocialStore>(
        store: &mut S,
        id: &PostId,
        username: &Username,
        text: &str,
        now: Timestamp,
    ) -> Result<Comment, QuackError> {
        if text.trim().is_empty() {
            return Err(QuackError::ValidationFailed(
                "comment must not be empty".to_string(),
            ));
        }
        if text.len() > MAX_COMMENT_LENGTH {
            return Err(QuackError::ValidationFailed(format!(
                "comment longer than {} characters",
                MAX_COMMENT_LENGTH
            )));
        }
        IdentityStore::ensure_exists(store, username)?;
        store.insert_comment(id, username, text, now)
    }

    /// Flip the like of `username` on a post.
    pub fn toggle_like<S: SocialStore>(
        store: &mut S,
        id: &PostId,
        username: &Username,
    ) -> Result<LikeToggle, QuackError> {
        IdentityStore::ensure_exists(store, username)?;
        store.toggle_like(id, username)
    }

    /// Number of likes on a post.
    pub fn like_count<S: SocialStore>(store: &S, id: &PostId) -> Result<usize, QuackError> {
        Self::get_post(store, id)?;
        store.like_count(id)
    }

    /// Comments on a post, oldest first.
    pub fn comments<S: SocialStore>(store: &S, id: &PostId) -> Result<Vec<Comment>, QuackError> {
        Self::get_post(store, id)?;
        store.comments(id)
    }

    /// Number of comments on a post.
    pub fn comment_count<S: SocialStore>(store: &S, id: &PostId) -> Result<usize, QuackError> {
        Ok(Self::comments(store, id)?.len())
    }

    /// Check whether `username` likes a post.
    pub fn is_liked_by<S: SocialStore>(
        store: &S,
        id: &PostId,
        username: &Username,
    ) -> Result<bool, QuackError> {
        store.contains_like(id, username)
    }
}
