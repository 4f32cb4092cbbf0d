//! # Feed Composer
//!
//! Home feed and explore listing.
//!
//! A home feed is a snapshot of the posts of everyone the viewer follows,
//! newest first. It never falls back to all posts and never includes the
//! viewer's own posts unless they follow themselves, which the follow
//! rules forbid. Like counts and the viewer's like state are computed at
//! composition time.

use crate::content::ContentStore;
use crate::follow::FollowGraph;
use crate::store::SocialStore;
use crate::{Post, PostId, QuackError, Timestamp, Username};
use serde::{Deserialize, Serialize};

/// One entry of a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub post_id: PostId,
    pub owner: Username,
    pub caption: String,
    pub image_path: String,
    pub created_at: Timestamp,
    pub like_count: usize,
    pub is_liked_by_viewer: bool,
}

/// The FeedComposer derives feeds from the follow graph and content.
pub struct FeedComposer;

impl FeedComposer {
    /// Compose `viewer`'s home feed.
    ///
    /// Empty when the viewer follows nobody (including when the viewer is
    /// not registered, since an unknown user has no edges).
    pub fn compose_feed<S: SocialStore>(
        store: &S,
        viewer: &Username,
    ) -> Result<Vec<FeedItem>, QuackError> {
        let following = FollowGraph::list_following(store, viewer)?;
        if following.is_empty() {
            return Ok(Vec::new());
        }
        let posts = ContentStore::posts_by_owners(store, &following)?;
        Self::decorate(store, posts, Some(viewer))
    }

    /// Every post, newest first.
    ///
    /// `is_liked_by_viewer` is `false` throughout when there is no viewer.
    pub fn explore<S: SocialStore>(
        store: &S,
        viewer: Option<&Username>,
    ) -> Result<Vec<FeedItem>, QuackError> {
        let posts = ContentStore::all_posts(store)?;
        Self::decorate(store, posts, viewer)
    }

    fn decorate<S: SocialStore>(
        store: &S,
        posts: Vec<Post>,
        viewer: Option<&Username>,
    ) -> Result<Vec<FeedItem>, QuackError> {
        let mut items = Vec::with_capacity(posts.len());
        for post in posts {
            let like_count = store.like_count(&post.id)?;
            let is_liked_by_viewer = match viewer {
                Some(v) => store.contains_like(&post.id, v)?,
                None => false,
            };
            items.push(FeedItem {
                owner: post.id.owner.clone(),
                post_id: post.id,
                caption: post.caption,
                image_path: post.image_path,
                created_at: post.created_at,
                like_count,
                is_liked_by_viewer,
            });
        }
        Ok(items)
    }
}
