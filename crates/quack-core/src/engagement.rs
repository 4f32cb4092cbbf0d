//! # Engagement Engine
//!
//! User actions that touch someone else's content and notify them.
//!
//! Every surface (CLI, HTTP) goes through these functions, so the
//! self-engagement rule lives in exactly one place: liking or commenting
//! on your own post never notifies you.
//!
//! Notification fan-out is best-effort. Once the primary write has
//! committed, a failure to append the notification is logged and swallowed;
//! the like, comment or follow stands.

use crate::content::ContentStore;
use crate::follow::FollowGraph;
use crate::notification::NotificationCenter;
use crate::primitives::{comment_notification_text, follow_notification_text, like_notification_text};
use crate::store::SocialStore;
use crate::{Comment, LikeToggle, PostId, QuackError, SourceType, Timestamp, Username};

/// The EngagementEngine applies likes, comments and follows with fan-out.
pub struct EngagementEngine;

impl EngagementEngine {
    /// Toggle `actor`'s like on a post.
    ///
    /// On `Liked`, the owner is notified unless they are the actor.
    /// `Unliked` emits nothing and retracts nothing.
    pub fn like<S: SocialStore>(
        store: &mut S,
        actor: &Username,
        post: &PostId,
        now: Timestamp,
    ) -> Result<LikeToggle, QuackError> {
        let toggle = ContentStore::toggle_like(store, post, actor)?;
        if toggle.is_liked() && actor != &post.owner {
            Self::notify(
                store,
                &post.owner,
                &like_notification_text(actor.as_str()),
                SourceType::Like,
                actor,
                now,
            );
        }
        Ok(toggle)
    }

    /// Add `actor`'s comment to a post and notify the owner unless they are the actor.
    pub fn comment<S: SocialStore>(
        store: &mut S,
        actor: &Username,
        post: &PostId,
        text: &str,
        now: Timestamp,
    ) -> Result<Comment, QuackError> {
        let comment = ContentStore::add_comment(store, post, actor, text, now)?;
        if actor != &post.owner {
            Self::notify(
                store,
                &post.owner,
                &comment_notification_text(actor.as_str()),
                SourceType::Comment,
                actor,
                now,
            );
        }
        Ok(comment)
    }

    /// Follow a user and notify them.
    pub fn follow_with_notification<S: SocialStore>(
        store: &mut S,
        follower: &Username,
        followed: &Username,
        now: Timestamp,
    ) -> Result<(), QuackError> {
        FollowGraph::follow(store, follower, followed)?;
        Self::notify(
            store,
            followed,
            &follow_notification_text(follower.as_str()),
            SourceType::Follow,
            follower,
            now,
        );
        Ok(())
    }

    fn notify<S: SocialStore>(
        store: &mut S,
        recipient: &Username,
        text: &str,
        source_type: SourceType,
        source: &Username,
        now: Timestamp,
    ) {
        if let Err(e) =
            NotificationCenter::append(store, recipient, text, source_type, source.as_str(), now)
        {
            tracing::warn!(
                recipient = %recipient,
                source_type = %source_type,
                error = %e,
                "notification dropped"
            );
        }
    }
}
