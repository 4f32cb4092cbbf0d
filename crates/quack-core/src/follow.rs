//! # Follow Graph
//!
//! Directed follow edges between users.
//!
//! Rules, checked in this order:
//! 1. No self-edges (`SelfFollow`)
//! 2. Both endpoints must be registered (`UserNotFound`)
//! 3. No duplicate edges (`AlreadyFollowing`)
//!
//! There is no unfollow; edges are permanent once inserted.

use crate::identity::IdentityStore;
use crate::store::SocialStore;
use crate::{QuackError, Username};

/// The FollowGraph owns the Follows relation.
pub struct FollowGraph;

impl FollowGraph {
    /// Insert the edge `follower -> followed`.
    ///
    /// The duplicate check and the insert are one store operation, so two
    /// concurrent follows of the same pair yield exactly one edge and one
    /// `AlreadyFollowing`.
    pub fn follow<S: SocialStore>(
        store: &mut S,
        follower: &Username,
        followed: &Username,
    ) -> Result<(), QuackError> {
        if follower == followed {
            return Err(QuackError::SelfFollow(follower.clone()));
        }
        IdentityStore::ensure_exists(store, follower)?;
        IdentityStore::ensure_exists(store, followed)?;

        if !store.insert_follow(follower, followed)? {
            return Err(QuackError::AlreadyFollowing {
                follower: follower.clone(),
                followed: followed.clone(),
            });
        }
        tracing::debug!(%follower, %followed, "follow edge inserted");
        Ok(())
    }

    /// Check whether `follower` follows `followed`.
    pub fn is_following<S: SocialStore>(
        store: &S,
        follower: &Username,
        followed: &Username,
    ) -> Result<bool, QuackError> {
        store.contains_follow(follower, followed)
    }

    /// Users following `username`, sorted by name.
    pub fn list_followers<S: SocialStore>(
        store: &S,
        username: &Username,
    ) -> Result<Vec<Username>, QuackError> {
        let mut followers = store.followers(username)?;
        followers.sort();
        Ok(followers)
    }

    /// Users `username` follows, sorted by name.
    pub fn list_following<S: SocialStore>(
        store: &S,
        username: &Username,
    ) -> Result<Vec<Username>, QuackError> {
        let mut following = store.following(username)?;
        following.sort();
        Ok(following)
    }
}
