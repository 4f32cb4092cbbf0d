//! # Network Metrics
//!
//! Row counts across the six relations, recomputed on every call.

use crate::QuackError;
use crate::store::SocialStore;
use serde::{Deserialize, Serialize};

/// Snapshot of relation sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub users: usize,
    pub follows: usize,
    pub posts: usize,
    pub likes: usize,
    pub comments: usize,
    pub notifications: usize,
    /// Average follow edges per user, as fixed-point millionths (integer only).
    pub follows_per_user_millionths: u64,
}

impl NetworkMetrics {
    /// Count every relation in `store`.
    pub fn collect<S: SocialStore>(store: &S) -> Result<Self, QuackError> {
        let users = store.user_count()?;
        let follows = store.follow_count()?;
        let follows_per_user_millionths = (follows as u64)
            .saturating_mul(1_000_000)
            .checked_div(users as u64)
            .unwrap_or(0);

        Ok(Self {
            users,
            follows,
            posts: store.post_count()?,
            likes: store.total_likes()?,
            comments: store.total_comments()?,
            notifications: store.total_notifications()?,
            follows_per_user_millionths,
        })
    }
}
