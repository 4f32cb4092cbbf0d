//! # Social Store
//!
//! The storage boundary of the engine and its in-memory implementation.
//!
//! `SocialStore` exposes the six relations (Users, Follows, Posts, Likes,
//! Comments, Notifications) as typed row operations. Every operation that
//! must check-then-write (follow uniqueness, like toggling, per-owner post
//! sequence assignment) is a single trait method, so each backend performs
//! it inside one exclusive write.

use crate::{
    Comment, LikeToggle, NewNotification, NewPost, Notification, Post, PostId, QuackError,
    Timestamp, User, Username,
};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// SOCIALSTORE TRAIT
// =============================================================================

/// The SocialStore trait defines the row operations of the six relations.
///
/// All fallible operations return `Result<T, QuackError>` so in-memory and
/// persistent backends behave identically. Listing methods return rows in
/// key order; components apply the presentation order.
pub trait SocialStore {
    // --- Users ---

    /// Insert a new user. Fails with `UsernameTaken` if the name exists.
    fn insert_user(&mut self, user: User) -> Result<(), QuackError>;

    /// Look up a user by name.
    fn get_user(&self, username: &Username) -> Result<Option<User>, QuackError>;

    /// Replace a user's bio. Fails with `UserNotFound`.
    fn set_bio(&mut self, username: &Username, bio: &str) -> Result<(), QuackError>;

    /// Number of registered users.
    fn user_count(&self) -> Result<usize, QuackError>;

    // --- Follows ---

    /// Insert the edge `follower -> followed`.
    ///
    /// Returns `Ok(false)` without writing if the edge already exists.
    fn insert_follow(&mut self, follower: &Username, followed: &Username)
    -> Result<bool, QuackError>;

    /// Check whether `follower -> followed` exists.
    fn contains_follow(&self, follower: &Username, followed: &Username)
    -> Result<bool, QuackError>;

    /// Users following `username`, sorted.
    fn followers(&self, username: &Username) -> Result<Vec<Username>, QuackError>;

    /// Users `username` follows, sorted.
    fn following(&self, username: &Username) -> Result<Vec<Username>, QuackError>;

    /// Number of follow edges.
    fn follow_count(&self) -> Result<usize, QuackError>;

    // --- Posts ---

    /// Insert a post, assigning the owner's next sequence number in the same write.
    fn insert_post(&mut self, post: NewPost) -> Result<Post, QuackError>;

    /// Look up a post.
    fn get_post(&self, id: &PostId) -> Result<Option<Post>, QuackError>;

    /// All posts of one owner, in sequence order.
    fn posts_by_owner(&self, owner: &Username) -> Result<Vec<Post>, QuackError>;

    /// Every post, in id order.
    fn all_posts(&self) -> Result<Vec<Post>, QuackError>;

    /// Replace a post's caption. Fails with `PostNotFound`.
    fn set_caption(&mut self, id: &PostId, caption: &str) -> Result<(), QuackError>;

    /// Number of posts.
    fn post_count(&self) -> Result<usize, QuackError>;

    // --- Likes ---

    /// Flip the like of `username` on `post` and report the resulting state.
    ///
    /// Fails with `PostNotFound`. The check and the write are one operation.
    fn toggle_like(&mut self, post: &PostId, username: &Username)
    -> Result<LikeToggle, QuackError>;

    /// Check whether `username` likes `post`.
    fn contains_like(&self, post: &PostId, username: &Username) -> Result<bool, QuackError>;

    /// Users who like `post`, sorted.
    fn likers(&self, post: &PostId) -> Result<Vec<Username>, QuackError>;

    /// Number of like rows for `post`.
    fn like_count(&self, post: &PostId) -> Result<usize, QuackError> {
        Ok(self.likers(post)?.len())
    }

    /// Number of like rows across all posts.
    fn total_likes(&self) -> Result<usize, QuackError>;

    // --- Comments ---

    /// Append a comment to `post`. Fails with `PostNotFound`.
    fn insert_comment(
        &mut self,
        post: &PostId,
        username: &Username,
        text: &str,
        created_at: Timestamp,
    ) -> Result<Comment, QuackError>;

    /// Comments of `post` in insertion order.
    fn comments(&self, post: &PostId) -> Result<Vec<Comment>, QuackError>;

    /// Number of comments across all posts.
    fn total_comments(&self) -> Result<usize, QuackError>;

    // --- Notifications ---

    /// Append a notification, assigning its id.
    fn append_notification(
        &mut self,
        notification: NewNotification,
    ) -> Result<Notification, QuackError>;

    /// Notifications addressed to `recipient`, in id order.
    fn notifications_for(&self, recipient: &Username) -> Result<Vec<Notification>, QuackError>;

    /// Number of notifications across all recipients.
    fn total_notifications(&self) -> Result<usize, QuackError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-memory implementation of [`SocialStore`].
///
/// Uses `BTreeMap`/`BTreeSet` exclusively so every listing is ordered.
/// Volatile: data is lost when the store is dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    users: BTreeMap<Username, User>,
    /// (follower, followed)
    follows: BTreeSet<(Username, Username)>,
    /// (followed, follower), reverse index of `follows`
    followers: BTreeSet<(Username, Username)>,
    posts: BTreeMap<PostId, Post>,
    /// Last sequence number handed out per owner.
    post_seq: BTreeMap<Username, u64>,
    likes: BTreeSet<(PostId, Username)>,
    comments: BTreeMap<(PostId, u64), Comment>,
    notifications: BTreeMap<(Username, u64), Notification>,
    next_comment_id: u64,
    next_notification_id: u64,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Second elements of all pairs in `set` whose first element is `first`.
    fn seconds(set: &BTreeSet<(Username, Username)>, first: &Username) -> Vec<Username> {
        set.range((first.clone(), Username::new(""))..)
            .take_while(|(a, _)| a == first)
            .map(|(_, b)| b.clone())
            .collect()
    }
}

impl SocialStore for MemoryStore {
    fn insert_user(&mut self, user: User) -> Result<(), QuackError> {
        if self.users.contains_key(&user.username) {
            return Err(QuackError::UsernameTaken(user.username));
        }
        self.users.insert(user.username.clone(), user);
        Ok(())
    }

    fn get_user(&self, username: &Username) -> Result<Option<User>, QuackError> {
        Ok(self.users.get(username).cloned())
    }

    fn set_bio(&mut self, username: &Username, bio: &str) -> Result<(), QuackError> {
        let user = self
            .users
            .get_mut(username)
            .ok_or_else(|| QuackError::UserNotFound(username.clone()))?;
        user.bio = bio.to_string();
        Ok(())
    }

    fn user_count(&self) -> Result<usize, QuackError> {
        Ok(self.users.len())
    }

    fn insert_follow(
        &mut self,
        follower: &Username,
        followed: &Username,
    ) -> Result<bool, QuackError> {
        let inserted = self.follows.insert((follower.clone(), followed.clone()));
        if inserted {
            self.followers.insert((followed.clone(), follower.clone()));
        }
        Ok(inserted)
    }

    fn contains_follow(
        &self,
        follower: &Username,
        followed: &Username,
    ) -> Result<bool, QuackError> {
        Ok(self
            .follows
            .contains(&(follower.clone(), followed.clone())))
    }

    fn followers(&self, username: &Username) -> Result<Vec<Username>, QuackError> {
        Ok(Self::seconds(&self.followers, username))
    }

    fn following(&self, username: &Username) -> Result<Vec<Username>, QuackError> {
        Ok(Self::seconds(&self.follows, username))
    }

    fn follow_count(&self) -> Result<usize, QuackError> {
        Ok(self.follows.len())
    }

    fn insert_post(&mut self, post: NewPost) -> Result<Post, QuackError> {
        let seq = self
            .post_seq
            .get(&post.owner)
            .copied()
            .unwrap_or(0)
            .saturating_add(1);
        let id = PostId::new(post.owner.clone(), seq);
        let row = Post {
            id: id.clone(),
            image_path: post.image_path,
            caption: post.caption,
            created_at: post.created_at,
        };
        self.post_seq.insert(post.owner, seq);
        self.posts.insert(id, row.clone());
        Ok(row)
    }

    fn get_post(&self, id: &PostId) -> Result<Option<Post>, QuackError> {
        Ok(self.posts.get(id).cloned())
    }

    fn posts_by_owner(&self, owner: &Username) -> Result<Vec<Post>, QuackError> {
        Ok(self
            .posts
            .range(PostId::new(owner.clone(), 0)..=PostId::new(owner.clone(), u64::MAX))
            .map(|(_, post)| post.clone())
            .collect())
    }

    fn all_posts(&self) -> Result<Vec<Post>, QuackError> {
        Ok(self.posts.values().cloned().collect())
    }

    fn set_caption(&mut self, id: &PostId, caption: &str) -> Result<(), QuackError> {
        let post = self
            .posts
            .get_mut(id)
            .ok_or_else(|| QuackError::PostNotFound(id.clone()))?;
        post.caption = caption.to_string();
        Ok(())
    }

    fn post_count(&self) -> Result<usize, QuackError> {
        Ok(self.posts.len())
    }

    fn toggle_like(
        &mut self,
        post: &PostId,
        username: &Username,
    ) -> Result<LikeToggle, QuackError> {
        if !self.posts.contains_key(post) {
            return Err(QuackError::PostNotFound(post.clone()));
        }
        let key = (post.clone(), username.clone());
        if self.likes.remove(&key) {
            Ok(LikeToggle::Unliked)
        } else {
            self.likes.insert(key);
            Ok(LikeToggle::Liked)
        }
    }

    fn contains_like(&self, post: &PostId, username: &Username) -> Result<bool, QuackError> {
        Ok(self.likes.contains(&(post.clone(), username.clone())))
    }

    fn likers(&self, post: &PostId) -> Result<Vec<Username>, QuackError> {
        Ok(self
            .likes
            .range((post.clone(), Username::new(""))..)
            .take_while(|(p, _)| p == post)
            .map(|(_, u)| u.clone())
            .collect())
    }

    fn total_likes(&self) -> Result<usize, QuackError> {
        Ok(self.likes.len())
    }

    fn insert_comment(
        &mut self,
        post: &PostId,
        username: &Username,
        text: &str,
        created_at: Timestamp,
    ) -> Result<Comment, QuackError> {
        if !self.posts.contains_key(post) {
            return Err(QuackError::PostNotFound(post.clone()));
        }
        let id = self.next_comment_id;
        self.next_comment_id = self.next_comment_id.saturating_add(1);
        let comment = Comment {
            id,
            post: post.clone(),
            username: username.clone(),
            text: text.to_string(),
            created_at,
        };
        self.comments.insert((post.clone(), id), comment.clone());
        Ok(comment)
    }

    fn comments(&self, post: &PostId) -> Result<Vec<Comment>, QuackError> {
        Ok(self
            .comments
            .range((post.clone(), 0)..=(post.clone(), u64::MAX))
            .map(|(_, c)| c.clone())
            .collect())
    }

    fn total_comments(&self) -> Result<usize, QuackError> {
        Ok(self.comments.len())
    }

    fn append_notification(
        &mut self,
        notification: NewNotification,
    ) -> Result<Notification, QuackError> {
        let id = self.next_notification_id;
        self.next_notification_id = self.next_notification_id.saturating_add(1);
        let row = Notification {
            id,
            recipient: notification.recipient,
            text: notification.text,
            source_type: notification.source_type,
            source_id: notification.source_id,
            timestamp: notification.timestamp,
        };
        self.notifications
            .insert((row.recipient.clone(), id), row.clone());
        Ok(row)
    }

    fn notifications_for(&self, recipient: &Username) -> Result<Vec<Notification>, QuackError> {
        Ok(self
            .notifications
            .range((recipient.clone(), 0)..=(recipient.clone(), u64::MAX))
            .map(|(_, n)| n.clone())
            .collect())
    }

    fn total_notifications(&self) -> Result<usize, QuackError> {
        Ok(self.notifications.len())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Credential, Role, SourceType};
    use chrono::{TimeZone, Utc};

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    fn user(name: &str) -> User {
        User::new(Username::new(name), "", Credential::new("pw"), Role::Regular)
    }

    fn new_post(owner: &str) -> NewPost {
        NewPost {
            owner: Username::new(owner),
            image_path: format!("img/uploaded/{}.png", owner),
            caption: "caption".to_string(),
            created_at: at(0),
        }
    }

    #[test]
    fn duplicate_username_rejected() {
        let mut store = MemoryStore::new();
        store.insert_user(user("alice")).expect("insert");
        let err = store.insert_user(user("alice")).expect_err("duplicate");
        assert!(matches!(err, QuackError::UsernameTaken(_)));
        assert_eq!(store.user_count().expect("count"), 1);
    }

    #[test]
    fn follow_edges_indexed_both_ways() {
        let mut store = MemoryStore::new();
        let a = Username::new("a");
        let b = Username::new("b");
        let c = Username::new("c");

        assert!(store.insert_follow(&a, &b).expect("follow"));
        assert!(store.insert_follow(&c, &b).expect("follow"));
        assert!(!store.insert_follow(&a, &b).expect("follow again"));

        assert_eq!(store.followers(&b).expect("followers"), vec![a.clone(), c]);
        assert_eq!(store.following(&a).expect("following"), vec![b]);
        assert_eq!(store.follow_count().expect("count"), 2);
    }

    #[test]
    fn following_does_not_leak_prefix_matches() {
        let mut store = MemoryStore::new();
        let ann = Username::new("ann");
        let anna = Username::new("anna");
        let bob = Username::new("bob");
        store.insert_follow(&anna, &bob).expect("follow");

        assert!(store.following(&ann).expect("following").is_empty());
    }

    #[test]
    fn post_sequence_is_per_owner() {
        let mut store = MemoryStore::new();
        let p1 = store.insert_post(new_post("bob")).expect("insert");
        let p2 = store.insert_post(new_post("bob")).expect("insert");
        let q1 = store.insert_post(new_post("carol")).expect("insert");

        assert_eq!(p1.id.to_string(), "bob_1");
        assert_eq!(p2.id.to_string(), "bob_2");
        assert_eq!(q1.id.to_string(), "carol_1");
        assert_eq!(
            store.posts_by_owner(&Username::new("bob")).expect("posts").len(),
            2
        );
    }

    #[test]
    fn toggle_like_round_trip() {
        let mut store = MemoryStore::new();
        let post = store.insert_post(new_post("bob")).expect("insert");
        let alice = Username::new("alice");

        assert_eq!(
            store.toggle_like(&post.id, &alice).expect("toggle"),
            LikeToggle::Liked
        );
        assert_eq!(store.like_count(&post.id).expect("count"), 1);
        assert_eq!(
            store.toggle_like(&post.id, &alice).expect("toggle"),
            LikeToggle::Unliked
        );
        assert!(!store.contains_like(&post.id, &alice).expect("contains"));
        assert_eq!(store.like_count(&post.id).expect("count"), 0);
    }

    #[test]
    fn toggle_like_on_missing_post_fails() {
        let mut store = MemoryStore::new();
        let id = PostId::new(Username::new("ghost"), 1);
        let err = store
            .toggle_like(&id, &Username::new("alice"))
            .expect_err("missing post");
        assert!(matches!(err, QuackError::PostNotFound(_)));
        assert_eq!(store.total_likes().expect("count"), 0);
    }

    #[test]
    fn comments_keep_insertion_order() {
        let mut store = MemoryStore::new();
        let post = store.insert_post(new_post("bob")).expect("insert");
        let alice = Username::new("alice");

        store
            .insert_comment(&post.id, &alice, "first", at(10))
            .expect("comment");
        store
            .insert_comment(&post.id, &alice, "second", at(5))
            .expect("comment");

        let texts: Vec<_> = store
            .comments(&post.id)
            .expect("comments")
            .into_iter()
            .map(|c| c.text)
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn notifications_are_per_recipient() {
        let mut store = MemoryStore::new();
        for recipient in ["bob", "carol", "bob"] {
            store
                .append_notification(NewNotification {
                    recipient: Username::new(recipient),
                    text: "hi".to_string(),
                    source_type: SourceType::Other,
                    source_id: "system".to_string(),
                    timestamp: at(0),
                })
                .expect("append");
        }

        let bob = store
            .notifications_for(&Username::new("bob"))
            .expect("list");
        assert_eq!(bob.len(), 2);
        assert!(bob[0].id < bob[1].id);
        assert_eq!(store.total_notifications().expect("count"), 3);
    }
}
