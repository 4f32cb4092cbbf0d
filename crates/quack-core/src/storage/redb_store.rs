//! # redb-backed Social Storage
//!
//! A disk-backed [`SocialStore`] using the redb embedded database.
//!
//! Every relation is a redb table keyed by a typed tuple, so uniqueness
//! rules are key identity and there is no query text to build:
//! - ACID transactions (each trait write is one write transaction)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Check-then-write operations (`insert_user`, `insert_follow`,
//! `insert_post`, `toggle_like`) read and write inside the same write
//! transaction, so the checked state is the state that gets committed.

use crate::store::SocialStore;
use crate::{
    Comment, LikeToggle, NewNotification, NewPost, Notification, Post, PostId, QuackError,
    Timestamp, User, Username,
};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Users: username -> postcard `User`
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Follow edges: (follower, followed) -> ()
const FOLLOWS: TableDefinition<(&str, &str), ()> = TableDefinition::new("follows");

/// Reverse follow index: (followed, follower) -> ()
const FOLLOWERS: TableDefinition<(&str, &str), ()> = TableDefinition::new("followers");

/// Posts: (owner, seq) -> postcard `Post`
const POSTS: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("posts");

/// Last post sequence handed out per owner. Never decremented.
const POST_SEQ: TableDefinition<&str, u64> = TableDefinition::new("post_seq");

/// Likes: (post owner, post seq, username) -> ()
const LIKES: TableDefinition<(&str, u64, &str), ()> = TableDefinition::new("likes");

/// Comments: (post owner, post seq, comment id) -> postcard `Comment`
const COMMENTS: TableDefinition<(&str, u64, u64), &[u8]> = TableDefinition::new("comments");

/// Notifications: (recipient, id) -> postcard `Notification`
const NOTIFICATIONS: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("notifications");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const NEXT_COMMENT_ID: &str = "next_comment_id";
const NEXT_NOTIFICATION_ID: &str = "next_notification_id";

#[inline]
fn store_err(e: impl std::fmt::Display) -> QuackError {
    QuackError::StoreUnavailable(e.to_string())
}

fn encode<T: Serialize>(row: &T) -> Result<Vec<u8>, QuackError> {
    postcard::to_allocvec(row).map_err(|e| QuackError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, QuackError> {
    postcard::from_bytes(bytes).map_err(|e| QuackError::SerializationError(e.to_string()))
}

/// A disk-backed social store using redb.
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, QuackError> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path).map_err(store_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(store_err)?;
            let _ = write_txn.open_table(USERS).map_err(store_err)?;
            let _ = write_txn.open_table(FOLLOWS).map_err(store_err)?;
            let _ = write_txn.open_table(FOLLOWERS).map_err(store_err)?;
            let _ = write_txn.open_table(POSTS).map_err(store_err)?;
            let _ = write_txn.open_table(POST_SEQ).map_err(store_err)?;
            let _ = write_txn.open_table(LIKES).map_err(store_err)?;
            let _ = write_txn.open_table(COMMENTS).map_err(store_err)?;
            let _ = write_txn.open_table(NOTIFICATIONS).map_err(store_err)?;
            let _ = write_txn.open_table(METADATA).map_err(store_err)?;
            write_txn.commit().map_err(store_err)?;
        }

        tracing::debug!(path = %path.display(), "opened redb store");
        Ok(Self { db, path })
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<bool, QuackError> {
        self.db.compact().map_err(store_err)
    }

    /// Row count of one table.
    fn table_len<K: redb::Key + 'static, V: redb::Value + 'static>(
        &self,
        table: TableDefinition<K, V>,
    ) -> Result<usize, QuackError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let table = read_txn.open_table(table).map_err(store_err)?;
        let count = table.len().map_err(store_err)?;
        Ok(count as usize)
    }

    /// Second elements of every `(first, second)` key of a pair table.
    fn pair_seconds(
        &self,
        table: TableDefinition<'static, (&'static str, &'static str), ()>,
        first: &Username,
    ) -> Result<Vec<Username>, QuackError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let table = read_txn.open_table(table).map_err(store_err)?;

        let mut result = Vec::new();
        for entry in table
            .range((first.as_str(), "")..)
            .map_err(store_err)?
        {
            let (key, _) = entry.map_err(store_err)?;
            let (a, b) = key.value();
            if a != first.as_str() {
                break;
            }
            result.push(Username::new(b));
        }
        Ok(result)
    }
}

// =============================================================================
// SOCIALSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl SocialStore for RedbStore {
    fn insert_user(&mut self, user: User) -> Result<(), QuackError> {
        let bytes = encode(&user)?;
        let write_txn = self.db.begin_write().map_err(store_err)?;
        let taken = {
            let mut users = write_txn.open_table(USERS).map_err(store_err)?;
            let taken = users
                .get(user.username.as_str())
                .map_err(store_err)?
                .is_some();
            if !taken {
                users
                    .insert(user.username.as_str(), bytes.as_slice())
                    .map_err(store_err)?;
            }
            taken
        };
        if taken {
            write_txn.abort().map_err(store_err)?;
            return Err(QuackError::UsernameTaken(user.username));
        }
        write_txn.commit().map_err(store_err)?;
        Ok(())
    }

    fn get_user(&self, username: &Username) -> Result<Option<User>, QuackError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let users = read_txn.open_table(USERS).map_err(store_err)?;
        match users.get(username.as_str()).map_err(store_err)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn set_bio(&mut self, username: &Username, bio: &str) -> Result<(), QuackError> {
        let write_txn = self.db.begin_write().map_err(store_err)?;
        let found = {
            let mut users = write_txn.open_table(USERS).map_err(store_err)?;
            let existing: Option<User> = match users.get(username.as_str()).map_err(store_err)? {
                Some(data) => Some(decode(data.value())?),
                None => None,
            };
            match existing {
                Some(mut user) => {
                    user.bio = bio.to_string();
                    let bytes = encode(&user)?;
                    users
                        .insert(username.as_str(), bytes.as_slice())
                        .map_err(store_err)?;
                    true
                }
                None => false,
            }
        };
        if !found {
            write_txn.abort().map_err(store_err)?;
            return Err(QuackError::UserNotFound(username.clone()));
        }
        write_txn.commit().map_err(store_err)?;
        Ok(())
    }

    fn user_count(&self) -> Result<usize, QuackError> {
        self.table_len(USERS)
    }

    fn insert_follow(
        &mut self,
        follower: &Username,
        followed: &Username,
    ) -> Result<bool, QuackError> {
        let write_txn = self.db.begin_write().map_err(store_err)?;
        let inserted = {
            let mut follows = write_txn.open_table(FOLLOWS).map_err(store_err)?;
            let key = (follower.as_str(), followed.as_str());
            if follows.get(key).map_err(store_err)?.is_some() {
                false
            } else {
                follows.insert(key, ()).map_err(store_err)?;
                let mut followers = write_txn.open_table(FOLLOWERS).map_err(store_err)?;
                followers
                    .insert((followed.as_str(), follower.as_str()), ())
                    .map_err(store_err)?;
                true
            }
        };
        if inserted {
            write_txn.commit().map_err(store_err)?;
        } else {
            write_txn.abort().map_err(store_err)?;
        }
        Ok(inserted)
    }

    fn contains_follow(
        &self,
        follower: &Username,
        followed: &Username,
    ) -> Result<bool, QuackError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let follows = read_txn.open_table(FOLLOWS).map_err(store_err)?;
        Ok(follows
            .get((follower.as_str(), followed.as_str()))
            .map_err(store_err)?
            .is_some())
    }

    fn followers(&self, username: &Username) -> Result<Vec<Username>, QuackError> {
        self.pair_seconds(FOLLOWERS, username)
    }

    fn following(&self, username: &Username) -> Result<Vec<Username>, QuackError> {
        self.pair_seconds(FOLLOWS, username)
    }

    fn follow_count(&self) -> Result<usize, QuackError> {
        self.table_len(FOLLOWS)
    }

    fn insert_post(&mut self, post: NewPost) -> Result<Post, QuackError> {
        let write_txn = self.db.begin_write().map_err(store_err)?;
        let row = {
            let mut seqs = write_txn.open_table(POST_SEQ).map_err(store_err)?;
            let seq = seqs
                .get(post.owner.as_str())
                .map_err(store_err)?
                .map(|v| v.value())
                .unwrap_or(0)
                .saturating_add(1);
            seqs.insert(post.owner.as_str(), seq).map_err(store_err)?;

            let row = Post {
                id: PostId::new(post.owner.clone(), seq),
                image_path: post.image_path,
                caption: post.caption,
                created_at: post.created_at,
            };
            let bytes = encode(&row)?;
            let mut posts = write_txn.open_table(POSTS).map_err(store_err)?;
            posts
                .insert((post.owner.as_str(), seq), bytes.as_slice())
                .map_err(store_err)?;
            row
        };
        write_txn.commit().map_err(store_err)?;
        Ok(row)
    }

    fn get_post(&self, id: &PostId) -> Result<Option<Post>, QuackError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let posts = read_txn.open_table(POSTS).map_err(store_err)?;
        match posts
            .get((id.owner.as_str(), id.seq))
            .map_err(store_err)?
        {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn posts_by_owner(&self, owner: &Username) -> Result<Vec<Post>, QuackError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let posts = read_txn.open_table(POSTS).map_err(store_err)?;

        let mut result = Vec::new();
        for entry in posts
            .range((owner.as_str(), 0u64)..=(owner.as_str(), u64::MAX))
            .map_err(store_err)?
        {
            let (_, data) = entry.map_err(store_err)?;
            result.push(decode(data.value())?);
        }
        Ok(result)
    }

    fn all_posts(&self) -> Result<Vec<Post>, QuackError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let posts = read_txn.open_table(POSTS).map_err(store_err)?;

        let mut result = Vec::new();
        for entry in posts.iter().map_err(store_err)? {
            let (_, data) = entry.map_err(store_err)?;
            result.push(decode(data.value())?);
        }
        Ok(result)
    }

    fn set_caption(&mut self, id: &PostId, caption: &str) -> Result<(), QuackError> {
        let write_txn = self.db.begin_write().map_err(store_err)?;
        let found = {
            let mut posts = write_txn.open_table(POSTS).map_err(store_err)?;
            let key = (id.owner.as_str(), id.seq);
            let existing: Option<Post> = match posts.get(key).map_err(store_err)? {
                Some(data) => Some(decode(data.value())?),
                None => None,
            };
            match existing {
                Some(mut post) => {
                    post.caption = caption.to_string();
                    let bytes = encode(&post)?;
                    posts.insert(key, bytes.as_slice()).map_err(store_err)?;
                    true
                }
                None => false,
            }
        };
        if !found {
            write_txn.abort().map_err(store_err)?;
            return Err(QuackError::PostNotFound(id.clone()));
        }
        write_txn.commit().map_err(store_err)?;
        Ok(())
    }

    fn post_count(&self) -> Result<usize, QuackError> {
        self.table_len(POSTS)
    }

    fn toggle_like(
        &mut self,
        post: &PostId,
        username: &Username,
    ) -> Result<LikeToggle, QuackError> {
        let write_txn = self.db.begin_write().map_err(store_err)?;
        let outcome = {
            let posts = write_txn.open_table(POSTS).map_err(store_err)?;
            let exists = posts
                .get((post.owner.as_str(), post.seq))
                .map_err(store_err)?
                .is_some();
            if exists {
                let mut likes = write_txn.open_table(LIKES).map_err(store_err)?;
                let key = (post.owner.as_str(), post.seq, username.as_str());
                if likes.remove(key).map_err(store_err)?.is_some() {
                    Some(LikeToggle::Unliked)
                } else {
                    likes.insert(key, ()).map_err(store_err)?;
                    Some(LikeToggle::Liked)
                }
            } else {
                None
            }
        };
        match outcome {
            Some(toggle) => {
                write_txn.commit().map_err(store_err)?;
                Ok(toggle)
            }
            None => {
                write_txn.abort().map_err(store_err)?;
                Err(QuackError::PostNotFound(post.clone()))
            }
        }
    }

    fn contains_like(&self, post: &PostId, username: &Username) -> Result<bool, QuackError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let likes = read_txn.open_table(LIKES).map_err(store_err)?;
        Ok(likes
            .get((post.owner.as_str(), post.seq, username.as_str()))
            .map_err(store_err)?
            .is_some())
    }

    fn likers(&self, post: &PostId) -> Result<Vec<Username>, QuackError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let likes = read_txn.open_table(LIKES).map_err(store_err)?;

        let mut result = Vec::new();
        for entry in likes
            .range((post.owner.as_str(), post.seq, "")..)
            .map_err(store_err)?
        {
            let (key, _) = entry.map_err(store_err)?;
            let (owner, seq, username) = key.value();
            if owner != post.owner.as_str() || seq != post.seq {
                break;
            }
            result.push(Username::new(username));
        }
        Ok(result)
    }

    fn total_likes(&self) -> Result<usize, QuackError> {
        self.table_len(LIKES)
    }

    fn insert_comment(
        &mut self,
        post: &PostId,
        username: &Username,
        text: &str,
        created_at: Timestamp,
    ) -> Result<Comment, QuackError> {
        let write_txn = self.db.begin_write().map_err(store_err)?;
        let comment = {
            let posts = write_txn.open_table(POSTS).map_err(store_err)?;
            let exists = posts
                .get((post.owner.as_str(), post.seq))
                .map_err(store_err)?
                .is_some();
            if exists {
                let mut meta = write_txn.open_table(METADATA).map_err(store_err)?;
                let id = meta
                    .get(NEXT_COMMENT_ID)
                    .map_err(store_err)?
                    .map(|v| v.value())
                    .unwrap_or(0);
                meta.insert(NEXT_COMMENT_ID, id.saturating_add(1))
                    .map_err(store_err)?;

                let comment = Comment {
                    id,
                    post: post.clone(),
                    username: username.clone(),
                    text: text.to_string(),
                    created_at,
                };
                let bytes = encode(&comment)?;
                let mut comments = write_txn.open_table(COMMENTS).map_err(store_err)?;
                comments
                    .insert((post.owner.as_str(), post.seq, id), bytes.as_slice())
                    .map_err(store_err)?;
                Some(comment)
            } else {
                None
            }
        };
        match comment {
            Some(comment) => {
                write_txn.commit().map_err(store_err)?;
                Ok(comment)
            }
            None => {
                write_txn.abort().map_err(store_err)?;
                Err(QuackError::PostNotFound(post.clone()))
            }
        }
    }

    fn comments(&self, post: &PostId) -> Result<Vec<Comment>, QuackError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let comments = read_txn.open_table(COMMENTS).map_err(store_err)?;

        let owner = post.owner.as_str();
        let mut result = Vec::new();
        for entry in comments
            .range((owner, post.seq, 0u64)..=(owner, post.seq, u64::MAX))
            .map_err(store_err)?
        {
            let (_, data) = entry.map_err(store_err)?;
            result.push(decode(data.value())?);
        }
        Ok(result)
    }

    fn total_comments(&self) -> Result<usize, QuackError> {
        self.table_len(COMMENTS)
    }

    fn append_notification(
        &mut self,
        notification: NewNotification,
    ) -> Result<Notification, QuackError> {
        let write_txn = self.db.begin_write().map_err(store_err)?;
        let row = {
            let mut meta = write_txn.open_table(METADATA).map_err(store_err)?;
            let id = meta
                .get(NEXT_NOTIFICATION_ID)
                .map_err(store_err)?
                .map(|v| v.value())
                .unwrap_or(0);
            meta.insert(NEXT_NOTIFICATION_ID, id.saturating_add(1))
                .map_err(store_err)?;

            let row = Notification {
                id,
                recipient: notification.recipient,
                text: notification.text,
                source_type: notification.source_type,
                source_id: notification.source_id,
                timestamp: notification.timestamp,
            };
            let bytes = encode(&row)?;
            let mut table = write_txn.open_table(NOTIFICATIONS).map_err(store_err)?;
            table
                .insert((row.recipient.as_str(), id), bytes.as_slice())
                .map_err(store_err)?;
            row
        };
        write_txn.commit().map_err(store_err)?;
        Ok(row)
    }

    fn notifications_for(&self, recipient: &Username) -> Result<Vec<Notification>, QuackError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let table = read_txn.open_table(NOTIFICATIONS).map_err(store_err)?;

        let mut result = Vec::new();
        for entry in table
            .range((recipient.as_str(), 0u64)..=(recipient.as_str(), u64::MAX))
            .map_err(store_err)?
        {
            let (_, data) = entry.map_err(store_err)?;
            result.push(decode(data.value())?);
        }
        Ok(result)
    }

    fn total_notifications(&self) -> Result<usize, QuackError> {
        self.table_len(NOTIFICATIONS)
    }
}
