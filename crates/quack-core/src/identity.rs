//! # Identity Module
//!
//! User registration, profiles and credential verification.
//!
//! - Usernames are unique and immutable once registered
//! - Profile counters are recomputed from the Follows and Posts relations
//! - Credential checking is delegated to an injected [`Authenticator`]

use crate::primitives::{MAX_BIO_LENGTH, MAX_CREDENTIAL_LENGTH, MAX_USERNAME_LENGTH};
use crate::store::SocialStore;
use crate::{Credential, QuackError, Role, User, Username};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

// =============================================================================
// AUTHENTICATION CAPABILITY
// =============================================================================

/// Decides whether a presented secret matches a stored credential.
///
/// Hashing schemes are outside the engine; an implementation may treat the
/// stored credential as a hash, a salted digest, or plain text.
pub trait Authenticator: Send + Sync {
    /// Return `true` if `secret` matches `stored`.
    fn verify(&self, stored: &Credential, secret: &str) -> bool;
}

/// Compares the secret with the stored credential verbatim, in constant time.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextAuthenticator;

impl Authenticator for PlaintextAuthenticator {
    fn verify(&self, stored: &Credential, secret: &str) -> bool {
        constant_time_eq(stored.expose().as_bytes(), secret.as_bytes())
    }
}

/// Constant-time byte comparison.
///
/// Both inputs are padded to the same length so `ct_eq` always runs over
/// the same number of bytes; the length check happens afterwards.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let max_len = a.len().max(b.len());
    let mut padded_a = vec![0u8; max_len];
    let mut padded_b = vec![0u8; max_len];
    padded_a[..a.len()].copy_from_slice(a);
    padded_b[..b.len()].copy_from_slice(b);

    let bytes_match: bool = padded_a.ct_eq(&padded_b).into();
    bytes_match && a.len() == b.len()
}

// =============================================================================
// PROFILE
// =============================================================================

/// Public view of a user with derived counters.
///
/// Never contains the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: Username,
    pub bio: String,
    pub role: Role,
    pub posts_count: usize,
    pub followers_count: usize,
    pub following_count: usize,
}

// =============================================================================
// IDENTITY STORE
// =============================================================================

/// The IdentityStore owns user records.
pub struct IdentityStore;

impl IdentityStore {
    /// Validate a username.
    ///
    /// A username is valid if it is non-empty, at most `MAX_USERNAME_LENGTH`
    /// bytes, and made only of ASCII letters, digits, `_`, `.` and `-`.
    pub fn validate_username(username: &str) -> Result<(), QuackError> {
        if username.is_empty() {
            return Err(QuackError::ValidationFailed(
                "username must not be empty".to_string(),
            ));
        }
        if username.len() > MAX_USERNAME_LENGTH {
            return Err(QuackError::ValidationFailed(format!(
                "username longer than {} characters",
                MAX_USERNAME_LENGTH
            )));
        }
        if let Some(bad) = username
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
        {
            return Err(QuackError::ValidationFailed(format!(
                "username contains invalid character '{}'",
                bad
            )));
        }
        Ok(())
    }

    fn validate_bio(bio: &str) -> Result<(), QuackError> {
        if bio.len() > MAX_BIO_LENGTH {
            return Err(QuackError::ValidationFailed(format!(
                "bio longer than {} characters",
                MAX_BIO_LENGTH
            )));
        }
        Ok(())
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for a malformed username, an over-long bio, or an
    ///   empty/over-long credential
    /// - `UsernameTaken` if the name is already registered
    pub fn register<S: SocialStore>(
        store: &mut S,
        username: &str,
        bio: &str,
        secret: &str,
        role: Role,
    ) -> Result<UserProfile, QuackError> {
        Self::validate_username(username)?;
        Self::validate_bio(bio)?;
        if secret.is_empty() {
            return Err(QuackError::ValidationFailed(
                "credential must not be empty".to_string(),
            ));
        }
        if secret.len() > MAX_CREDENTIAL_LENGTH {
            return Err(QuackError::ValidationFailed(format!(
                "credential longer than {} characters",
                MAX_CREDENTIAL_LENGTH
            )));
        }

        let user = User::new(Username::new(username), bio, Credential::new(secret), role);
        store.insert_user(user)?;
        tracing::info!(username, role = %role, "user registered");
        Self::profile(store, &Username::new(username))
    }

    /// Fetch a user record.
    pub fn get_user<S: SocialStore>(store: &S, username: &Username) -> Result<User, QuackError> {
        store
            .get_user(username)?
            .ok_or_else(|| QuackError::UserNotFound(username.clone()))
    }

    /// Fail with `UserNotFound` unless `username` is registered.
    pub fn ensure_exists<S: SocialStore>(store: &S, username: &Username) -> Result<(), QuackError> {
        Self::get_user(store, username).map(|_| ())
    }

    /// Build the public profile of a user, counting posts and follow edges.
    pub fn profile<S: SocialStore>(
        store: &S,
        username: &Username,
    ) -> Result<UserProfile, QuackError> {
        let user = Self::get_user(store, username)?;
        Ok(UserProfile {
            posts_count: store.posts_by_owner(username)?.len(),
            followers_count: store.followers(username)?.len(),
            following_count: store.following(username)?.len(),
            username: user.username,
            bio: user.bio,
            role: user.role,
        })
    }

    /// Replace a user's bio.
    pub fn update_bio<S: SocialStore>(
        store: &mut S,
        username: &Username,
        bio: &str,
    ) -> Result<(), QuackError> {
        Self::validate_bio(bio)?;
        store.set_bio(username, bio)
    }

    /// Check a secret against the stored credential.
    ///
    /// An unknown user verifies as `false`, not as an error.
    pub fn verify_credential<S: SocialStore>(
        store: &S,
        authenticator: &dyn Authenticator,
        username: &Username,
        secret: &str,
    ) -> Result<bool, QuackError> {
        match store.get_user(username)? {
            Some(user) => Ok(authenticator.verify(&user.credential, secret)),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn register_and_profile() {
        let mut store = MemoryStore::new();
        let profile = IdentityStore::register(&mut store, "alice", "quack", "pw", Role::Regular)
            .expect("register");
        assert_eq!(profile.username, Username::new("alice"));
        assert_eq!(profile.bio, "quack");
        assert_eq!(profile.posts_count, 0);
        assert_eq!(profile.followers_count, 0);
    }

    #[test]
    fn register_rejects_taken_name() {
        let mut store = MemoryStore::new();
        IdentityStore::register(&mut store, "alice", "", "pw", Role::Regular).expect("register");
        let err = IdentityStore::register(&mut store, "alice", "", "other", Role::Admin)
            .expect_err("taken");
        assert!(err.is_conflict());
        let user = IdentityStore::get_user(&store, &Username::new("alice")).expect("user");
        assert_eq!(user.role, Role::Regular);
    }

    #[test]
    fn username_rules() {
        assert!(IdentityStore::validate_username("mr.duck-2_b").is_ok());
        assert!(IdentityStore::validate_username("").is_err());
        assert!(IdentityStore::validate_username("has space").is_err());
        assert!(IdentityStore::validate_username("ünï").is_err());
        assert!(IdentityStore::validate_username(&"a".repeat(MAX_USERNAME_LENGTH)).is_ok());
        assert!(IdentityStore::validate_username(&"a".repeat(MAX_USERNAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn register_requires_credential() {
        let mut store = MemoryStore::new();
        let err = IdentityStore::register(&mut store, "alice", "", "", Role::Regular)
            .expect_err("empty credential");
        assert_eq!(err.kind(), crate::ErrorKind::ValidationFailed);
        assert_eq!(store.user_count().expect("count"), 0);
    }

    #[test]
    fn update_bio_unknown_user() {
        let mut store = MemoryStore::new();
        let err = IdentityStore::update_bio(&mut store, &Username::new("ghost"), "hi")
            .expect_err("unknown");
        assert!(matches!(err, QuackError::UserNotFound(_)));
    }

    #[test]
    fn verify_credential_plaintext() {
        let mut store = MemoryStore::new();
        IdentityStore::register(&mut store, "alice", "", "hunter2", Role::Regular)
            .expect("register");
        let auth = PlaintextAuthenticator;
        let alice = Username::new("alice");

        assert!(IdentityStore::verify_credential(&store, &auth, &alice, "hunter2").expect("ok"));
        assert!(!IdentityStore::verify_credential(&store, &auth, &alice, "hunter").expect("ok"));
        assert!(
            !IdentityStore::verify_credential(&store, &auth, &Username::new("bob"), "hunter2")
                .expect("ok")
        );
    }

    #[test]
    fn constant_time_eq_lengths() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(!constant_time_eq(b"", b"a"));
        assert!(constant_time_eq(b"", b""));
    }
}
