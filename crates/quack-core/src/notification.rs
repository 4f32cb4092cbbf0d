//! # Notification Center
//!
//! Append-only, per-recipient notification log and its display rules.
//!
//! Notifications are never edited, retracted or deleted. Listing order is
//! newest first; notifications written in the same instant fall back to
//! their store-assigned id, highest first.

use crate::primitives::{JUST_NOW, comment_notification_text, like_notification_text};
use crate::store::SocialStore;
use crate::{NewNotification, Notification, QuackError, SourceType, Timestamp, Username};
use serde::{Deserialize, Serialize};

/// A notification with its display message resolved against a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedNotification {
    pub id: u64,
    pub source_type: SourceType,
    pub source_id: String,
    pub timestamp: Timestamp,
    /// Display message, e.g. `"alice liked your picture - 2 minutes ago"`.
    pub message: String,
}

/// The NotificationCenter owns the Notifications relation.
pub struct NotificationCenter;

impl NotificationCenter {
    /// Append one notification stamped with `now`.
    pub fn append<S: SocialStore>(
        store: &mut S,
        recipient: &Username,
        text: &str,
        source_type: SourceType,
        source_id: &str,
        now: Timestamp,
    ) -> Result<Notification, QuackError> {
        let notification = store.append_notification(NewNotification {
            recipient: recipient.clone(),
            text: text.to_string(),
            source_type,
            source_id: source_id.to_string(),
            timestamp: now,
        })?;
        tracing::debug!(
            recipient = %recipient,
            source_type = %source_type,
            id = notification.id,
            "notification appended"
        );
        Ok(notification)
    }

    /// Notifications of `recipient`, newest first.
    pub fn list_for<S: SocialStore>(
        store: &S,
        recipient: &Username,
    ) -> Result<Vec<Notification>, QuackError> {
        let mut notifications = store.notifications_for(recipient)?;
        notifications.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(notifications)
    }

    /// Display message of a notification as seen at `now`.
    ///
    /// Likes and comments are phrased from `source_id`; other kinds show
    /// the stored text.
    #[must_use]
    pub fn render(notification: &Notification, now: Timestamp) -> String {
        let message = match notification.source_type {
            SourceType::Like => like_notification_text(&notification.source_id),
            SourceType::Comment => comment_notification_text(&notification.source_id),
            SourceType::Follow | SourceType::Other => notification.text.clone(),
        };
        let elapsed = Self::format_elapsed(notification.timestamp, now);
        if elapsed == JUST_NOW {
            format!("{} - {}", message, elapsed)
        } else {
            format!("{} - {} ago", message, elapsed)
        }
    }

    /// Render a notification into its display form.
    #[must_use]
    pub fn to_rendered(notification: &Notification, now: Timestamp) -> RenderedNotification {
        RenderedNotification {
            id: notification.id,
            source_type: notification.source_type,
            source_id: notification.source_id.clone(),
            timestamp: notification.timestamp,
            message: Self::render(notification, now),
        }
    }

    /// Human-readable time since `timestamp`.
    ///
    /// Shows whole days and the minutes past the last whole hour; hours
    /// themselves are not shown. Zero components are dropped, the rest are
    /// joined with `" and "`. Nothing left, or a timestamp in the future,
    /// gives `"just now"`.
    #[must_use]
    pub fn format_elapsed(timestamp: Timestamp, now: Timestamp) -> String {
        if now <= timestamp {
            return JUST_NOW.to_string();
        }
        let elapsed = now - timestamp;
        let days = elapsed.num_days();
        let minutes = elapsed.num_minutes() % 60;

        let mut parts = Vec::with_capacity(2);
        if days > 0 {
            parts.push(plural(days, "day"));
        }
        if minutes > 0 {
            parts.push(plural(minutes, "minute"));
        }
        if parts.is_empty() {
            JUST_NOW.to_string()
        } else {
            parts.join(" and ")
        }
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{} {}", n, unit)
    } else {
        format!("{} {}s", n, unit)
    }
}
