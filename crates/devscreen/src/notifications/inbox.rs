use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::screening::{ScreeningId, UserId};
use crate::storage::StorageError;
use crate::validation::{parse_canonical_uuid, ValidationError};

/// Number of notifications returned by [`NotificationInbox::recent`].
pub const RECENT_NOTIFICATION_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub Uuid);

impl NotificationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// User-facing message. Only `is_read` changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub screening_id: Option<ScreeningId>,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Content for a notification that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: UserId,
    pub screening_id: Option<ScreeningId>,
    pub title: String,
    pub message: String,
}

/// Storage abstraction for notifications.
pub trait NotificationRepository: Send + Sync {
    fn insert_notification(&self, notification: Notification) -> Result<Notification, StorageError>;

    /// Newest first, at most `limit` entries.
    fn recent_notifications(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<Notification>, StorageError>;

    /// Returns `NotFound` when no notification has this id.
    fn mark_notification_read(&self, id: &NotificationId) -> Result<Notification, StorageError>;
}

/// Outbound hook used by the review notifier to emit a notification.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: NewNotification) -> Result<Notification, NotificationError>;
}

/// Fetch and mutation entry points for a user's notifications.
///
/// Identifiers arrive as raw text and are validated before any repository call.
pub struct NotificationInbox<R> {
    repository: Arc<R>,
}

impl<R> NotificationInbox<R>
where
    R: NotificationRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn recent(&self, raw_user_id: &str) -> Result<Vec<Notification>, NotificationError> {
        let user_id = UserId(parse_canonical_uuid("user_id", raw_user_id)?);
        Ok(self
            .repository
            .recent_notifications(&user_id, RECENT_NOTIFICATION_LIMIT)?)
    }

    pub fn mark_read(&self, raw_notification_id: &str) -> Result<Notification, NotificationError> {
        let id = NotificationId(parse_canonical_uuid(
            "notification_id",
            raw_notification_id,
        )?);
        match self.repository.mark_notification_read(&id) {
            Ok(notification) => Ok(notification),
            Err(StorageError::NotFound) => Err(NotificationError::NotFound(id)),
            Err(other) => Err(other.into()),
        }
    }

    pub fn record(&self, new: NewNotification) -> Result<Notification, NotificationError> {
        let notification = Notification {
            id: NotificationId::new(),
            user_id: new.user_id,
            screening_id: new.screening_id,
            title: new.title,
            message: new.message,
            is_read: false,
            created_at: Utc::now(),
        };
        Ok(self.repository.insert_notification(notification)?)
    }
}

#[async_trait]
impl<R> NotificationSink for NotificationInbox<R>
where
    R: NotificationRepository + 'static,
{
    async fn notify(&self, notification: NewNotification) -> Result<Notification, NotificationError> {
        self.record(notification)
    }
}

/// Error raised by notification operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("notification {0} not found")]
    NotFound(NotificationId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
