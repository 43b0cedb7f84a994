//! Change-feed subscriptions, the family review notifier, and the notification inbox.

mod channel;
mod inbox;
mod notifier;
pub mod router;

#[cfg(test)]
mod tests;

pub use channel::{NotificationChannel, Subscription};
pub use inbox::{
    NewNotification, Notification, NotificationError, NotificationId, NotificationInbox,
    NotificationRepository, NotificationSink, RECENT_NOTIFICATION_LIMIT,
};
pub use notifier::{
    Delivery, ProcessedReviews, RefreshHook, RefreshReason, ReviewNotifier, ScreeningLookup,
    Step, SubscriberScope,
};
pub use router::notification_router;
