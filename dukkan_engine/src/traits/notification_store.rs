use crate::{
    db_types::{NewNotification, Notification},
    traits::{LedgerError, NotificationPage, NotificationQuery},
};

/// Persistence for the notification log. Notifications are immutable except for the read marker.
#[allow(async_fn_in_trait)]
pub trait NotificationStore: Clone {
    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, LedgerError>;

    async fn search_notifications(&self, query: NotificationQuery) -> Result<NotificationPage, LedgerError>;

    /// Returns false if the notification does not exist.
    async fn mark_notification_read(&self, id: i64) -> Result<bool, LedgerError>;

    /// Returns the number of notifications that were still unread.
    async fn mark_all_notifications_read(&self) -> Result<u64, LedgerError>;
}

/// A durable key → set-of-tokens map for push subscriptions. Register and unregister are idempotent; tokens are never
/// expired here (invalid tokens are the push provider's problem).
#[allow(async_fn_in_trait)]
pub trait PushTokenStore: Clone {
    async fn register_push_token(&self, subscriber: &str, token: &str) -> Result<(), LedgerError>;

    async fn unregister_push_token(&self, subscriber: &str, token: &str) -> Result<(), LedgerError>;

    /// Tokens for one subscriber, or the union of all registered tokens when `subscriber` is `None`.
    async fn fetch_push_tokens(&self, subscriber: Option<&str>) -> Result<Vec<String>, LedgerError>;
}
