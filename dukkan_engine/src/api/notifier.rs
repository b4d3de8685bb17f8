//! Notification fan-out engine.
//!
//! [`Notifier::notify`] persists a notification record, publishes it on the live event bus, and dispatches it to a
//! set of polymorphic delivery channels (push, email, SMS, chat-ops, ...). The persistence step is the only one whose
//! failure surfaces to the caller; every downstream channel is independent, best-effort, and dispatched concurrently
//! so one slow or broken channel can never block the others or the triggering request.
use std::{fmt::Debug, sync::Arc};

use futures::future::BoxFuture;
use log::*;
use serde_json::json;
use thiserror::Error;

use crate::{
    db_types::{NewNotification, Notification},
    events::EventBus,
    traits::{LedgerError, NotificationPage, NotificationQuery, NotificationStore, PushTokenStore},
};

#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("The channel is not configured")]
    NotConfigured,
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("The remote service answered with status {0}")]
    RemoteStatus(u16),
}

/// A single outbound delivery channel. Implementations own their transport and credentials; `send` is a one-shot
/// best-effort attempt with no retry policy.
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;

    /// Delivers the notification. `push_tokens` holds the resolved device tokens for channels that multicast to
    /// devices; other channels ignore it.
    fn send(&self, notification: &Notification, push_tokens: &[String]) -> BoxFuture<'static, Result<(), ChannelError>>;
}

pub struct Notifier<B> {
    db: B,
    bus: EventBus,
    channels: Arc<Vec<Arc<dyn NotificationChannel>>>,
}

impl<B: Clone> Clone for Notifier<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), bus: self.bus.clone(), channels: Arc::clone(&self.channels) }
    }
}

impl<B> Debug for Notifier<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Notifier ({} channels)", self.channels.len())
    }
}

impl<B> Notifier<B> {
    pub fn new(db: B, bus: EventBus, channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        Self { db, bus, channels: Arc::new(channels) }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

impl<B> Notifier<B>
where B: NotificationStore + PushTokenStore + Clone + Send + Sync + 'static
{
    /// Persists the notification, then fans it out. Only the persistence step can fail this call; bus and channel
    /// failures are logged and swallowed.
    pub async fn notify(&self, notification: NewNotification) -> Result<Notification, LedgerError> {
        let target = notification.target_user().map(str::to_string);
        let notification = self.db.insert_notification(notification).await?;
        debug!("🔔️ Notification #{} ({}) persisted", notification.id, notification.kind);

        self.bus.publish(&json!({ "type": "notification", "notification": &notification }));

        // A token lookup failure downgrades push to a no-token dispatch rather than failing the call.
        let tokens = match self.db.fetch_push_tokens(target.as_deref()).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("🔔️ Could not resolve push tokens: {e}");
                Vec::new()
            },
        };
        match &target {
            Some(user) => trace!("🔔️ Targeting {} token(s) registered for user {user}", tokens.len()),
            None => trace!("🔔️ Broadcasting to all {} registered token(s)", tokens.len()),
        }

        for channel in self.channels.iter() {
            let name = channel.name().to_string();
            let send = channel.send(&notification, &tokens);
            let id = notification.id;
            tokio::spawn(async move {
                match send.await {
                    Ok(()) => debug!("🔔️ Notification #{id} delivered via {name}"),
                    Err(e) => warn!("🔔️ Channel {name} failed for notification #{id}: {e}"),
                }
            });
        }
        Ok(notification)
    }

    pub async fn search(&self, query: NotificationQuery) -> Result<NotificationPage, LedgerError> {
        self.db.search_notifications(query).await
    }

    pub async fn mark_read(&self, id: i64) -> Result<bool, LedgerError> {
        self.db.mark_notification_read(id).await
    }

    pub async fn mark_all_read(&self) -> Result<u64, LedgerError> {
        self.db.mark_all_notifications_read().await
    }

    pub async fn register_token(&self, subscriber: &str, token: &str) -> Result<(), LedgerError> {
        self.db.register_push_token(subscriber, token).await
    }

    pub async fn unregister_token(&self, subscriber: &str, token: &str) -> Result<(), LedgerError> {
        self.db.unregister_push_token(subscriber, token).await
    }
}
