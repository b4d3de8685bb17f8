//! Generic relay channel for email, SMS and WhatsApp.
//!
//! The relays share one wire contract: POST the notification JSON to the configured endpoint and treat any 2xx as
//! delivered. Message templating and addressing live in the relay services themselves.
use dukkan_engine::{db_types::Notification, ChannelError, NotificationChannel};
use futures::future::BoxFuture;
use log::*;
use reqwest::Client;

pub struct RelayChannel {
    name: String,
    url: String,
    client: Client,
}

impl RelayChannel {
    pub fn new(name: &str, url: &str) -> Self {
        Self { name: name.to_string(), url: url.to_string(), client: Client::new() }
    }
}

impl NotificationChannel for RelayChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, notification: &Notification, _push_tokens: &[String]) -> BoxFuture<'static, Result<(), ChannelError>> {
        let client = self.client.clone();
        let url = self.url.clone();
        let name = self.name.clone();
        let body = notification.clone();
        Box::pin(async move {
            let response =
                client.post(&url).json(&body).send().await.map_err(|e| ChannelError::Transport(e.to_string()))?;
            if response.status().is_success() {
                trace!("🔔️ {name} relay accepted notification #{}", body.id);
                Ok(())
            } else {
                Err(ChannelError::RemoteStatus(response.status().as_u16()))
            }
        })
    }
}
