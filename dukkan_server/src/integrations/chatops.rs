//! Chat-ops webhook channel, for the operator channel (Slack/Telegram style incoming webhooks).
use dukkan_engine::{db_types::Notification, ChannelError, NotificationChannel};
use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::json;

pub struct ChatOpsChannel {
    url: String,
    client: Client,
}

impl ChatOpsChannel {
    pub fn new(url: &str) -> Self {
        Self { url: url.to_string(), client: Client::new() }
    }
}

impl NotificationChannel for ChatOpsChannel {
    fn name(&self) -> &str {
        "chatops"
    }

    fn send(&self, notification: &Notification, _push_tokens: &[String]) -> BoxFuture<'static, Result<(), ChannelError>> {
        let client = self.client.clone();
        let url = self.url.clone();
        let body = json!({ "text": format!("*{}*\n{}", notification.title, notification.message) });
        Box::pin(async move {
            let response =
                client.post(&url).json(&body).send().await.map_err(|e| ChannelError::Transport(e.to_string()))?;
            if response.status().is_success() {
                Ok(())
            } else {
                Err(ChannelError::RemoteStatus(response.status().as_u16()))
            }
        })
    }
}
