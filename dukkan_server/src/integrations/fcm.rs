//! Firebase Cloud Messaging push channel.
use dukkan_common::Secret;
use dukkan_engine::{db_types::Notification, ChannelError, NotificationChannel};
use futures::future::BoxFuture;
use log::*;
use reqwest::Client;
use serde_json::json;

const FCM_SEND_URL: &str = "https://fcm.googleapis.com/fcm/send";

pub struct FcmPushChannel {
    server_key: Secret<String>,
    client: Client,
}

impl FcmPushChannel {
    pub fn new(server_key: Secret<String>) -> Self {
        Self { server_key, client: Client::new() }
    }
}

impl NotificationChannel for FcmPushChannel {
    fn name(&self) -> &str {
        "fcm"
    }

    /// One multicast request per notification; FCM fans out to the individual devices.
    fn send(&self, notification: &Notification, push_tokens: &[String]) -> BoxFuture<'static, Result<(), ChannelError>> {
        let client = self.client.clone();
        let key = self.server_key.reveal().clone();
        let body = json!({
            "registration_ids": push_tokens,
            "notification": {
                "title": notification.title,
                "body": notification.message,
            },
            "data": notification.data.0,
        });
        let count = push_tokens.len();
        Box::pin(async move {
            if count == 0 {
                trace!("🔔️ No push tokens registered; skipping FCM send");
                return Ok(());
            }
            let response = client
                .post(FCM_SEND_URL)
                .header("Authorization", format!("key={key}"))
                .json(&body)
                .send()
                .await
                .map_err(|e| ChannelError::Transport(e.to_string()))?;
            if response.status().is_success() {
                debug!("🔔️ FCM accepted a multicast to {count} device(s)");
                Ok(())
            } else {
                Err(ChannelError::RemoteStatus(response.status().as_u16()))
            }
        })
    }
}
