//! Concrete outbound integrations: the push/relay/chat-ops notification channels and the Kuraimi payment API client.

pub mod chatops;
pub mod fcm;
pub mod kuraimi;
pub mod relay;

use std::sync::Arc;

use dukkan_engine::NotificationChannel;
use log::*;

use crate::{
    config::ChannelsConfig,
    integrations::{chatops::ChatOpsChannel, fcm::FcmPushChannel, relay::RelayChannel},
};

/// Builds the channel set from whatever is configured. Unconfigured channels are skipped, not stubbed.
pub fn channels_from_config(config: &ChannelsConfig) -> Vec<Arc<dyn NotificationChannel>> {
    let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();
    if let Some(key) = &config.fcm_server_key {
        channels.push(Arc::new(FcmPushChannel::new(key.clone())));
    }
    if let Some(url) = &config.email_relay_url {
        channels.push(Arc::new(RelayChannel::new("email", url)));
    }
    if let Some(url) = &config.sms_relay_url {
        channels.push(Arc::new(RelayChannel::new("sms", url)));
    }
    if let Some(url) = &config.whatsapp_relay_url {
        channels.push(Arc::new(RelayChannel::new("whatsapp", url)));
    }
    if let Some(url) = &config.chatops_webhook_url {
        channels.push(Arc::new(ChatOpsChannel::new(url)));
    }
    info!("🔔️ {} notification channel(s) configured", channels.len());
    channels
}
