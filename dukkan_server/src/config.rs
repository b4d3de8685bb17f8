use std::env;

use chrono::Duration;
use dukkan_common::{parse_boolean_flag, Secret};
use log::*;
use rand::Rng;

const DEFAULT_DKN_HOST: &str = "127.0.0.1";
const DEFAULT_DKN_PORT: u16 = 3000;
const DEFAULT_WEBHOOK_HEADER: &str = "x-kuraimi-signature";
const DEFAULT_PROOF_DIR: &str = "data/uploads";
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::hours(24);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    pub webhook: WebhookConfig,
    pub channels: ChannelsConfig,
    pub kuraimi: KuraimiConfig,
    /// Directory where uploaded payment proofs are written. Served back as `/uploads/<file>`.
    pub proof_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DKN_HOST.to_string(),
            port: DEFAULT_DKN_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            webhook: WebhookConfig::default(),
            channels: ChannelsConfig::default(),
            kuraimi: KuraimiConfig::default(),
            proof_dir: DEFAULT_PROOF_DIR.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("DKN_HOST").ok().unwrap_or_else(|| DEFAULT_DKN_HOST.into());
        let port = env::var("DKN_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for DKN_PORT. {e} Using the default, {DEFAULT_DKN_PORT}, instead."
                    );
                    DEFAULT_DKN_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_DKN_PORT);
        let database_url = dukkan_engine::db_url();
        let proof_dir = env::var("DKN_PROOF_DIR").ok().unwrap_or_else(|| DEFAULT_PROOF_DIR.into());
        Self {
            host,
            port,
            database_url,
            auth: AuthConfig::from_env_or_default(),
            webhook: WebhookConfig::from_env_or_default(),
            channels: ChannelsConfig::from_env(),
            kuraimi: KuraimiConfig::from_env(),
            proof_dir,
        }
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Shared secret for the `x-api-key` header that guards staff endpoints.
    pub api_key: Option<Secret<String>>,
    /// Signing key for issued access tokens.
    pub token_secret: Secret<String>,
    pub token_lifetime: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The token signing secret has not been set. I'm using a random value for this session. All \
             issued tokens become invalid when the server restarts. Set DKN_TOKEN_SECRET on a production instance. \
             🚨️🚨️🚨️"
        );
        let mut rng = rand::thread_rng();
        let secret: String = (0..32).map(|_| format!("{:02x}", rng.gen::<u8>())).collect();
        Self { api_key: None, token_secret: Secret::new(secret), token_lifetime: DEFAULT_TOKEN_LIFETIME }
    }
}

impl AuthConfig {
    pub fn from_env_or_default() -> Self {
        let api_key = env::var("DKN_API_KEY").ok().map(Secret::new);
        if api_key.is_none() {
            warn!("🪛️ DKN_API_KEY is not set. Staff endpoints will reject every request.");
        }
        let token_lifetime = env::var("DKN_TOKEN_LIFETIME_HOURS")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for DKN_TOKEN_LIFETIME_HOURS. {e}"))
                    .ok()
            })
            .map(Duration::hours)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        match env::var("DKN_TOKEN_SECRET") {
            Ok(secret) => Self { api_key, token_secret: Secret::new(secret), token_lifetime },
            Err(_) => Self { api_key, token_lifetime, ..Default::default() },
        }
    }
}

//-------------------------------------------------  WebhookConfig  ----------------------------------------------------
#[derive(Clone, Debug)]
pub struct WebhookConfig {
    /// HMAC key for incoming provider webhooks. When unset, signature checks are skipped (dev mode only).
    pub secret: Option<Secret<String>>,
    /// Header carrying the hex HMAC-SHA256 signature of the raw body.
    pub header: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self { secret: None, header: DEFAULT_WEBHOOK_HEADER.to_string() }
    }
}

impl WebhookConfig {
    pub fn from_env_or_default() -> Self {
        let checks = parse_boolean_flag(env::var("DKN_WEBHOOK_CHECKS").ok(), true);
        let secret = if checks { env::var("DKN_WEBHOOK_SECRET").ok().map(Secret::new) } else { None };
        if secret.is_none() {
            warn!(
                "🚨️ Webhook signatures will NOT be checked. Set DKN_WEBHOOK_SECRET (and leave DKN_WEBHOOK_CHECKS \
                 unset) on a production instance."
            );
        }
        let header = env::var("DKN_WEBHOOK_HEADER").ok().unwrap_or_else(|| DEFAULT_WEBHOOK_HEADER.into());
        Self { secret, header }
    }
}

//-------------------------------------------------  ChannelsConfig  ---------------------------------------------------
/// Endpoints for the outbound notification channels. Each one is optional; an unconfigured channel is simply not
/// registered with the notifier.
#[derive(Clone, Debug, Default)]
pub struct ChannelsConfig {
    pub fcm_server_key: Option<Secret<String>>,
    pub email_relay_url: Option<String>,
    pub sms_relay_url: Option<String>,
    pub whatsapp_relay_url: Option<String>,
    pub chatops_webhook_url: Option<String>,
}

impl ChannelsConfig {
    pub fn from_env() -> Self {
        let fcm_server_key = env::var("DKN_FCM_SERVER_KEY").ok().map(Secret::new);
        if fcm_server_key.is_none() {
            info!("🪛️ DKN_FCM_SERVER_KEY is not set. Push notifications are disabled.");
        }
        Self {
            fcm_server_key,
            email_relay_url: env::var("DKN_EMAIL_RELAY_URL").ok(),
            sms_relay_url: env::var("DKN_SMS_RELAY_URL").ok(),
            whatsapp_relay_url: env::var("DKN_WHATSAPP_RELAY_URL").ok(),
            chatops_webhook_url: env::var("DKN_CHATOPS_WEBHOOK_URL").ok(),
        }
    }
}

//-------------------------------------------------  KuraimiConfig  ----------------------------------------------------
/// Connection details for the Kuraimi e-payment API. When absent, payment creation falls back to manual transfer
/// instructions carrying the `ORDER-<id>` reference.
#[derive(Clone, Debug, Default)]
pub struct KuraimiConfig {
    pub base_url: Option<String>,
    pub merchant_id: Option<String>,
    pub api_key: Option<Secret<String>>,
}

impl KuraimiConfig {
    pub fn from_env() -> Self {
        let config = Self {
            base_url: env::var("DKN_KURAIMI_BASE_URL").ok(),
            merchant_id: env::var("DKN_KURAIMI_MERCHANT_ID").ok(),
            api_key: env::var("DKN_KURAIMI_API_KEY").ok().map(Secret::new),
        };
        if !config.is_configured() {
            info!("🪛️ Kuraimi API is not configured. Payment creation will return manual transfer instructions.");
        }
        config
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.merchant_id.is_some() && self.api_key.is_some()
    }
}
