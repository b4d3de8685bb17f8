use std::fmt::Display;

use chrono::{DateTime, Utc};
use dukkan_common::Money;
use dukkan_engine::db_types::{OrderStatus, PaymentMethod};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: i64,
    pub quantity: i64,
}

/// Body of `POST /orders/create`. The `total` field is accepted for wire compatibility and ignored; totals are always
/// recomputed server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectOrderBody {
    pub user_id: Option<String>,
    pub items: Vec<DirectOrderItemBody>,
    #[serde(default)]
    pub total: Option<Money>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectOrderItemBody {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProofBody {
    pub method: PaymentMethod,
    #[serde(default)]
    pub amount: Option<Money>,
    /// Inline payment evidence, base64-encoded. Stored via the proof store; failures there are best-effort.
    #[serde(default)]
    pub proof_base64: Option<String>,
    /// Alternative to `proof_base64` when the evidence is already hosted somewhere.
    #[serde(default)]
    pub proof_url: Option<String>,
    #[serde(default)]
    pub provider_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentBody {
    #[serde(default)]
    pub payment_id: Option<i64>,
    #[serde(default)]
    pub provider_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KuraimiCreateBody {
    pub order_id: i64,
    #[serde(default)]
    pub service_code: Option<String>,
    #[serde(default)]
    pub wallet_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookBody {
    /// `ORDER-<id>` as handed to the provider at payment creation.
    pub reference: String,
    pub status: String,
    #[serde(default)]
    pub provider_reference: Option<String>,
    #[serde(default)]
    pub amount: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FcmTokenBody {
    pub token: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub user_id: String,
    /// Must match the configured api key for the issued token to carry the admin claim.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQueryParams {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub unread: Option<u8>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub admin: Option<u8>,
}
