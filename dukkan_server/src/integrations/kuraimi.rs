//! Kuraimi e-payment API client.
//!
//! Creates a hosted payment session for an order. When the API is not configured the caller falls back to returning
//! manual transfer instructions, so the storefront keeps working without provider credentials.
use dukkan_common::Money;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::KuraimiConfig;

#[derive(Debug, Error)]
pub enum KuraimiApiError {
    #[error("Could not initialize the Kuraimi client. {0}")]
    Initialization(String),
    #[error("Kuraimi request failed. {0}")]
    RequestError(String),
    #[error("Kuraimi answered with status {status}: {message}")]
    QueryError { status: u16, message: String },
    #[error("Could not decode the Kuraimi response. {0}")]
    JsonError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    pub session_id: String,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

#[derive(Clone)]
pub struct KuraimiClient {
    base_url: String,
    merchant_id: String,
    client: Client,
}

impl KuraimiClient {
    /// `None` when the provider is not configured; the payment route then serves manual instructions instead.
    pub fn from_config(config: &KuraimiConfig) -> Result<Option<Self>, KuraimiApiError> {
        let (Some(base_url), Some(merchant_id), Some(api_key)) =
            (&config.base_url, &config.merchant_id, &config.api_key)
        else {
            return Ok(None);
        };
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(api_key.reveal().as_str())
            .map_err(|e| KuraimiApiError::Initialization(e.to_string()))?;
        headers.insert("x-api-key", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| KuraimiApiError::Initialization(e.to_string()))?;
        Ok(Some(Self { base_url: base_url.clone(), merchant_id: merchant_id.clone(), client }))
    }

    /// Asks the provider for a payment session carrying our `ORDER-<id>` reference, so the webhook can correlate the
    /// settlement back to the order.
    pub async fn create_payment(
        &self,
        reference: &str,
        amount: Money,
        service_code: Option<&str>,
        wallet_code: Option<&str>,
    ) -> Result<PaymentSession, KuraimiApiError> {
        let url = format!("{}/payments", self.base_url);
        let body = json!({
            "merchantId": self.merchant_id,
            "reference": reference,
            "amount": amount.value(),
            "currency": dukkan_common::STORE_CURRENCY_CODE,
            "serviceCode": service_code,
            "walletCode": wallet_code,
        });
        trace!("💳️ Creating Kuraimi payment session for {reference}");
        let response =
            self.client.post(url).json(&body).send().await.map_err(|e| KuraimiApiError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            response.json::<PaymentSession>().await.map_err(|e| KuraimiApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| KuraimiApiError::RequestError(e.to_string()))?;
            Err(KuraimiApiError::QueryError { status, message })
        }
    }
}
