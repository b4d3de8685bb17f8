//! Access tokens and the admin guard.
//!
//! Tokens are compact signed strings: `base64url(claims JSON) . hex(HMAC-SHA256(payload))`, signed with the
//! `DKN_TOKEN_SECRET` key and carrying an expiry. Staff endpoints accept either a bearer token with the admin claim
//! or the static `x-api-key` header, so service-to-service calls don't need a token exchange.
use std::future::{ready, Ready};

use actix_web::{web, FromRequest, HttpRequest};
use chrono::{DateTime, Duration, Utc};
use dukkan_common::Secret;
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
    helpers::calculate_hmac,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// The user id the token was issued to.
    pub sub: String,
    pub admin: bool,
    pub exp: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenIssuer {
    secret: Secret<String>,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { secret: config.token_secret.clone(), lifetime: config.token_lifetime }
    }

    pub fn issue(&self, sub: &str, admin: bool) -> Result<String, ServerError> {
        let claims = AccessClaims { sub: sub.to_string(), admin, exp: Utc::now() + self.lifetime };
        let json = serde_json::to_vec(&claims)
            .map_err(|e| ServerError::Unspecified(format!("Could not serialize access claims: {e}")))?;
        let payload = base64::encode_config(json, base64::URL_SAFE_NO_PAD);
        let signature = calculate_hmac(self.secret.reveal(), payload.as_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    pub fn validate(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| AuthError::PoorlyFormattedToken("missing signature separator".to_string()))?;
        let expected = calculate_hmac(self.secret.reveal(), payload.as_bytes());
        if signature != expected {
            return Err(AuthError::ValidationError("signature mismatch".to_string()));
        }
        let json = base64::decode_config(payload, base64::URL_SAFE_NO_PAD)
            .map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        let claims: AccessClaims =
            serde_json::from_slice(&json).map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        if claims.exp < Utc::now() {
            return Err(AuthError::ValidationError("token has expired".to_string()));
        }
        Ok(claims)
    }
}

/// Everything the admin guard needs, registered as app data in `server.rs`.
#[derive(Clone)]
pub struct AuthState {
    pub api_key: Option<Secret<String>>,
    pub issuer: TokenIssuer,
}

impl AuthState {
    pub fn new(config: &AuthConfig) -> Self {
        Self { api_key: config.api_key.clone(), issuer: TokenIssuer::new(config) }
    }
}

/// Extractor that only succeeds for staff credentials. Handlers taking an `AdminClaims` parameter are admin-gated.
#[derive(Debug, Clone)]
pub struct AdminClaims {
    pub sub: String,
}

impl FromRequest for AdminClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        ready(require_admin(req))
    }
}

/// The admin check behind the [`AdminClaims`] extractor, callable directly for conditionally-gated handlers.
pub fn require_admin(req: &HttpRequest) -> Result<AdminClaims, ServerError> {
    let state = req
        .app_data::<web::Data<AuthState>>()
        .ok_or_else(|| ServerError::ConfigurationError("Authentication state is not registered".to_string()))?;
    if let Some(key) = req.headers().get("x-api-key").and_then(|v| v.to_str().ok()) {
        return match &state.api_key {
            Some(expected) if key == expected.reveal() => Ok(AdminClaims { sub: "api-key".to_string() }),
            _ => {
                warn!("💻️ Rejected request with an invalid x-api-key");
                Err(AuthError::ValidationError("invalid api key".to_string()).into())
            },
        };
    }
    let bearer = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingCredentials)?;
    let claims = state.issuer.validate(bearer)?;
    if !claims.admin {
        return Err(AuthError::InsufficientPermissions("admin claim required".to_string()).into());
    }
    Ok(AdminClaims { sub: claims.sub })
}
