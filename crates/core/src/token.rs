//! EHR access-token acquisition and caching.
//!
//! Stored client credentials are exchanged for a short-lived bearer token at the vendor's
//! OAuth2 token endpoint. The token is cached in process memory until five minutes before
//! the vendor says it expires. The cache lock is held across the exchange, so concurrent
//! cache misses share a single outbound call.

use crate::clock::Clock;
use crate::config::Credentials;
use crate::constants::{DEFAULT_TOKEN_LIFETIME_SECS, TOKEN_EXPIRY_BUFFER_SECS};
use crate::{BookingError, BookingResult};
use base64::{engine::general_purpose, Engine as _};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A bearer token and the instant after which it must not be presented.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at_ms: i64,
}

impl AccessToken {
    /// Build a token from the vendor's `expires_in`, applying the safety buffer.
    pub fn issued(value: String, expires_in_secs: Option<i64>, now_ms: i64) -> Self {
        let lifetime = expires_in_secs.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let usable_secs = lifetime.saturating_sub(TOKEN_EXPIRY_BUFFER_SECS).max(0);
        Self {
            value,
            expires_at_ms: now_ms.saturating_add(usable_secs.saturating_mul(1000)),
        }
    }

    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at_ms
    }

    /// Whole seconds of usable lifetime left at `now_ms`.
    pub fn expires_in_secs(&self, now_ms: i64) -> i64 {
        (self.expires_at_ms - now_ms).max(0) / 1000
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at_ms", &self.expires_at_ms)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

pub struct TokenAcquirer {
    http: reqwest::Client,
    credentials: Option<Credentials>,
    token_path: String,
    clock: Arc<dyn Clock>,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenAcquirer {
    pub fn new(
        http: reqwest::Client,
        credentials: Option<Credentials>,
        token_path: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http,
            credentials,
            token_path: token_path.into(),
            clock,
            cached: Mutex::new(None),
        }
    }

    /// Return a usable token, exchanging credentials only on a cache miss or forced refresh.
    ///
    /// # Errors
    ///
    /// - `BookingError::Config` if no credentials are configured.
    /// - `BookingError::AuthFailed` if the vendor rejects the exchange. Nothing is cached.
    /// - `BookingError::Timeout` / `BookingError::Internal` for transport failures.
    pub async fn get_access_token(&self, force_refresh: bool) -> BookingResult<AccessToken> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            BookingError::Config("EHR credentials are not configured".into())
        })?;

        let mut cached = self.cached.lock().await;
        if !force_refresh {
            let now = self.clock.now_ms();
            if let Some(token) = cached.as_ref().filter(|t| t.is_valid_at(now)) {
                return Ok(token.clone());
            }
        }
        *cached = None;

        let token = self.exchange(credentials).await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Forget the cached token so the next call re-authenticates.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    async fn exchange(&self, credentials: &Credentials) -> BookingResult<AccessToken> {
        let url = format!("{}{}", credentials.base_url, self.token_path);
        let basic = general_purpose::STANDARD.encode(format!(
            "{}:{}",
            credentials.client_id, credentials.client_secret
        ));

        tracing::debug!(%url, "requesting EHR access token");
        // The vendor accepts either the Basic header or the client_id/client_key pair.
        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Basic {basic}"))
            .header("client_id", &credentials.client_id)
            .header("client_key", &credentials.client_secret)
            .header(ACCEPT, "application/json")
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("EHR token request failed: {e}");
                BookingError::from_transport(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "EHR token exchange rejected");
            return Err(BookingError::AuthFailed {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse = response.json().await.map_err(BookingError::from_transport)?;
        let token = AccessToken::issued(parsed.access_token, parsed.expires_in, self.clock.now_ms());
        tracing::info!(expires_at_ms = token.expires_at_ms, "acquired EHR access token");
        Ok(token)
    }
}
