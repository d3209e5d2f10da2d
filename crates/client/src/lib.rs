//! # Booking Client
//!
//! Async client for the booking proxy's REST API.
//!
//! The client fetches a token from `POST /auth/access-token`, caches it until shortly before
//! it expires, and presents it as a bearer token on every call. When the proxy answers
//! `401`, the client refreshes the token once and retries the request once; any other
//! failure is returned as-is.

mod error;

pub use error::{ClientError, ClientResult};

use booking_core::{AppointmentSlot, AvailableDate, Doctor, Patient, VisitReason};
use chrono::NaiveDate;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Seconds shaved off the advertised token lifetime before the client stops reusing it.
const TOKEN_REUSE_MARGIN_SECS: u64 = 30;

#[derive(Clone, Debug)]
struct CachedToken {
    value: String,
    reuse_until: Instant,
}

/// Confirmation returned by `POST /doctors/appointments`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub appointment_id: Option<String>,
    pub status: String,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

#[derive(Deserialize)]
struct ListEnvelope<T> {
    data: Vec<T>,
}

#[derive(Deserialize)]
struct TokenEnvelope {
    data: TokenData,
}

#[derive(Deserialize)]
struct TokenData {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct CreatedPatient {
    patient_id: String,
}

/// Client for one booking proxy deployment.
pub struct BookingClient {
    http: reqwest::Client,
    base_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl BookingClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidUrl(base_url));
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            token: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Token for the proxy, reusing the cached one unless `force_refresh` is set.
    pub async fn access_token(&self, force_refresh: bool) -> ClientResult<String> {
        let mut cached = self.token.lock().await;
        if !force_refresh {
            if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.reuse_until) {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .http
            .post(format!("{}/auth/access-token", self.base_url))
            .send()
            .await?;
        let envelope: TokenEnvelope = read_envelope(response).await?;
        let lifetime = envelope
            .data
            .expires_in
            .unwrap_or(0)
            .saturating_sub(TOKEN_REUSE_MARGIN_SECS);
        let token = CachedToken {
            value: envelope.data.access_token,
            reuse_until: Instant::now() + Duration::from_secs(lifetime),
        };
        tracing::debug!(lifetime_secs = lifetime, "fetched booking proxy token");
        *cached = Some(token.clone());
        Ok(token.value)
    }

    /// Send an authenticated request, retrying exactly once with a fresh token on `401`.
    pub async fn authenticated_request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> ClientResult<Value> {
        let token = self.access_token(false).await?;
        let response = self.send(method.clone(), path, query, body, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return read_envelope(response).await;
        }

        tracing::debug!(path, "proxy rejected token, retrying with a fresh one");
        let token = self.access_token(true).await?;
        let response = self.send(method, path, query, body, &token).await?;
        read_envelope(response).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        token: &str,
    ) -> ClientResult<reqwest::Response> {
        let mut request = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    async fn get_as<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ClientResult<T> {
        let value = self.authenticated_request(Method::GET, path, query, None).await?;
        decode(value)
    }

    async fn post_as<T: DeserializeOwned>(&self, path: &str, body: &Value) -> ClientResult<T> {
        let value = self
            .authenticated_request(Method::POST, path, &[], Some(body))
            .await?;
        decode(value)
    }

    pub async fn doctors(&self, specialty: Option<&str>) -> ClientResult<Vec<Doctor>> {
        let query: Vec<(&str, String)> = specialty
            .map(|s| vec![("specialty", s.to_string())])
            .unwrap_or_default();
        let list: ListEnvelope<Doctor> = self.get_as("/doctors", &query).await?;
        Ok(list.data)
    }

    pub async fn available_dates(
        &self,
        provider_id: &str,
        days: Option<u32>,
    ) -> ClientResult<Vec<AvailableDate>> {
        let mut query = vec![("provider_id", provider_id.to_string())];
        if let Some(days) = days {
            query.push(("noOfDays", days.to_string()));
        }
        let list: ListEnvelope<AvailableDate> =
            self.get_as("/doctors/available-dates", &query).await?;
        Ok(list.data)
    }

    pub async fn slots(
        &self,
        provider_id: &str,
        location_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ClientResult<Vec<AppointmentSlot>> {
        let query = [
            ("provider_id", provider_id.to_string()),
            ("location_id", location_id.to_string()),
            ("start_date", start_date.format("%Y-%m-%d").to_string()),
            ("end_date", end_date.format("%Y-%m-%d").to_string()),
        ];
        let list: ListEnvelope<AppointmentSlot> = self.get_as("/doctors/slots", &query).await?;
        Ok(list.data)
    }

    pub async fn visit_reasons(&self) -> ClientResult<Vec<VisitReason>> {
        let list: ListEnvelope<VisitReason> = self.get_as("/visit-reasons", &[]).await?;
        Ok(list.data)
    }

    pub async fn book_appointment(&self, booking: &Value) -> ClientResult<BookingConfirmation> {
        self.post_as("/doctors/appointments", booking).await
    }

    pub async fn search_patients(&self, criteria: &Value) -> ClientResult<Vec<Patient>> {
        let list: ListEnvelope<Patient> = self.post_as("/patients/search", criteria).await?;
        Ok(list.data)
    }

    /// Create a patient, returning the EHR-assigned patient id.
    pub async fn create_patient(&self, patient: &Value) -> ClientResult<String> {
        let created: CreatedPatient = self.post_as("/patients", patient).await?;
        Ok(created.patient_id)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> ClientResult<T> {
    serde_json::from_value(value).map_err(|e| ClientError::InvalidResponse(e.to_string()))
}

/// Parse a proxy response: the body on success, [`ClientError::Api`] otherwise.
async fn read_envelope<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
    let status = response.status();
    let text = response.text().await?;
    if status.is_success() {
        return serde_json::from_str(&text).map_err(|e| ClientError::InvalidResponse(e.to_string()));
    }

    let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
    let field = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);
    Err(ClientError::Api {
        status: status.as_u16(),
        code: field("code").unwrap_or_else(|| "HTTP_ERROR".into()),
        message: field("error").unwrap_or(text),
    })
}
