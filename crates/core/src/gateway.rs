//! Authenticated calls to the Harmony EHR API.
//!
//! [`HarmonyGateway::call`] acquires a token, issues one JSON request and normalises the
//! outcome: vendor non-2xx replies become `BookingError::Gateway` carrying the vendor status
//! and raw body, transport failures become `Timeout` or `Internal`. The gateway never
//! retries. A vendor 401 drops the cached token so the next request re-authenticates.
//!
//! The sub-operations below are thin path and method bindings over `call`.

use crate::clock::Clock;
use crate::config::{BookingConfig, Credentials};
use crate::constants::{
    APPOINTMENTS_PATH, AVAILABLE_SLOTS_PATH, NEXT_AVAILABLE_SLOTS_PATH, PATIENTS_PATH,
    PATIENT_SEARCH_PATH, PROVIDER_SPECIALTY_PATH, VISIT_REASONS_PATH,
};
use crate::token::{AccessToken, TokenAcquirer};
use crate::{BookingError, BookingResult};
use chrono::NaiveDate;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;

/// Query for slots of one provider at one location over a date range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotQuery {
    pub provider_id: String,
    pub location_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

pub struct HarmonyGateway {
    http: reqwest::Client,
    credentials: Option<Credentials>,
    tokens: TokenAcquirer,
}

impl HarmonyGateway {
    /// Build the gateway and its token acquirer from startup configuration.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::Config` if the HTTP client cannot be constructed.
    pub fn new(config: &BookingConfig, clock: Arc<dyn Clock>) -> BookingResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| BookingError::Config(format!("failed to build HTTP client: {e}")))?;
        let credentials = config.credentials().cloned();
        let tokens = TokenAcquirer::new(
            http.clone(),
            credentials.clone(),
            config.token_path(),
            clock,
        );

        Ok(Self {
            http,
            credentials,
            tokens,
        })
    }

    pub fn tokens(&self) -> &TokenAcquirer {
        &self.tokens
    }

    pub async fn access_token(&self, force_refresh: bool) -> BookingResult<AccessToken> {
        self.tokens.get_access_token(force_refresh).await
    }

    fn credentials(&self) -> BookingResult<&Credentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| BookingError::Config("EHR credentials are not configured".into()))
    }

    /// Issue one authenticated request against `path` (relative to the EHR base URL).
    ///
    /// Returns the parsed JSON body, or `Value::Null` for an empty 2xx body.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> BookingResult<Value> {
        let credentials = self.credentials()?;
        let token = self.tokens.get_access_token(false).await?;
        let url = format!("{}{}", credentials.base_url, path);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&token.value)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(%method, path, "EHR request error: {e}");
            BookingError::from_transport(e)
        })?;
        let status = response.status();
        let text = response.text().await.map_err(BookingError::from_transport)?;

        if !status.is_success() {
            tracing::error!(%method, path, status = status.as_u16(), body = %text, "EHR request failed");
            if status == StatusCode::UNAUTHORIZED {
                self.tokens.invalidate().await;
            }
            return Err(BookingError::Gateway {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| BookingError::Internal(format!("EHR returned invalid JSON: {e}")))
    }

    /// Next available slots for one provider over `days` days.
    pub async fn next_available_slots(&self, provider_id: &str, days: u32) -> BookingResult<Value> {
        self.call(
            Method::GET,
            NEXT_AVAILABLE_SLOTS_PATH,
            &[
                ("provider_id", provider_id.to_string()),
                ("noOfDays", days.to_string()),
            ],
            None,
        )
        .await
    }

    /// Slots for a provider and location over an inclusive date range.
    pub async fn provider_slots(&self, query: &SlotQuery) -> BookingResult<Value> {
        self.call(
            Method::GET,
            AVAILABLE_SLOTS_PATH,
            &[
                ("provider_id", query.provider_id.clone()),
                ("location_id", query.location_id.clone()),
                ("start_date", query.start_date.format("%Y-%m-%d").to_string()),
                ("end_date", query.end_date.format("%Y-%m-%d").to_string()),
            ],
            None,
        )
        .await
    }

    pub async fn book_appointment(&self, booking: &Value) -> BookingResult<Value> {
        self.call(Method::POST, APPOINTMENTS_PATH, &[], Some(booking))
            .await
    }

    pub async fn search_patients(&self, criteria: &Value) -> BookingResult<Value> {
        self.call(Method::POST, PATIENT_SEARCH_PATH, &[], Some(criteria))
            .await
    }

    pub async fn create_patient(&self, patient: &Value) -> BookingResult<Value> {
        self.call(Method::POST, PATIENTS_PATH, &[], Some(patient))
            .await
    }

    pub async fn visit_reasons(&self) -> BookingResult<Value> {
        self.call(Method::GET, VISIT_REASONS_PATH, &[], None).await
    }

    /// Providers registered under a specialty code.
    pub async fn providers_by_specialty(&self, code: &str) -> BookingResult<Value> {
        validate_path_segment(code)?;
        let path = format!("{PROVIDER_SPECIALTY_PATH}/{code}");
        self.call(Method::GET, &path, &[], None).await
    }
}

fn validate_path_segment(segment: &str) -> BookingResult<()> {
    let ok = !segment.is_empty()
        && !segment.bytes().all(|b| b == b'.')
        && segment
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));
    if ok {
        Ok(())
    } else {
        Err(BookingError::InvalidInput {
            code: "INVALID_PARAMETERS",
            message: "specialty code contains invalid characters".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    #[test]
    fn test_specialty_code_must_be_a_safe_segment() {
        assert!(validate_path_segment("207V00000X").is_ok());
        assert!(validate_path_segment("../admin").is_err());
        assert!(validate_path_segment("").is_err());
        assert!(validate_path_segment("..").is_err());
    }

    #[tokio::test]
    async fn test_call_without_credentials_is_config_error() {
        let gateway = HarmonyGateway::new(&BookingConfig::new(None), Arc::new(SystemClock)).unwrap();
        let err = gateway.visit_reasons().await.unwrap_err();
        assert!(matches!(err, BookingError::Config(_)));
    }
}
