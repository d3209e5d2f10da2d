//! Uniform JSON response envelopes.
//!
//! Every outcome of a booking endpoint is one envelope:
//! - success: `{ "success": true, ...body }`
//! - error: `{ "success": false, "error": <message>, "code": <CODE>, "details"?: <text> }`
//!
//! `details` carries vendor bodies and internal error text. It is only rendered outside
//! production; in production clients see the generic message and code alone.

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use booking_core::{BookingError, RuntimeEnvironment};
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// A failed request, ready to be rendered as an error envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retry_after_secs: Option<u64>,
}

impl ApiFailure {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
            retry_after_secs: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Replace the error code, keeping status, message and details.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

fn vendor_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status)
        .ok()
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::BAD_GATEWAY)
}

impl From<BookingError> for ApiFailure {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Config(msg) => ApiFailure::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Server configuration error",
            )
            .with_details(msg),
            BookingError::RateLimitExceeded { retry_after_secs } => {
                let mut failure = ApiFailure::new(
                    StatusCode::TOO_MANY_REQUESTS,
                    "RATE_LIMIT_EXCEEDED",
                    "Too many requests. Please try again later.",
                );
                failure.retry_after_secs = Some(retry_after_secs);
                failure
            }
            BookingError::Validation { code, missing } => ApiFailure::new(
                StatusCode::BAD_REQUEST,
                code,
                format!("Missing required fields: {}", missing.join(", ")),
            ),
            BookingError::InvalidInput { code, message } => {
                ApiFailure::new(StatusCode::BAD_REQUEST, code, message)
            }
            BookingError::AuthFailed { status, body } => ApiFailure::new(
                vendor_status(status),
                "AUTH_FAILED",
                "Failed to authenticate with the scheduling service",
            )
            .with_details(body),
            BookingError::Gateway { status, body } => ApiFailure::new(
                vendor_status(status),
                "HARMONY_API_ERROR",
                "Scheduling service request failed",
            )
            .with_details(body),
            BookingError::Timeout => ApiFailure::new(
                StatusCode::GATEWAY_TIMEOUT,
                "GATEWAY_TIMEOUT",
                "Scheduling service did not respond in time",
            ),
            BookingError::InvalidResponse { code, message } => ApiFailure::new(
                StatusCode::BAD_REQUEST,
                code,
                "Unexpected response from the scheduling service",
            )
            .with_details(message),
            BookingError::Internal(msg) => ApiFailure::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_REQUEST_ERROR",
                "Internal server error",
            )
            .with_details(msg),
        }
    }
}

/// Error envelope body.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Builds envelopes, hiding `details` in production.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Envelopes {
    production: bool,
}

impl Envelopes {
    pub fn new(environment: RuntimeEnvironment) -> Self {
        Self {
            production: environment.is_production(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.production
    }

    /// `200 OK` success envelope.
    pub fn success<T: Serialize>(&self, body: &T) -> Response {
        self.success_with_status(StatusCode::OK, body)
    }

    /// Success envelope with an explicit status. Object bodies are merged into the envelope;
    /// any other body is placed under `data`.
    pub fn success_with_status<T: Serialize>(&self, status: StatusCode, body: &T) -> Response {
        let value = match serde_json::to_value(body) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("failed to serialise response body: {e}");
                return self.error(
                    ApiFailure::new(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_REQUEST_ERROR",
                        "Internal server error",
                    )
                    .with_details(e.to_string()),
                );
            }
        };

        let mut envelope = Map::new();
        envelope.insert("success".into(), Value::Bool(true));
        match value {
            Value::Object(fields) => envelope.extend(fields.into_iter().filter(|(k, _)| k != "success")),
            other => {
                envelope.insert("data".into(), other);
            }
        }
        (status, Json(Value::Object(envelope))).into_response()
    }

    /// Error envelope for `failure`.
    pub fn error(&self, failure: ApiFailure) -> Response {
        let body = ErrorBody {
            success: false,
            error: failure.message,
            code: failure.code,
            details: if self.production { None } else { failure.details },
        };
        let mut response = (failure.status, Json(body)).into_response();
        if let Some(secs) = failure.retry_after_secs {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }

    /// Render either outcome of a handler.
    pub fn respond(&self, result: Result<Response, ApiFailure>) -> Response {
        result.unwrap_or_else(|failure| self.error(failure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::json;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_success_merges_object_fields() {
        let envelopes = Envelopes::new(RuntimeEnvironment::Development);
        let response = envelopes.success(&json!({"data": [1, 2], "count": 2, "success": false}));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"success": true, "data": [1, 2], "count": 2})
        );
    }

    #[tokio::test]
    async fn test_success_wraps_non_object() {
        let envelopes = Envelopes::new(RuntimeEnvironment::Development);
        let response = envelopes.success(&vec!["a"]);
        assert_eq!(body_json(response).await, json!({"success": true, "data": ["a"]}));
    }

    #[tokio::test]
    async fn test_details_shown_outside_production() {
        let envelopes = Envelopes::new(RuntimeEnvironment::Development);
        let failure = ApiFailure::from(BookingError::Internal("boom".into()));
        let response = envelopes.error(failure);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({
                "success": false,
                "error": "Internal server error",
                "code": "INTERNAL_REQUEST_ERROR",
                "details": "boom"
            })
        );
    }

    #[tokio::test]
    async fn test_details_hidden_in_production() {
        let envelopes = Envelopes::new(RuntimeEnvironment::Production);
        let failure = ApiFailure::from(BookingError::Gateway {
            status: 503,
            body: "stack trace".into(),
        });
        let response = envelopes.error(failure);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["code"], "HARMONY_API_ERROR");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_sets_retry_after() {
        let envelopes = Envelopes::new(RuntimeEnvironment::Development);
        let response = envelopes.error(ApiFailure::from(BookingError::RateLimitExceeded {
            retry_after_secs: 42,
        }));
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(RETRY_AFTER).unwrap(), "42");
    }

    #[test]
    fn test_validation_message_lists_fields() {
        let failure = ApiFailure::from(BookingError::Validation {
            code: "MISSING_REQUIRED_FIELDS",
            missing: vec!["provider_id".into(), "duration".into()],
        });
        assert_eq!(failure.status, StatusCode::BAD_REQUEST);
        assert_eq!(failure.code, "MISSING_REQUIRED_FIELDS");
        assert_eq!(failure.message, "Missing required fields: provider_id, duration");
    }

    #[test]
    fn test_odd_vendor_status_becomes_bad_gateway() {
        let failure = ApiFailure::from(BookingError::Gateway {
            status: 302,
            body: String::new(),
        });
        assert_eq!(failure.status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_with_code_keeps_status() {
        let failure = ApiFailure::from(BookingError::Timeout).with_code("BOOKING_ERROR");
        assert_eq!(failure.status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(failure.code, "BOOKING_ERROR");
    }
}
