//! Request handlers for the booking endpoints.
//!
//! Handlers run after CORS and rate limiting; each validates its input, makes at most one
//! EHR call through the gateway, and renders exactly one envelope.

pub mod appointments;
pub mod auth;
pub mod doctors;
pub mod patients;
pub mod visit_reasons;

use crate::AppState;
use api_shared::ApiFailure;
use axum::{body::Bytes, http::StatusCode, response::Response};
use booking_core::BookingError;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Log a failed request and render its error envelope.
pub(crate) fn reject(state: &AppState, context: &str, failure: ApiFailure) -> Response {
    if failure.status.is_server_error() {
        tracing::error!("{context} error: {:?}", failure);
    } else {
        tracing::warn!(
            code = %failure.code,
            status = failure.status.as_u16(),
            "{context} rejected: {}",
            failure.message
        );
    }
    state.envelopes.error(failure)
}

/// Query parameters as a JSON object, so they go through the same validator as bodies.
pub(crate) fn query_object(params: HashMap<String, String>) -> Map<String, Value> {
    params
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}

/// Parse a request body as a JSON object. An empty body is an empty object.
pub(crate) fn body_object(body: &Bytes) -> Result<Map<String, Value>, ApiFailure> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiFailure::new(
            StatusCode::BAD_REQUEST,
            "INVALID_REQUEST_BODY",
            "Request body must be a JSON object",
        )),
        Err(e) => Err(ApiFailure::new(
            StatusCode::BAD_REQUEST,
            "INVALID_REQUEST_BODY",
            "Request body must be valid JSON",
        )
        .with_details(e.to_string())),
    }
}

/// `INVALID_FORMAT` for a vendor reply that does not contain the expected list.
pub(crate) fn invalid_format(what: &str) -> BookingError {
    BookingError::InvalidResponse {
        code: "INVALID_FORMAT",
        message: format!("{what} missing from EHR response"),
    }
}

/// Re-label vendor and transport failures with an endpoint-specific code.
///
/// Configuration, authentication, timeout and input errors keep their own codes.
pub(crate) fn relabel(err: BookingError, code: &str, message: &str) -> ApiFailure {
    match err {
        BookingError::Gateway { .. } | BookingError::Internal(_) => ApiFailure::from(err)
            .with_code(code)
            .with_message(message),
        other => other.into(),
    }
}
