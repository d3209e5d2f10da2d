/// Errors produced by the booking pipeline.
///
/// Every failure a request can hit, from configuration through the vendor call, is one
/// of these variants. The HTTP layer maps them onto status codes and envelope codes.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },
    #[error("missing required fields: {}", missing.join(", "))]
    Validation {
        code: &'static str,
        missing: Vec<String>,
    },
    #[error("invalid input: {message}")]
    InvalidInput {
        code: &'static str,
        message: String,
    },
    #[error("EHR authentication failed with status {status}")]
    AuthFailed { status: u16, body: String },
    #[error("EHR request failed with status {status}")]
    Gateway { status: u16, body: String },
    #[error("EHR request timed out")]
    Timeout,
    #[error("unexpected EHR response: {message}")]
    InvalidResponse {
        code: &'static str,
        message: String,
    },
    #[error("internal request error: {0}")]
    Internal(String),
}

impl BookingError {
    /// Map a transport-level `reqwest` failure onto the pipeline taxonomy.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BookingError::Timeout
        } else {
            BookingError::Internal(err.to_string())
        }
    }

    /// Whether the vendor answered with 401 (credentials or token rejected).
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            BookingError::AuthFailed { status: 401, .. } | BookingError::Gateway { status: 401, .. }
        )
    }
}

pub type BookingResult<T> = std::result::Result<T, BookingError>;
