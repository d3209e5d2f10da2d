/// Errors returned by [`crate::BookingClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid proxy URL: {0}")]
    InvalidUrl(String),
    #[error("request to booking proxy failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The proxy answered with an error envelope (or a non-2xx status).
    #[error("booking proxy returned {status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("unexpected response from booking proxy: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
