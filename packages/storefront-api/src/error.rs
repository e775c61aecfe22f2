//! Error types for the storefront backend client.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection failed before any response arrived
    #[error("Network error: {0}")]
    Network(String),

    /// No response within the client's request timeout
    #[error("Request timed out")]
    Timeout,

    /// Bearer token was rejected (HTTP 401)
    #[error("Unauthorized")]
    Unauthorized,

    /// Any other non-2xx response; `message` comes from the body when present
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// 4xx responses other than 401: the request itself was rejected.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ApiError::Api { status, .. } if (400..500).contains(status))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}
