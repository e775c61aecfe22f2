//! Error types for the Twilio Verify client.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TwilioError>;

#[derive(Debug, Error)]
pub enum TwilioError {
    /// Request never produced a response (DNS, TLS, connect, timeout)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Twilio answered with a non-2xx status
    #[error("Twilio API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse Twilio response: {0}")]
    Parse(String),

    /// Verification check completed but the code was not accepted
    #[error("Verification not approved (status: {status})")]
    NotApproved { status: String },
}

impl TwilioError {
    /// A 4xx on a check (404 for an expired, spent or unknown verification)
    /// means the code is unusable.
    pub fn is_rejected_code(&self) -> bool {
        match self {
            TwilioError::NotApproved { .. } => true,
            TwilioError::Api { status, .. } => (400..500).contains(status),
            _ => false,
        }
    }
}
