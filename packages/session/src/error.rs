//! Session error taxonomy.
//!
//! Every failure that reaches the UI shell is one of these kinds. Transport
//! and storage errors are translated at the component boundary; raw
//! `reqwest`/`sqlx` errors never escape the crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Code did not match, or the challenge was expired or already used
    #[error("Invalid or expired verification code")]
    InvalidCode,

    /// The bearer token was rejected; the local session has been purged
    #[error("Session expired")]
    SessionExpired,

    /// Network or server hiccup; local state was left untouched
    #[error("Temporary failure: {0}")]
    Transient(String),

    /// Input rejected before any network call
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Local key-value storage failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The intent requires a signed-in identity
    #[error("Not signed in")]
    NotAuthenticated,

    /// Location could not be captured (permission denied or provider failure)
    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),
}

impl SessionError {
    /// Single human-readable notification for the UI shell.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::InvalidCode => "Invalid OTP. Please try again.".to_string(),
            SessionError::SessionExpired => {
                "Your session has expired. Please log in again.".to_string()
            }
            SessionError::Transient(_) => {
                "Could not reach the server. Please try again.".to_string()
            }
            SessionError::Validation(reason) => reason.clone(),
            SessionError::Persistence(_) => {
                "Could not save your session on this device. Please log in again.".to_string()
            }
            SessionError::NotAuthenticated => "Please log in first.".to_string(),
            SessionError::LocationUnavailable(_) => {
                "Please capture your location to continue.".to_string()
            }
        }
    }

    /// Only transient failures are worth an automatic or manual retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Transient(_))
    }

    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        SessionError::Validation(reason.into())
    }

    pub(crate) fn transient(reason: impl std::fmt::Display) -> Self {
        SessionError::Transient(reason.to_string())
    }

    pub(crate) fn persistence(reason: impl std::fmt::Display) -> Self {
        SessionError::Persistence(reason.to_string())
    }
}
