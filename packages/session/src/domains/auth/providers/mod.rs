//! Provider adapters behind `BaseOtpProvider` / `BaseProfileDirectory`.
//!
//! Chosen once at composition time (see `kernel::deps`):
//! - `BackendProvider` - storefront REST backend, both OTP and profiles
//! - `TwilioProvider` - Twilio Verify for OTP only
//! - `LocalProvider` - offline stand-in with a fixed code and signed tokens

pub mod backend;
pub mod local;
pub mod twilio;

pub use backend::BackendProvider;
pub use local::{LocalProvider, LOCAL_OTP_CODE};
pub use twilio::TwilioProvider;
