//! Auth domain - phone OTP authentication behind pluggable providers
//!
//! Responsibilities:
//! - Phone normalization and code format checks
//! - Single-use, expiring OTP challenges
//! - Provider adapters (storefront backend, Twilio Verify, local/offline)
//! - Locally signed tokens for the offline provider

pub mod authenticator;
pub mod challenge;
pub mod jwt;
pub mod providers;

pub use authenticator::{Authenticated, OtpAuthenticator, CHALLENGE_TTL};
pub use challenge::Challenge;
pub use jwt::{Claims, JwtService};
