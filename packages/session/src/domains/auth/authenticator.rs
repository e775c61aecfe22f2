use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::challenge::Challenge;
use crate::common::{is_valid_code, normalize_phone};
use crate::domains::profile::{Identity, Profile};
use crate::error::{Result, SessionError};
use crate::kernel::BaseOtpProvider;

/// How long a requested code stays usable.
pub const CHALLENGE_TTL: Duration = Duration::from_secs(10 * 60);

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq)]
pub struct Authenticated {
    pub identity: Identity,
    /// Bearer token, when the provider issues one at verification time
    pub token: Option<String>,
    /// Profile the provider already holds for this subject
    pub profile: Option<Profile>,
}

impl Authenticated {
    pub fn new_user(identity: Identity) -> Self {
        Self {
            identity,
            token: None,
            profile: None,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.profile
            .as_ref()
            .is_some_and(|profile| profile.registration_complete)
    }
}

/// Issues and verifies single-use OTP challenges on top of a provider.
#[derive(Clone)]
pub struct OtpAuthenticator {
    provider: Arc<dyn BaseOtpProvider>,
    default_country_code: String,
    challenge_ttl: Duration,
}

impl OtpAuthenticator {
    pub fn new(provider: Arc<dyn BaseOtpProvider>, default_country_code: impl Into<String>) -> Self {
        Self {
            provider,
            default_country_code: default_country_code.into(),
            challenge_ttl: CHALLENGE_TTL,
        }
    }

    pub fn with_challenge_ttl(mut self, ttl: Duration) -> Self {
        self.challenge_ttl = ttl;
        self
    }

    pub fn default_country_code(&self) -> &str {
        &self.default_country_code
    }

    /// Normalize `phone_number` and have the provider send it a code.
    #[instrument(skip_all)]
    pub async fn request_otp(&self, phone_number: &str) -> Result<Challenge> {
        let phone_number = normalize_phone(phone_number, &self.default_country_code)?;
        debug!(%phone_number, "Requesting OTP");

        self.provider.send_code(&phone_number).await?;

        let challenge = Challenge::new(phone_number, self.challenge_ttl);
        info!(challenge_id = %challenge.id(), "OTP sent");
        Ok(challenge)
    }

    /// Verify `code` against `challenge`.
    ///
    /// Malformed codes and spent or expired challenges are rejected without
    /// contacting the provider. A wrong code leaves the challenge usable so
    /// the user can retype it; a correct one consumes it.
    #[instrument(skip_all, fields(challenge_id = %challenge.id()))]
    pub async fn verify_otp(&self, challenge: &Challenge, code: &str) -> Result<Authenticated> {
        let code = code.trim();
        if !is_valid_code(code) {
            debug!("Rejecting malformed code");
            return Err(SessionError::InvalidCode);
        }
        if challenge.is_consumed() {
            warn!("Challenge already used");
            return Err(SessionError::InvalidCode);
        }
        if challenge.is_expired() {
            warn!("Challenge expired");
            return Err(SessionError::InvalidCode);
        }

        let authenticated = self
            .provider
            .check_code(challenge.phone_number(), code)
            .await?;

        if !challenge.consume() {
            warn!("Challenge consumed by a concurrent verification");
            return Err(SessionError::InvalidCode);
        }

        info!(
            subject_id = %authenticated.identity.subject_id,
            registered = authenticated.is_registered(),
            "OTP verified"
        );
        Ok(authenticated)
    }
}
