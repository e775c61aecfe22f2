use async_trait::async_trait;
use twilio::{TwilioError, TwilioService};

use crate::common::hash_phone_number;
use crate::domains::auth::Authenticated;
use crate::domains::profile::{Identity, SubjectId};
use crate::error::{Result, SessionError};
use crate::kernel::BaseOtpProvider;

/// Twilio Verify as the identity provider.
///
/// Twilio only proves possession of the number; it issues no bearer token
/// and holds no profile, so every verification yields a fresh identity whose
/// subject id is the phone hash. Tokens come from the profile directory at
/// registration time.
pub struct TwilioProvider {
    service: TwilioService,
}

impl TwilioProvider {
    pub fn new(service: TwilioService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl BaseOtpProvider for TwilioProvider {
    async fn send_code(&self, phone_number: &str) -> Result<()> {
        match self.service.send_otp(phone_number).await {
            Ok(_) => Ok(()),
            Err(TwilioError::Api { status, .. }) if (400..500).contains(&status) => Err(
                SessionError::validation("Please enter a valid phone number"),
            ),
            Err(e) => Err(SessionError::transient(e)),
        }
    }

    async fn check_code(&self, phone_number: &str, code: &str) -> Result<Authenticated> {
        match self.service.verify_otp(phone_number, code).await {
            Ok(()) => Ok(Authenticated::new_user(Identity::new(
                SubjectId::new(hash_phone_number(phone_number)),
                phone_number,
            ))),
            Err(e) if e.is_rejected_code() => Err(SessionError::InvalidCode),
            Err(e) => Err(SessionError::transient(e)),
        }
    }
}
