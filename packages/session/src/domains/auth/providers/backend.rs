use async_trait::async_trait;
use storefront_api::{ApiError, StorefrontClient, UserDetail, VerifyOutcome};
use tracing::{debug, warn};

use crate::domains::auth::Authenticated;
use crate::domains::profile::{
    profile_from_remote, Identity, Profile, Registered, Registration, RemoteUser, SubjectId,
};
use crate::error::{Result, SessionError};
use crate::kernel::{BaseOtpProvider, BaseProfileDirectory};

/// Storefront REST backend as OTP provider and profile directory.
#[derive(Debug, Clone)]
pub struct BackendProvider {
    client: StorefrontClient,
}

impl BackendProvider {
    pub fn new(client: StorefrontClient) -> Self {
        Self { client }
    }
}

/// Subject id for a number the backend has not assigned an id to yet.
fn provisional_subject(phone_number: &str) -> SubjectId {
    SubjectId::new(format!("api_{}", phone_number))
}

fn remote_id(user: Option<&storefront_api::ApiUser>, detail: Option<&UserDetail>) -> Option<String> {
    user.map(|u| u.id.to_string())
        .or_else(|| detail.and_then(|d| d.user_id.as_ref()).map(|id| id.to_string()))
}

fn transient(err: ApiError) -> SessionError {
    SessionError::transient(err)
}

#[async_trait]
impl BaseOtpProvider for BackendProvider {
    async fn send_code(&self, phone_number: &str) -> Result<()> {
        match self.client.send_otp(phone_number).await {
            Ok(_) => Ok(()),
            Err(ApiError::Api { status, message }) if (400..500).contains(&status) => {
                Err(SessionError::validation(if message.is_empty() {
                    "Failed to send OTP".to_string()
                } else {
                    message
                }))
            }
            Err(e) => Err(transient(e)),
        }
    }

    async fn check_code(&self, phone_number: &str, code: &str) -> Result<Authenticated> {
        let outcome = match self.client.verify_otp(phone_number, code).await {
            Ok(outcome) => outcome,
            Err(ApiError::Unauthorized) => return Err(SessionError::InvalidCode),
            Err(e) if e.is_client_error() => {
                debug!(error = %e, "Backend rejected code");
                return Err(SessionError::InvalidCode);
            }
            Err(e) => return Err(transient(e)),
        };

        match outcome {
            VerifyOutcome::NewUser => Ok(Authenticated::new_user(Identity::new(
                provisional_subject(phone_number),
                phone_number,
            ))),
            VerifyOutcome::Existing {
                token,
                user,
                user_detail,
            } => {
                let subject_id = remote_id(user.as_ref(), user_detail.as_ref())
                    .map(SubjectId::new)
                    .unwrap_or_else(|| provisional_subject(phone_number));

                // A token means the number is registered, even if the detail
                // block was left out of the response
                let profile = match user_detail {
                    Some(detail) => profile_from_remote(&RemoteUser {
                        id: subject_id.to_string(),
                        detail,
                    }),
                    None => Profile {
                        registration_complete: true,
                        ..Profile::incomplete(subject_id.clone())
                    },
                };

                Ok(Authenticated {
                    identity: Identity::new(subject_id, phone_number),
                    token: Some(token),
                    profile: Some(profile),
                })
            }
        }
    }
}

#[async_trait]
impl BaseProfileDirectory for BackendProvider {
    async fn fetch_current_user(&self, token: &str) -> Result<RemoteUser> {
        match self.client.current_user(token).await {
            Ok(user) => Ok(RemoteUser {
                id: user.id.to_string(),
                detail: user.safe_user_detail.unwrap_or_default(),
            }),
            Err(ApiError::Unauthorized) => Err(SessionError::SessionExpired),
            Err(e) => Err(transient(e)),
        }
    }

    async fn register_user(
        &self,
        identity: &Identity,
        registration: &Registration,
    ) -> Result<Registered> {
        let request = registration.to_request(identity);
        let response = match self.client.register_user(&request).await {
            Ok(response) => response,
            Err(ApiError::Api { status, message }) if (200..500).contains(&status) => {
                warn!(status, %message, "Registration rejected by backend");
                return Err(SessionError::validation(if message.is_empty() {
                    "Failed to register".to_string()
                } else {
                    message
                }));
            }
            Err(ApiError::Unauthorized) => return Err(SessionError::SessionExpired),
            Err(e) => return Err(transient(e)),
        };

        let id = remote_id(response.user.as_ref(), response.user_detail.as_ref())
            .unwrap_or_else(|| identity.subject_id.to_string());

        Ok(Registered {
            // register_user only returns Ok when a token is present
            token: response.token.unwrap_or_default(),
            user: RemoteUser {
                id,
                detail: response.user_detail.unwrap_or_default(),
            },
        })
    }
}
