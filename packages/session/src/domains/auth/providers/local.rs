use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use storefront_api::{ApiId, LooseNumber, UserDetail};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::common::hash_phone_number;
use crate::domains::auth::{Authenticated, JwtService};
use crate::domains::profile::{
    profile_from_remote, Identity, Registered, Registration, RemoteUser, SubjectId,
};
use crate::error::{Result, SessionError};
use crate::kernel::{BaseKeyValueStore, BaseOtpProvider, BaseProfileDirectory};

/// The only code the local provider accepts.
pub const LOCAL_OTP_CODE: &str = "112233";

const LOCAL_ISSUER: &str = "storefront-local";
const USER_KEY_PREFIX: &str = "localUser:";

type LocalUser = (Identity, UserDetail);

/// Offline provider: fixed code, locally signed tokens, local profiles.
///
/// Serves as both OTP provider and profile directory so the whole session
/// flow can run without a network. Registered users live in memory, and in
/// a key-value store of their own when one is attached so they outlive the
/// process. That store must not be the session store: signing out clears
/// the session keys, never the registered users.
pub struct LocalProvider {
    jwt: JwtService,
    users: RwLock<HashMap<SubjectId, LocalUser>>,
    kv: Option<Arc<dyn BaseKeyValueStore>>,
}

impl LocalProvider {
    pub fn new(secret: &str) -> Self {
        Self::with_jwt(JwtService::new(secret, LOCAL_ISSUER.to_string()))
    }

    pub fn with_jwt(jwt: JwtService) -> Self {
        Self {
            jwt,
            users: RwLock::new(HashMap::new()),
            kv: None,
        }
    }

    /// Keep registered users in `kv` as well as in memory
    pub fn with_store(mut self, kv: Arc<dyn BaseKeyValueStore>) -> Self {
        self.kv = Some(kv);
        self
    }

    /// Deterministic subject id for a phone number.
    pub fn subject_for(phone_number: &str) -> SubjectId {
        let hash = hash_phone_number(phone_number);
        SubjectId::new(format!("user_{}", &hash[..16]))
    }

    /// Drop a registered user; outstanding tokens for it stop resolving.
    pub async fn forget_user(&self, phone_number: &str) -> Result<bool> {
        let subject_id = Self::subject_for(phone_number);
        let known = self.lookup(&subject_id).await?.is_some();
        self.users.write().await.remove(&subject_id);
        if let Some(kv) = &self.kv {
            kv.remove(&user_key(&subject_id)).await?;
        }
        Ok(known)
    }

    async fn lookup(&self, subject_id: &SubjectId) -> Result<Option<LocalUser>> {
        if let Some(user) = self.users.read().await.get(subject_id) {
            return Ok(Some(user.clone()));
        }
        let Some(kv) = &self.kv else {
            return Ok(None);
        };
        let Some(raw) = kv.get(&user_key(subject_id)).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<LocalUser>(&raw) {
            Ok(user) => {
                self.users
                    .write()
                    .await
                    .insert(subject_id.clone(), user.clone());
                Ok(Some(user))
            }
            Err(e) => {
                warn!(%subject_id, error = %e, "Ignoring undecodable local user");
                Ok(None)
            }
        }
    }

    async fn remember(&self, subject_id: &SubjectId, user: LocalUser) -> Result<()> {
        if let Some(kv) = &self.kv {
            let raw = serde_json::to_string(&user).map_err(SessionError::persistence)?;
            kv.set(&user_key(subject_id), &raw).await?;
        }
        self.users.write().await.insert(subject_id.clone(), user);
        Ok(())
    }

    fn issue_token(&self, identity: &Identity) -> Result<String> {
        self.jwt
            .create_token(&identity.subject_id, &identity.phone_number)
            .map_err(|e| SessionError::transient(format!("failed to sign token: {}", e)))
    }
}

fn user_key(subject_id: &SubjectId) -> String {
    format!("{}{}", USER_KEY_PREFIX, subject_id)
}

pub(crate) fn detail_from_registration(
    subject_id: &SubjectId,
    identity: &Identity,
    registration: &Registration,
) -> UserDetail {
    let address = &registration.address;
    UserDetail {
        user_id: Some(ApiId::Text(subject_id.to_string())),
        name: Some(registration.name.clone()),
        phone: Some(identity.phone_number.clone()),
        email: registration.email.clone(),
        gender: Some(registration.gender.clone()),
        age: Some(LooseNumber::Number(f64::from(registration.age))),
        address_line1: address.line1.clone(),
        address_line2: address.line2.clone(),
        city: address.city.clone(),
        district: address.district.clone(),
        state: address.state.clone(),
        country: address.country.clone(),
        pin: address.postal_code.clone(),
        latitude: Some(LooseNumber::Number(registration.location.latitude)),
        longitude: Some(LooseNumber::Number(registration.location.longitude)),
        is_phone_verified: Some(true),
        is_email_verified: Some(false),
        created_at: Some(Utc::now().to_rfc3339()),
    }
}

#[async_trait]
impl BaseOtpProvider for LocalProvider {
    async fn send_code(&self, phone_number: &str) -> Result<()> {
        debug!(%phone_number, "Local provider: code is fixed, nothing sent");
        Ok(())
    }

    async fn check_code(&self, phone_number: &str, code: &str) -> Result<Authenticated> {
        if code != LOCAL_OTP_CODE {
            return Err(SessionError::InvalidCode);
        }

        let subject_id = Self::subject_for(phone_number);
        let identity = Identity::new(subject_id.clone(), phone_number);

        match self.lookup(&subject_id).await? {
            Some((identity, detail)) => {
                let token = self.issue_token(&identity)?;
                let profile = profile_from_remote(&RemoteUser {
                    id: subject_id.to_string(),
                    detail,
                });
                Ok(Authenticated {
                    identity,
                    token: Some(token),
                    profile: Some(profile),
                })
            }
            None => Ok(Authenticated::new_user(identity)),
        }
    }
}

#[async_trait]
impl BaseProfileDirectory for LocalProvider {
    async fn fetch_current_user(&self, token: &str) -> Result<RemoteUser> {
        let claims = self.jwt.verify_token(token).map_err(|e| {
            debug!(error = %e, "Local token rejected");
            SessionError::SessionExpired
        })?;

        let subject_id = claims.subject_id();
        let (_, detail) = self
            .lookup(&subject_id)
            .await
            .map_err(SessionError::transient)?
            .ok_or(SessionError::SessionExpired)?;

        Ok(RemoteUser {
            id: subject_id.to_string(),
            detail,
        })
    }

    async fn register_user(
        &self,
        identity: &Identity,
        registration: &Registration,
    ) -> Result<Registered> {
        let subject_id = Self::subject_for(&identity.phone_number);
        let identity = Identity::new(subject_id.clone(), identity.phone_number.clone());
        let detail = detail_from_registration(&subject_id, &identity, registration);

        let token = self.issue_token(&identity)?;
        self.remember(&subject_id, (identity, detail.clone())).await?;
        info!(%subject_id, "Local user registered");

        Ok(Registered {
            token,
            user: RemoteUser {
                id: subject_id.to_string(),
                detail,
            },
        })
    }
}
