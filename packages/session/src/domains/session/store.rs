//! Local session store.
//!
//! The only writer of the device key-value store. Identity, profile and token
//! live under independent keys so each can be updated without rewriting the
//! others.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::domains::profile::{Identity, Profile};
use crate::error::{Result, SessionError};
use crate::kernel::BaseKeyValueStore;

pub const IDENTITY_KEY: &str = "user";
pub const PROFILE_KEY: &str = "userData";
pub const TOKEN_KEY: &str = "authToken";

/// What `SessionStore::load` found on the device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredSession {
    pub identity: Option<Identity>,
    pub profile: Option<Profile>,
    pub token: Option<String>,
}

impl StoredSession {
    pub fn is_empty(&self) -> bool {
        self.identity.is_none() && self.profile.is_none() && self.token.is_none()
    }
}

#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn BaseKeyValueStore>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn BaseKeyValueStore>) -> Self {
        Self { kv }
    }

    /// Read the persisted session. Missing keys are an empty session, not an
    /// error; so are values that no longer decode.
    pub async fn load(&self) -> Result<StoredSession> {
        let identity = self.read_json::<Identity>(IDENTITY_KEY).await?;
        let profile = self.read_json::<Profile>(PROFILE_KEY).await?;
        let token = self
            .kv
            .get(TOKEN_KEY)
            .await?
            .filter(|token| !token.is_empty());

        debug!(
            has_identity = identity.is_some(),
            has_profile = profile.is_some(),
            has_token = token.is_some(),
            "Loaded session"
        );
        Ok(StoredSession {
            identity,
            profile,
            token,
        })
    }

    /// Partial update: only the fields passed as `Some` are written.
    pub async fn save(
        &self,
        identity: Option<&Identity>,
        profile: Option<&Profile>,
        token: Option<&str>,
    ) -> Result<()> {
        if let Some(identity) = identity {
            self.write_json(IDENTITY_KEY, identity).await?;
        }
        if let Some(profile) = profile {
            self.write_json(PROFILE_KEY, profile).await?;
        }
        if let Some(token) = token {
            self.kv.set(TOKEN_KEY, token).await?;
        }
        Ok(())
    }

    /// Remove all three keys. Every removal is attempted even if an earlier
    /// one fails; any failure is reported as a persistence error.
    pub async fn clear(&self) -> Result<()> {
        let mut failures = Vec::new();
        for key in [IDENTITY_KEY, PROFILE_KEY, TOKEN_KEY] {
            if let Err(e) = self.kv.remove(key).await {
                error!(key, error = %e, "Failed to remove session key");
                failures.push(format!("{}: {}", key, e));
            }
        }

        if failures.is_empty() {
            debug!("Session cleared");
            Ok(())
        } else {
            Err(SessionError::persistence(failures.join("; ")))
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.kv.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "Ignoring undecodable session value");
                Ok(None)
            }
        }
    }

    async fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value).map_err(SessionError::persistence)?;
        self.kv.set(key, &raw).await
    }
}
