// Mock implementations for testing
//
// Stand-ins for every kernel seam so SessionService can be exercised
// without a network, a device or a database.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use storefront_api::UserDetail;

use super::{BaseKeyValueStore, BaseLocationProvider, BaseOtpProvider, BaseProfileDirectory};
use crate::domains::auth::providers::local::detail_from_registration;
use crate::domains::auth::Authenticated;
use crate::domains::profile::{
    profile_from_remote, Identity, Location, Registered, Registration, RemoteUser, SubjectId,
};
use crate::error::{Result, SessionError};
use crate::stores::MemoryKeyValueStore;

// =============================================================================
// Mock Backend (OTP provider + profile directory)
// =============================================================================

/// Code the mock backend accepts unless configured otherwise
pub const MOCK_OTP_CODE: &str = "112233";

#[derive(Debug, Clone)]
struct MockUser {
    identity: Identity,
    detail: UserDetail,
}

/// In-process stand-in for the storefront backend.
///
/// Records every call, can be switched offline or made to reject all tokens
/// at runtime, and can delay profile fetches to exercise timeouts and
/// coalescing.
pub struct MockBackend {
    accepted_code: String,
    fetch_delay: Mutex<Option<Duration>>,
    offline: AtomicBool,
    tokens_expired: AtomicBool,
    users: Mutex<HashMap<String, MockUser>>,
    tokens: Mutex<HashMap<String, String>>,
    next_token: AtomicUsize,
    send_calls: Mutex<Vec<String>>,
    check_calls: Mutex<Vec<String>>,
    fetch_calls: AtomicUsize,
    register_calls: AtomicUsize,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            accepted_code: MOCK_OTP_CODE.to_string(),
            fetch_delay: Mutex::new(None),
            offline: AtomicBool::new(false),
            tokens_expired: AtomicBool::new(false),
            users: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
            next_token: AtomicUsize::new(1),
            send_calls: Mutex::new(Vec::new()),
            check_calls: Mutex::new(Vec::new()),
            fetch_calls: AtomicUsize::new(0),
            register_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.accepted_code = code.to_string();
        self
    }

    /// Delay every profile fetch by `delay`
    pub fn with_fetch_delay(self, delay: Duration) -> Self {
        *self.fetch_delay.lock().unwrap() = Some(delay);
        self
    }

    /// Pre-register a user so the next verification recognises it
    pub fn with_registered_user(self, phone_number: &str, detail: UserDetail) -> Self {
        let identity = Identity::new(Self::subject_for(phone_number), phone_number);
        self.users.lock().unwrap().insert(
            phone_number.to_string(),
            MockUser { identity, detail },
        );
        self
    }

    pub fn subject_for(phone_number: &str) -> SubjectId {
        SubjectId::new(format!("mock_{}", phone_number.trim_start_matches('+')))
    }

    /// Every call fails as if the network were down
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Every token is rejected as if revoked server-side
    pub fn expire_tokens(&self) {
        self.tokens_expired.store(true, Ordering::SeqCst);
    }

    /// Mint a token for `phone_number` as a previous sign-in would have
    pub fn issue_token(&self, phone_number: &str) -> String {
        let n = self.next_token.fetch_add(1, Ordering::SeqCst);
        let token = format!("mock-token-{}", n);
        self.tokens
            .lock()
            .unwrap()
            .insert(token.clone(), phone_number.to_string());
        token
    }

    /// Phone numbers a code was sent to
    pub fn send_calls(&self) -> Vec<String> {
        self.send_calls.lock().unwrap().clone()
    }

    /// Codes that were checked
    pub fn check_calls(&self) -> Vec<String> {
        self.check_calls.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn register_count(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    /// Total calls that reached the network
    pub fn network_calls(&self) -> usize {
        self.send_calls().len() + self.check_calls().len() + self.fetch_count() + self.register_count()
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SessionError::transient("mock backend offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl BaseOtpProvider for MockBackend {
    async fn send_code(&self, phone_number: &str) -> Result<()> {
        self.send_calls.lock().unwrap().push(phone_number.to_string());
        self.ensure_online()
    }

    async fn check_code(&self, phone_number: &str, code: &str) -> Result<Authenticated> {
        self.check_calls.lock().unwrap().push(code.to_string());
        self.ensure_online()?;

        if code != self.accepted_code {
            return Err(SessionError::InvalidCode);
        }

        let known = self.users.lock().unwrap().get(phone_number).cloned();
        match known {
            Some(user) => {
                let token = self.issue_token(phone_number);
                let profile = profile_from_remote(&RemoteUser {
                    id: user.identity.subject_id.to_string(),
                    detail: user.detail,
                });
                Ok(Authenticated {
                    identity: user.identity,
                    token: Some(token),
                    profile: Some(profile),
                })
            }
            None => Ok(Authenticated::new_user(Identity::new(
                Self::subject_for(phone_number),
                phone_number,
            ))),
        }
    }
}

#[async_trait]
impl BaseProfileDirectory for MockBackend {
    async fn fetch_current_user(&self, token: &str) -> Result<RemoteUser> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.ensure_online()?;

        if self.tokens_expired.load(Ordering::SeqCst) {
            return Err(SessionError::SessionExpired);
        }

        let phone_number = self
            .tokens
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or(SessionError::SessionExpired)?;
        let user = self
            .users
            .lock()
            .unwrap()
            .get(&phone_number)
            .cloned()
            .ok_or(SessionError::SessionExpired)?;

        Ok(RemoteUser {
            id: user.identity.subject_id.to_string(),
            detail: user.detail,
        })
    }

    async fn register_user(
        &self,
        identity: &Identity,
        registration: &Registration,
    ) -> Result<Registered> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;

        let detail = detail_from_registration(&identity.subject_id, identity, registration);
        self.users.lock().unwrap().insert(
            identity.phone_number.clone(),
            MockUser {
                identity: identity.clone(),
                detail: detail.clone(),
            },
        );
        let token = self.issue_token(&identity.phone_number);

        Ok(Registered {
            token,
            user: RemoteUser {
                id: identity.subject_id.to_string(),
                detail,
            },
        })
    }
}

// =============================================================================
// Mock Location Provider
// =============================================================================

pub struct MockLocationProvider {
    location: Option<Location>,
    calls: AtomicUsize,
}

impl MockLocationProvider {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            location: Some(Location {
                latitude,
                longitude,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    /// Behaves like a denied location permission
    pub fn denied() -> Self {
        Self {
            location: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BaseLocationProvider for MockLocationProvider {
    async fn current_position(&self) -> Result<Location> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.location.ok_or_else(|| {
            SessionError::LocationUnavailable("location permission denied".to_string())
        })
    }
}

// =============================================================================
// Failing Key-Value Store
// =============================================================================

/// Memory-backed store whose writes or removals can be made to fail per key,
/// either up front or partway through a test.
#[derive(Default)]
pub struct FailingKeyValueStore {
    inner: MemoryKeyValueStore,
    failing_removes: Mutex<HashSet<String>>,
    failing_sets: Mutex<HashSet<String>>,
    removed: Mutex<Vec<String>>,
}

impl FailingKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_remove_of(self, key: &str) -> Self {
        self.break_remove_of(key);
        self
    }

    pub fn fail_set_of(self, key: &str) -> Self {
        self.failing_sets.lock().unwrap().insert(key.to_string());
        self
    }

    /// Start failing removals of `key` from now on
    pub fn break_remove_of(&self, key: &str) {
        self.failing_removes.lock().unwrap().insert(key.to_string());
    }

    /// Keys that were successfully removed, in order
    pub fn removed_keys(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseKeyValueStore for FailingKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.failing_sets.lock().unwrap().contains(key) {
            return Err(SessionError::persistence(format!("write of {} failed", key)));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if self.failing_removes.lock().unwrap().contains(key) {
            return Err(SessionError::persistence(format!("removal of {} failed", key)));
        }
        self.inner.remove(key).await?;
        self.removed.lock().unwrap().push(key.to_string());
        Ok(())
    }
}
