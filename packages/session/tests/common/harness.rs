//! Test harness wiring a `SessionService` to mock dependencies.
//!
//! The key-value store outlives any one service, so building a second
//! service over the same harness behaves like restarting the app.

use std::sync::Arc;
use std::time::Duration;

use session_core::domains::profile::{Identity, Profile};
use session_core::domains::session::{SessionStore, StoredSession};
use session_core::kernel::test_dependencies::MockBackend;
use session_core::kernel::BaseKeyValueStore;
use session_core::stores::MemoryKeyValueStore;
use session_core::{SessionDeps, SessionService};

pub const DEFAULT_COUNTRY_CODE: &str = "+91";

pub struct TestHarness {
    pub backend: Arc<MockBackend>,
    pub kv: Arc<dyn BaseKeyValueStore>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_backend(MockBackend::new())
    }

    pub fn with_backend(backend: MockBackend) -> Self {
        Self::with_store(backend, Arc::new(MemoryKeyValueStore::new()))
    }

    pub fn with_store(backend: MockBackend, kv: Arc<dyn BaseKeyValueStore>) -> Self {
        Self {
            backend: Arc::new(backend),
            kv,
        }
    }

    /// A fresh service over the shared store and backend
    pub fn service(&self) -> SessionService {
        self.service_with_timeout(Duration::from_secs(15))
    }

    pub fn service_with_timeout(&self, timeout: Duration) -> SessionService {
        SessionDeps::new(
            self.backend.clone(),
            self.backend.clone(),
            self.kv.clone(),
            DEFAULT_COUNTRY_CODE,
            timeout,
        )
        .into_service()
    }

    pub fn store(&self) -> SessionStore {
        SessionStore::new(self.kv.clone())
    }

    pub async fn stored(&self) -> StoredSession {
        self.store().load().await.expect("session store readable")
    }

    /// Persist a session as a previous run would have left it
    pub async fn persist(&self, identity: &Identity, profile: &Profile, token: &str) {
        self.store()
            .save(Some(identity), Some(profile), Some(token))
            .await
            .expect("session store writable");
    }
}
