// Trait definitions for dependency injection
//
// These are the seams where implementations are swapped at composition
// time. Call sites never branch on which backend is behind them.
//
// Naming convention: Base* for trait names (e.g., BaseOtpProvider)

use async_trait::async_trait;

use crate::domains::auth::Authenticated;
use crate::domains::profile::{Identity, Location, Registered, Registration, RemoteUser};
use crate::error::Result;

// =============================================================================
// OTP Provider Trait (Infrastructure - SMS/OTP)
// =============================================================================

/// Delivers and checks one-time codes. Single-use bookkeeping lives in
/// `OtpAuthenticator`, not here.
#[async_trait]
pub trait BaseOtpProvider: Send + Sync {
    /// Dispatch a code to an already-normalized phone number
    async fn send_code(&self, phone_number: &str) -> Result<()>;

    /// Check `code` for `phone_number`.
    ///
    /// Wrong codes fail with `SessionError::InvalidCode`; unreachable
    /// providers with `SessionError::Transient`.
    async fn check_code(&self, phone_number: &str, code: &str) -> Result<Authenticated>;
}

// =============================================================================
// Profile Directory Trait (Infrastructure - remote profile source)
// =============================================================================

#[async_trait]
pub trait BaseProfileDirectory: Send + Sync {
    /// "Who am I" for a bearer token.
    ///
    /// A rejected token fails with `SessionError::SessionExpired`; every
    /// other failure with `SessionError::Transient`.
    async fn fetch_current_user(&self, token: &str) -> Result<RemoteUser>;

    /// Submit a validated registration, returning the new bearer token
    async fn register_user(
        &self,
        identity: &Identity,
        registration: &Registration,
    ) -> Result<Registered>;
}

// =============================================================================
// Key-Value Store Trait (Infrastructure - local persistence)
// =============================================================================

/// String-keyed durable storage backing the session store.
#[async_trait]
pub trait BaseKeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key succeeds
    async fn remove(&self, key: &str) -> Result<()>;
}

// =============================================================================
// Location Provider Trait (Infrastructure - device location)
// =============================================================================

#[async_trait]
pub trait BaseLocationProvider: Send + Sync {
    /// One-shot position fix; fails with `SessionError::LocationUnavailable`
    async fn current_position(&self) -> Result<Location>;
}
