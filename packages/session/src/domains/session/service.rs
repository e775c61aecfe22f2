//! Session service - the capability object the UI shell holds.
//!
//! Owns the in-memory session and is the only place that moves it between
//! router states. Every intent (sign in, confirm, register, refresh, sign
//! out) goes through here; nothing else writes the session store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use super::router::{route, RouteState, SessionEvent};
use super::store::SessionStore;
use crate::domains::auth::{Challenge, OtpAuthenticator};
use crate::domains::profile::{
    merge_profiles, profile_from_remote, Identity, Profile, ProfileResolver, RegistrationForm,
};
use crate::error::{Result, SessionError};
use crate::kernel::{BaseLocationProvider, BaseProfileDirectory};

type RefreshFuture = Shared<BoxFuture<'static, Result<Profile>>>;

/// Read-only view of the session for the UI shell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    pub profile: Option<Profile>,
    pub has_token: bool,
    pub loading: bool,
    pub state: RouteState,
}

#[derive(Debug, Clone)]
struct LiveSession {
    identity: Option<Identity>,
    profile: Option<Profile>,
    token: Option<String>,
    route: RouteState,
}

impl Default for LiveSession {
    fn default() -> Self {
        Self {
            identity: None,
            profile: None,
            token: None,
            route: RouteState::Unauthenticated,
        }
    }
}

impl LiveSession {
    fn advance(&mut self, event: SessionEvent) -> Result<RouteState> {
        self.route = self.route.next(event).map_err(|e| {
            error!(error = %e, "Rejected session transition");
            SessionError::validation(e.to_string())
        })?;
        Ok(self.route)
    }
}

pub struct SessionService {
    store: SessionStore,
    authenticator: OtpAuthenticator,
    directory: Arc<dyn BaseProfileDirectory>,
    resolver: ProfileResolver,
    session: RwLock<LiveSession>,
    /// Serializes the state-changing intents; refresh stays outside so
    /// concurrent refreshes can coalesce
    intents: Mutex<()>,
    inflight: Mutex<HashMap<String, (u64, RefreshFuture)>>,
    generation: AtomicU64,
}

impl SessionService {
    pub fn new(
        store: SessionStore,
        authenticator: OtpAuthenticator,
        directory: Arc<dyn BaseProfileDirectory>,
    ) -> Self {
        let resolver = ProfileResolver::new(directory.clone());
        Self {
            store,
            authenticator,
            directory,
            resolver,
            session: RwLock::new(LiveSession::default()),
            intents: Mutex::new(()),
            inflight: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Override the profile fetch timeout (15 seconds by default)
    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolver = self.resolver.with_timeout(timeout);
        self
    }

    pub fn authenticator(&self) -> &OtpAuthenticator {
        &self.authenticator
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.session.read().await;
        SessionSnapshot {
            identity: session.identity.clone(),
            profile: session.profile.clone(),
            has_token: session.token.is_some(),
            loading: session.route == RouteState::Resolving,
            state: session.route,
        }
    }

    pub async fn state(&self) -> RouteState {
        self.session.read().await.route
    }

    /// Startup resolution.
    ///
    /// Without a cached token the session starts signed out. With one, the
    /// token is validated before the cached profile is trusted; when the
    /// directory cannot be reached the cached profile is used as-is.
    #[instrument(skip_all)]
    pub async fn start(&self) -> Result<RouteState> {
        let _guard = self.intents.lock().await;

        let stored = match self.store.load().await {
            Ok(stored) => stored,
            Err(e) => return Err(self.fail_safe(e).await),
        };

        let (identity, token) = match (stored.identity, stored.token) {
            (Some(identity), Some(token)) => (identity, token),
            (identity, token) => {
                let residual = identity.is_some() || token.is_some() || stored.profile.is_some();
                *self.session.write().await = LiveSession::default();
                if residual {
                    // Identity and token are only valid as a pair
                    warn!(
                        has_identity = identity.is_some(),
                        has_token = token.is_some(),
                        "Discarding partial session"
                    );
                    self.store.clear().await?;
                }
                info!("No session on device");
                return Ok(RouteState::Unauthenticated);
            }
        };

        {
            let mut session = self.session.write().await;
            *session = LiveSession {
                identity: Some(identity),
                profile: stored.profile,
                token: Some(token.clone()),
                route: RouteState::Unauthenticated,
            };
            session.advance(SessionEvent::Startup { has_token: true })?;
        }

        match self.resolve(&token).await {
            Ok(_) => Ok(self.state().await),
            Err(SessionError::Transient(reason)) => {
                let state = self.state().await;
                warn!(%reason, %state, "Directory unreachable, continuing offline");
                Ok(state)
            }
            Err(e) => Err(e),
        }
    }

    /// Request a code for `phone_number`.
    #[instrument(skip_all)]
    pub async fn sign_in(&self, phone_number: &str) -> Result<Challenge> {
        if self.state().await.is_authenticated() {
            return Err(SessionError::validation(
                "Already signed in. Please log out first.",
            ));
        }
        self.authenticator.request_otp(phone_number).await
    }

    /// Verify `code`, persist the new session and enter it.
    #[instrument(skip_all, fields(challenge_id = %challenge.id()))]
    pub async fn confirm_otp(&self, challenge: &Challenge, code: &str) -> Result<RouteState> {
        let _guard = self.intents.lock().await;

        let current = self.state().await;
        if current != RouteState::Unauthenticated {
            return Err(SessionError::validation(format!(
                "Cannot verify a code while {}",
                current
            )));
        }

        let authenticated = self.authenticator.verify_otp(challenge, code).await?;
        let identity = authenticated.identity;
        let profile = authenticated
            .profile
            .unwrap_or_else(|| Profile::incomplete(identity.subject_id.clone()));
        let token = authenticated.token;

        let persisted = async {
            self.store.clear().await?;
            self.store
                .save(Some(&identity), Some(&profile), token.as_deref())
                .await
        }
        .await;
        if let Err(e) = persisted {
            return Err(self.fail_safe(e).await);
        }

        let mut session = self.session.write().await;
        let registration_complete = profile.registration_complete;
        *session = LiveSession {
            identity: Some(identity),
            profile: Some(profile),
            token,
            route: RouteState::Unauthenticated,
        };
        let state = session.advance(SessionEvent::OtpVerified {
            registration_complete,
        })?;
        info!(%state, "Signed in");
        Ok(state)
    }

    /// Submit the registration form for the signed-in identity.
    ///
    /// The form is validated and a location captured before anything is
    /// sent, so a rejected form never reaches the directory.
    #[instrument(skip_all)]
    pub async fn register(
        &self,
        form: &RegistrationForm,
        location: &dyn BaseLocationProvider,
    ) -> Result<Profile> {
        let _guard = self.intents.lock().await;

        let (identity, state) = {
            let session = self.session.read().await;
            (session.identity.clone(), session.route)
        };
        let identity = identity.ok_or(SessionError::NotAuthenticated)?;
        if state != RouteState::AuthenticatedIncomplete {
            return Err(SessionError::validation("Registration is already complete"));
        }

        let validated = form.validate()?;
        let position = location.current_position().await?;
        let registration = validated.with_location(position);

        let registered = self
            .directory
            .register_user(&identity, &registration)
            .await?;
        let profile = merge_profiles(
            profile_from_remote(&registered.user),
            &registration.to_profile(&identity),
        );

        if let Err(e) = self
            .store
            .save(None, Some(&profile), Some(&registered.token))
            .await
        {
            return Err(self.fail_safe(e).await);
        }

        {
            let mut session = self.session.write().await;
            session.profile = Some(profile.clone());
            session.token = Some(registered.token.clone());
            session.advance(SessionEvent::RegistrationAccepted)?;
        }
        info!(subject_id = %identity.subject_id, "Registration accepted");

        // The new token is validated right away; an unreachable directory
        // leaves the submitted profile in place
        match self.resolve(&registered.token).await {
            Ok(refreshed) => Ok(refreshed),
            Err(SessionError::Transient(reason)) => {
                warn!(%reason, "Post-registration refresh failed");
                Ok(profile)
            }
            Err(e) => Err(e),
        }
    }

    /// Re-validate the current token and pull the latest profile.
    #[instrument(skip_all)]
    pub async fn refresh(&self) -> Result<Profile> {
        let token = self
            .session
            .read()
            .await
            .token
            .clone()
            .ok_or(SessionError::NotAuthenticated)?;
        self.resolve(&token).await
    }

    /// End the session. Memory is reset even when the store cannot be
    /// fully cleared.
    #[instrument(skip_all)]
    pub async fn sign_out(&self) -> Result<()> {
        let _guard = self.intents.lock().await;
        {
            let mut session = self.session.write().await;
            session.advance(SessionEvent::Ended)?;
            *session = LiveSession::default();
        }
        self.store.clear().await?;
        info!("Signed out");
        Ok(())
    }

    /// Validate `token`, sharing the result with any call already in
    /// flight for the same token, then apply it to the live session.
    async fn resolve(&self, token: &str) -> Result<Profile> {
        let (generation, future) = {
            let mut inflight = self.inflight.lock().await;
            match inflight.get(token) {
                Some((generation, future)) => {
                    debug!("Joining in-flight profile refresh");
                    (*generation, future.clone())
                }
                None => {
                    let resolver = self.resolver.clone();
                    let owned = token.to_string();
                    let future = async move { resolver.validate_and_refresh(&owned).await }
                        .boxed()
                        .shared();
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                    inflight.insert(token.to_string(), (generation, future.clone()));
                    (generation, future)
                }
            }
        };

        let result = future.await;

        {
            let mut inflight = self.inflight.lock().await;
            if inflight
                .get(token)
                .is_some_and(|(current, _)| *current == generation)
            {
                inflight.remove(token);
            }
        }

        self.apply_resolution(token, result).await
    }

    /// Apply a refresh outcome to memory and the store, unless the session
    /// it was fetched for has since ended or moved to another token.
    async fn apply_resolution(&self, token: &str, result: Result<Profile>) -> Result<Profile> {
        let mut session = self.session.write().await;
        if session.token.as_deref() != Some(token) {
            debug!("Session changed during refresh, discarding result");
            return result;
        }

        match &result {
            Ok(profile) => {
                if let Err(e) = self.store.save(None, Some(profile), None).await {
                    return Err(self.reset_after_failure(&mut session, e).await);
                }
                session.profile = Some(profile.clone());
                session.advance(SessionEvent::ResolveSucceeded {
                    registration_complete: profile.registration_complete,
                })?;
                info!(subject_id = %profile.subject_id, "Profile refreshed from directory");
            }
            Err(SessionError::SessionExpired) => {
                *session = LiveSession::default();
                if let Err(e) = self.store.clear().await {
                    error!(error = %e, "Failed to fully clear expired session");
                }
                info!("Session expired");
            }
            Err(SessionError::Transient(_)) => {
                let cached = route(session.identity.as_ref(), session.profile.as_ref(), false);
                session.advance(SessionEvent::ResolveFailedOffline { cached })?;
            }
            Err(e) => {
                return Err(self.reset_after_failure(&mut session, e.clone()).await);
            }
        }
        result
    }

    /// Reset to an empty session after a storage failure.
    async fn fail_safe(&self, err: SessionError) -> SessionError {
        let mut session = self.session.write().await;
        self.reset_after_failure(&mut session, err).await
    }

    async fn reset_after_failure(&self, session: &mut LiveSession, err: SessionError) -> SessionError {
        error!(error = %err, "Session storage failed, resetting session");
        *session = LiveSession::default();
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "Could not clear session store after failure");
        }
        err
    }
}
