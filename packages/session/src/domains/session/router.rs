//! Session router - the four-state session machine and its screen mapping.
//!
//! `route` is the pure read side: given what is currently known, which state
//! is the session in. `RouteState::next` is the write side: the only legal
//! transitions, driven by `SessionEvent`s emitted by `SessionService`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domains::profile::{Identity, Profile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteState {
    /// A cached token is being validated at startup
    Resolving,
    Unauthenticated,
    /// Identity present, registration form not yet accepted
    AuthenticatedIncomplete,
    AuthenticatedComplete,
}

/// Screen the UI shell should show for a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Screen {
    Splash,
    Login,
    Register,
    Dashboard,
}

/// Inputs that move the session between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Process start, after the store was loaded
    Startup { has_token: bool },
    OtpVerified { registration_complete: bool },
    RegistrationAccepted,
    ResolveSucceeded { registration_complete: bool },
    /// Validation failed transiently; continue with what the cache says
    ResolveFailedOffline { cached: RouteState },
    /// Sign-out, 401 or a cleared store
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid session transition from {from} on {event:?}")]
pub struct InvalidTransition {
    pub from: RouteState,
    pub event: SessionEvent,
}

fn authenticated(registration_complete: bool) -> RouteState {
    if registration_complete {
        RouteState::AuthenticatedComplete
    } else {
        RouteState::AuthenticatedIncomplete
    }
}

impl RouteState {
    pub fn screen(self) -> Screen {
        match self {
            RouteState::Resolving => Screen::Splash,
            RouteState::Unauthenticated => Screen::Login,
            RouteState::AuthenticatedIncomplete => Screen::Register,
            RouteState::AuthenticatedComplete => Screen::Dashboard,
        }
    }

    pub fn is_authenticated(self) -> bool {
        matches!(
            self,
            RouteState::AuthenticatedIncomplete | RouteState::AuthenticatedComplete
        )
    }

    /// Apply `event`, rejecting transitions the machine does not have.
    pub fn next(self, event: SessionEvent) -> Result<RouteState, InvalidTransition> {
        use RouteState::*;
        use SessionEvent::*;

        let next = match (self, event) {
            (_, Ended) => Unauthenticated,

            (Resolving | Unauthenticated, Startup { has_token: true }) => Resolving,
            (Resolving | Unauthenticated, Startup { has_token: false }) => Unauthenticated,

            (
                Unauthenticated,
                OtpVerified {
                    registration_complete,
                },
            ) => authenticated(registration_complete),

            (AuthenticatedIncomplete, RegistrationAccepted) => AuthenticatedComplete,

            (
                Resolving | AuthenticatedIncomplete | AuthenticatedComplete,
                ResolveSucceeded {
                    registration_complete,
                },
            ) => authenticated(registration_complete),

            (Resolving, ResolveFailedOffline { cached }) if cached != Resolving => cached,
            // A failed manual refresh keeps the current state
            (
                state @ (AuthenticatedIncomplete | AuthenticatedComplete),
                ResolveFailedOffline { .. },
            ) => state,

            (from, event) => return Err(InvalidTransition { from, event }),
        };
        Ok(next)
    }
}

impl fmt::Display for RouteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RouteState::Resolving => "resolving",
            RouteState::Unauthenticated => "unauthenticated",
            RouteState::AuthenticatedIncomplete => "authenticated (registration pending)",
            RouteState::AuthenticatedComplete => "authenticated",
        };
        f.write_str(name)
    }
}

/// Map what is currently known about the session to its state.
pub fn route(identity: Option<&Identity>, profile: Option<&Profile>, loading: bool) -> RouteState {
    if loading {
        return RouteState::Resolving;
    }
    match identity {
        None => RouteState::Unauthenticated,
        Some(_) => authenticated(profile.is_some_and(|p| p.registration_complete)),
    }
}
