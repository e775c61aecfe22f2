//! Session domain - persisted session, router state machine, and the
//! service that drives it.

pub mod router;
pub mod service;
pub mod store;

pub use router::{route, InvalidTransition, RouteState, Screen, SessionEvent};
pub use service::{SessionService, SessionSnapshot};
pub use store::{SessionStore, StoredSession, IDENTITY_KEY, PROFILE_KEY, TOKEN_KEY};
