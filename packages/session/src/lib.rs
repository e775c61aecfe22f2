// Storefront session core
//
// Phone-OTP authentication, registration and session routing for the
// storefront client. The UI shell holds a `SessionService` and renders
// whatever `RouteState` it reports; every network and storage call sits
// behind a trait in `kernel` so providers are chosen at composition time.

pub mod common;
pub mod config;
pub mod domains;
pub mod error;
pub mod kernel;
pub mod stores;

pub use config::*;
pub use domains::session::{RouteState, Screen, SessionService, SessionSnapshot};
pub use error::{Result, SessionError};
pub use kernel::SessionDeps;
