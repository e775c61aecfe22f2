//! Profile domain - canonical user profile, registration, and remote
//! reconciliation.

pub mod location;
pub mod models;
pub mod registration;
pub mod resolver;
pub mod summary;

pub use location::FixedLocationProvider;
pub use models::{Address, Identity, Location, Profile, Registered, RemoteUser, SubjectId};
pub use registration::{Registration, RegistrationForm, ValidatedForm};
pub use resolver::{merge_profiles, profile_from_remote, ProfileResolver, PROFILE_FETCH_TIMEOUT};
pub use summary::ProfileSummary;
