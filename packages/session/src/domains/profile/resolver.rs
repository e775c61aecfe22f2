//! Profile resolver: validates a bearer token against the directory and
//! translates the remote user into the canonical profile.
//!
//! Outcomes:
//! - token accepted: the remote profile
//! - directory says the token is rejected: `SessionExpired`
//! - anything else (timeout, 5xx, unreachable): `Transient`
//!
//! The resolver never touches the session store. The session service
//! persists an outcome only while the token it was fetched for is still the
//! live one.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use storefront_api::UserDetail;
use tracing::{debug, instrument, warn};

use super::models::{Address, Profile, RemoteUser, SubjectId};
use crate::error::{Result, SessionError};
use crate::kernel::BaseProfileDirectory;

pub const PROFILE_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct ProfileResolver {
    directory: Arc<dyn BaseProfileDirectory>,
    timeout: Duration,
}

impl ProfileResolver {
    pub fn new(directory: Arc<dyn BaseProfileDirectory>) -> Self {
        Self {
            directory,
            timeout: PROFILE_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch the profile behind `token`.
    #[instrument(skip_all)]
    pub async fn validate_and_refresh(&self, token: &str) -> Result<Profile> {
        let fetched =
            match tokio::time::timeout(self.timeout, self.directory.fetch_current_user(token))
                .await
            {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout_secs = self.timeout.as_secs_f64(), "Profile fetch timed out");
                    return Err(SessionError::transient("profile fetch timed out"));
                }
            };

        match fetched {
            Ok(remote) => {
                let profile = profile_from_remote(&remote);
                debug!(subject_id = %profile.subject_id, "Profile fetched from directory");
                Ok(profile)
            }
            Err(SessionError::SessionExpired) => {
                warn!("Token rejected by directory");
                Err(SessionError::SessionExpired)
            }
            Err(SessionError::Transient(reason)) => {
                warn!(%reason, "Profile fetch failed");
                Err(SessionError::Transient(reason))
            }
            Err(other) => {
                warn!(error = %other, "Profile fetch failed");
                Err(SessionError::transient(other))
            }
        }
    }
}

/// Translate a directory record into the canonical profile.
///
/// Anything the directory knows about is a registered user, so the result is
/// always `registration_complete`.
pub fn profile_from_remote(remote: &RemoteUser) -> Profile {
    let detail: &UserDetail = &remote.detail;
    Profile {
        subject_id: SubjectId::new(remote.id.clone()),
        name: clean(&detail.name),
        email: clean(&detail.email),
        gender: clean(&detail.gender),
        age: detail.age.as_ref().and_then(|age| age.as_u32()),
        address: Address {
            line1: clean(&detail.address_line1),
            line2: clean(&detail.address_line2),
            city: clean(&detail.city),
            district: clean(&detail.district),
            state: clean(&detail.state),
            country: clean(&detail.country),
            postal_code: clean(&detail.pin),
        },
        latitude: detail.latitude.as_ref().and_then(|lat| lat.as_f64()),
        longitude: detail.longitude.as_ref().and_then(|lng| lng.as_f64()),
        registration_complete: true,
        phone_verified: detail.is_phone_verified,
        email_verified: detail.is_email_verified,
        created_at: detail.created_at.as_deref().and_then(parse_timestamp),
    }
}

/// Fill every field `primary` lacks from `fallback`.
pub fn merge_profiles(primary: Profile, fallback: &Profile) -> Profile {
    fn or<T: Clone>(value: Option<T>, fallback: &Option<T>) -> Option<T> {
        value.or_else(|| fallback.clone())
    }

    let address = Address {
        line1: or(primary.address.line1, &fallback.address.line1),
        line2: or(primary.address.line2, &fallback.address.line2),
        city: or(primary.address.city, &fallback.address.city),
        district: or(primary.address.district, &fallback.address.district),
        state: or(primary.address.state, &fallback.address.state),
        country: or(primary.address.country, &fallback.address.country),
        postal_code: or(primary.address.postal_code, &fallback.address.postal_code),
    };

    Profile {
        subject_id: primary.subject_id,
        name: or(primary.name, &fallback.name),
        email: or(primary.email, &fallback.email),
        gender: or(primary.gender, &fallback.gender),
        age: or(primary.age, &fallback.age),
        address,
        latitude: or(primary.latitude, &fallback.latitude),
        longitude: or(primary.longitude, &fallback.longitude),
        registration_complete: primary.registration_complete || fallback.registration_complete,
        phone_verified: or(primary.phone_verified, &fallback.phone_verified),
        email_verified: or(primary.email_verified, &fallback.email_verified),
        created_at: or(primary.created_at, &fallback.created_at),
    }
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
