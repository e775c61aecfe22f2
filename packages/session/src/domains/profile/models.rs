use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_api::UserDetail;

use crate::error::{Result, SessionError};

/// Opaque subject reference issued by whichever provider authenticated the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authenticated subject. Created on OTP confirmation, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub subject_id: SubjectId,
    pub phone_number: String,
}

impl Identity {
    pub fn new(subject_id: SubjectId, phone_number: impl Into<String>) -> Self {
        Self {
            subject_id,
            phone_number: phone_number.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

impl Address {
    /// Non-empty parts joined with `", "` in postal order.
    pub fn joined(&self) -> Option<String> {
        let parts: Vec<&str> = [
            &self.line1,
            &self.line2,
            &self.city,
            &self.district,
            &self.state,
            &self.country,
            &self.postal_code,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .filter(|part| !part.is_empty())
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Device coordinates captured at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(SessionError::LocationUnavailable(format!(
                "latitude {} out of range",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(SessionError::LocationUnavailable(format!(
                "longitude {} out of range",
                longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// User-supplied and server-enriched attributes.
///
/// `registration_complete` gates the whole session: it flips to true when the
/// registration form is accepted and only goes back to false through a full
/// sign-out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub subject_id: SubjectId,
    pub name: Option<String>,
    pub email: Option<String>,
    pub gender: Option<String>,
    pub age: Option<u32>,
    #[serde(default)]
    pub address: Address,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub registration_complete: bool,
    pub phone_verified: Option<bool>,
    pub email_verified: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Empty profile for a freshly authenticated subject.
    pub fn incomplete(subject_id: SubjectId) -> Self {
        Self {
            subject_id,
            ..Default::default()
        }
    }

    pub fn location(&self) -> Option<Location> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Location {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

/// A user record as the profile directory returns it, before translation
/// into the canonical [`Profile`].
#[derive(Debug, Clone, Default)]
pub struct RemoteUser {
    pub id: String,
    pub detail: UserDetail,
}

/// Directory answer to a successful registration.
#[derive(Debug, Clone)]
pub struct Registered {
    pub token: String,
    pub user: RemoteUser,
}
