//! Registration form and client-side validation.
//!
//! Validation runs before anything leaves the device: a form that fails here
//! never reaches the location provider or the backend.

use serde::{Deserialize, Serialize};
use storefront_api::RegisterUserRequest;

use super::models::{Address, Identity, Location, Profile};
use crate::error::{Result, SessionError};

/// Raw form input as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub gender: String,
    pub age: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub district: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
}

/// A form whose fields passed validation, awaiting a captured location.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedForm {
    name: String,
    email: Option<String>,
    gender: String,
    age: u32,
    address: Address,
}

/// Everything needed to submit a registration.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub name: String,
    pub email: Option<String>,
    pub gender: String,
    pub age: u32,
    pub address: Address,
    pub location: Location,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<ValidatedForm> {
        let (Some(name), Some(gender), Some(age)) = (
            non_empty(&self.name),
            non_empty(&self.gender),
            non_empty(&self.age),
        ) else {
            return Err(SessionError::validation(
                "Please fill in all required fields (Name, Gender, Age)",
            ));
        };

        let address = Address {
            line1: non_empty(&self.address_line1),
            line2: non_empty(&self.address_line2),
            city: non_empty(&self.city),
            district: non_empty(&self.district),
            state: non_empty(&self.state),
            country: non_empty(&self.country),
            postal_code: non_empty(&self.postal_code),
        };
        let required = [
            &address.line1,
            &address.city,
            &address.district,
            &address.state,
            &address.country,
            &address.postal_code,
        ];
        if required.iter().any(|field| field.is_none()) {
            return Err(SessionError::validation(
                "Please fill in all required address fields (Address Line 1, City, District, State, Country, PIN)",
            ));
        }

        let age = match age.parse::<u32>() {
            Ok(age) if age > 0 => age,
            _ => return Err(SessionError::validation("Please enter a valid age")),
        };

        let email = non_empty(&self.email);
        if let Some(email) = &email {
            if !email.contains('@') {
                return Err(SessionError::validation("Please enter a valid email address"));
            }
        }

        Ok(ValidatedForm {
            name,
            email,
            gender,
            age,
            address,
        })
    }
}

impl ValidatedForm {
    pub fn with_location(self, location: Location) -> Registration {
        Registration {
            name: self.name,
            email: self.email,
            gender: self.gender,
            age: self.age,
            address: self.address,
            location,
        }
    }
}

impl Registration {
    /// Wire body for `POST /register-user`.
    pub fn to_request(&self, identity: &Identity) -> RegisterUserRequest {
        let address = &self.address;
        RegisterUserRequest {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: identity.phone_number.clone(),
            gender: self.gender.clone(),
            age: self.age,
            address_line1: address.line1.clone().unwrap_or_default(),
            address_line2: address.line2.clone(),
            city: address.city.clone().unwrap_or_default(),
            district: address.district.clone().unwrap_or_default(),
            state: address.state.clone().unwrap_or_default(),
            country: address.country.clone().unwrap_or_default(),
            pin: address.postal_code.clone().unwrap_or_default(),
            latitude: self.location.latitude,
            longitude: self.location.longitude,
        }
    }

    /// Profile as submitted, marked complete. Used to fill gaps the
    /// directory's response leaves.
    pub fn to_profile(&self, identity: &Identity) -> Profile {
        Profile {
            subject_id: identity.subject_id.clone(),
            name: Some(self.name.clone()),
            email: self.email.clone(),
            gender: Some(self.gender.clone()),
            age: Some(self.age),
            address: self.address.clone(),
            latitude: Some(self.location.latitude),
            longitude: Some(self.location.longitude),
            registration_complete: true,
            phone_verified: Some(true),
            email_verified: None,
            created_at: None,
        }
    }
}
