//! Test fixtures

use session_core::domains::profile::{Identity, Profile, RegistrationForm};
use session_core::kernel::test_dependencies::MockBackend;
use storefront_api::{LooseNumber, UserDetail};

pub const PHONE: &str = "+919999999999";
pub const VALID_CODE: &str = "112233";
pub const WRONG_CODE: &str = "000000";

pub fn registration_form() -> RegistrationForm {
    RegistrationForm {
        name: "Asha Rao".to_string(),
        email: "asha@example.com".to_string(),
        gender: "Female".to_string(),
        age: "31".to_string(),
        address_line1: "12 MG Road".to_string(),
        address_line2: String::new(),
        city: "Bengaluru".to_string(),
        district: "Bengaluru Urban".to_string(),
        state: "Karnataka".to_string(),
        country: "India".to_string(),
        postal_code: "560001".to_string(),
    }
}

/// Directory record for a user who registered earlier
pub fn registered_detail() -> UserDetail {
    UserDetail {
        name: Some("Asha Rao".to_string()),
        phone: Some(PHONE.to_string()),
        gender: Some("Female".to_string()),
        age: Some(LooseNumber::Text("31".to_string())),
        address_line1: Some("12 MG Road".to_string()),
        city: Some("Bengaluru".to_string()),
        pin: Some("560001".to_string()),
        latitude: Some(LooseNumber::Text("12.9716".to_string())),
        longitude: Some(LooseNumber::Number(77.5946)),
        is_phone_verified: Some(true),
        ..Default::default()
    }
}

pub fn identity() -> Identity {
    Identity::new(MockBackend::subject_for(PHONE), PHONE)
}

/// Profile as cached on the device, slightly behind the directory
pub fn cached_profile() -> Profile {
    Profile {
        name: Some("Asha (cached)".to_string()),
        registration_complete: true,
        ..Profile::incomplete(MockBackend::subject_for(PHONE))
    }
}
