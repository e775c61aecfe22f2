use std::fmt;

use super::models::{Identity, Profile};

/// Read-only dashboard lines for a signed-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSummary {
    pub display_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub gender: Option<String>,
    pub age: Option<u32>,
    pub address: Option<String>,
    pub coordinates: Option<String>,
    pub registration_complete: bool,
}

impl ProfileSummary {
    pub fn new(identity: &Identity, profile: &Profile) -> Self {
        Self {
            display_name: profile
                .name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "User".to_string()),
            phone_number: identity.phone_number.clone(),
            email: profile.email.clone(),
            gender: profile.gender.clone(),
            age: profile.age,
            address: profile.address.joined(),
            coordinates: profile
                .location()
                .map(|loc| format!("{:.6}, {:.6}", loc.latitude, loc.longitude)),
            registration_complete: profile.registration_complete,
        }
    }
}

impl fmt::Display for ProfileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Welcome Back, {}!", self.display_name)?;
        writeln!(f, "Phone:    {}", self.phone_number)?;
        if let Some(email) = &self.email {
            writeln!(f, "Email:    {}", email)?;
        }
        if let Some(gender) = &self.gender {
            writeln!(f, "Gender:   {}", gender)?;
        }
        if let Some(age) = self.age {
            writeln!(f, "Age:      {}", age)?;
        }
        if let Some(address) = &self.address {
            writeln!(f, "Address:  {}", address)?;
        }
        if let Some(coordinates) = &self.coordinates {
            writeln!(f, "Location: {}", coordinates)?;
        }
        if !self.registration_complete {
            writeln!(f, "Registration pending")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::profile::{Address, SubjectId};

    #[test]
    fn name_falls_back_to_user() {
        let identity = Identity::new(SubjectId::new("u"), "+919999999999");
        let summary = ProfileSummary::new(&identity, &Profile::incomplete(SubjectId::new("u")));

        assert_eq!(summary.display_name, "User");
        assert!(summary.to_string().contains("Registration pending"));
    }

    #[test]
    fn coordinates_use_six_decimals() {
        let identity = Identity::new(SubjectId::new("u"), "+919999999999");
        let profile = Profile {
            subject_id: SubjectId::new("u"),
            name: Some("Asha".into()),
            address: Address {
                line1: Some("12 MG Road".into()),
                city: Some("Bengaluru".into()),
                ..Default::default()
            },
            latitude: Some(12.97),
            longitude: Some(77.5946123),
            registration_complete: true,
            ..Default::default()
        };

        let summary = ProfileSummary::new(&identity, &profile);
        assert_eq!(summary.coordinates.as_deref(), Some("12.970000, 77.594612"));
        assert_eq!(summary.address.as_deref(), Some("12 MG Road, Bengaluru"));
        assert!(summary.to_string().starts_with("Welcome Back, Asha!"));
    }
}
