use async_trait::async_trait;

use super::models::Location;
use crate::error::{Result, SessionError};
use crate::kernel::BaseLocationProvider;

/// Location provider that answers with a position supplied up front, e.g.
/// from command-line flags. `None` behaves like a denied permission.
#[derive(Debug, Clone, Default)]
pub struct FixedLocationProvider {
    location: Option<Location>,
}

impl FixedLocationProvider {
    pub fn new(location: Option<Location>) -> Self {
        Self { location }
    }

    pub fn at(latitude: f64, longitude: f64) -> Result<Self> {
        Ok(Self::new(Some(Location::new(latitude, longitude)?)))
    }
}

#[async_trait]
impl BaseLocationProvider for FixedLocationProvider {
    async fn current_position(&self) -> Result<Location> {
        self.location.ok_or_else(|| {
            SessionError::LocationUnavailable("no position available".to_string())
        })
    }
}
