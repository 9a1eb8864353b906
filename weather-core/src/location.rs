use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    config::LocationConfig,
    error::{Result, WeatherError},
    model::LocationData,
};

/// One-shot source of the device's coordinates.
#[async_trait]
pub trait LocationSource: Send + Sync + Debug {
    async fn current_location(&self) -> Result<LocationData>;
}

/// What the host platform offers: a permission check and a best-effort last fix.
#[async_trait]
pub trait LocationPlatform: Send + Sync + Debug {
    fn has_permission(&self) -> bool;

    /// `Ok(None)` when the platform has no fix yet. Errors are reported to the user as-is.
    async fn last_known_fix(&self) -> Result<Option<LocationData>>;
}

/// Checks the permission before ever touching the platform.
#[derive(Debug, Clone)]
pub struct LocationProvider<P> {
    platform: P,
}

impl<P: LocationPlatform> LocationProvider<P> {
    pub fn new(platform: P) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl<P: LocationPlatform> LocationSource for LocationProvider<P> {
    async fn current_location(&self) -> Result<LocationData> {
        if !self.platform.has_permission() {
            return Err(WeatherError::PermissionDenied);
        }

        self.platform.last_known_fix().await?.ok_or(WeatherError::NoLocationData)
    }
}

/// Platform backed by the `[location]` config section.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredLocation {
    config: LocationConfig,
}

impl ConfiguredLocation {
    pub fn new(config: LocationConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LocationPlatform for ConfiguredLocation {
    fn has_permission(&self) -> bool {
        self.config.enabled
    }

    async fn last_known_fix(&self) -> Result<Option<LocationData>> {
        Ok(self.config.last_known_fix())
    }
}
