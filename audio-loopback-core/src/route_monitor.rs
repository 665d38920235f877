//! External output route classification.

use std::sync::Arc;

use crate::models::route::{OutputDevice, RouteStatus};
use crate::traits::platform::AudioPlatform;

/// Answers "is an external output attached?" against the live device list.
///
/// Cheap enough to call once per captured block; every call re-enumerates.
#[derive(Clone)]
pub struct RouteMonitor {
    platform: Arc<dyn AudioPlatform>,
}

impl RouteMonitor {
    pub fn new(platform: Arc<dyn AudioPlatform>) -> Self {
        Self { platform }
    }

    pub fn current_route(&self) -> RouteStatus {
        match self.platform.output_devices() {
            Some(devices) => RouteStatus::from_devices(&devices),
            None => RouteStatus::detached(),
        }
    }

    pub fn is_external_output_attached(&self) -> bool {
        self.current_route().attached
    }

    /// Active output devices, empty when the platform cannot enumerate.
    pub fn output_devices(&self) -> Vec<OutputDevice> {
        self.platform.output_devices().unwrap_or_default()
    }
}
