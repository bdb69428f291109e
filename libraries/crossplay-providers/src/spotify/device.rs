//! Device handshake
//!
//! Spotify commands only take effect once a Connect device is known. A
//! connector produces that device id; the adapter then transfers playback
//! to it.

use super::api::WebApiClient;
use async_trait::async_trait;
use crossplay_playback::Result;
use std::time::Duration;
use tracing::{debug, info};

/// Produces the id of the device playback should target
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    /// Wait until the device is available and return its id
    ///
    /// May wait indefinitely; the caller bounds it.
    async fn connect(&self, api: &WebApiClient) -> Result<String>;
}

/// Device whose id is already known
#[derive(Debug, Clone)]
pub struct FixedDeviceConnector {
    device_id: String,
}

impl FixedDeviceConnector {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
        }
    }
}

#[async_trait]
impl DeviceConnector for FixedDeviceConnector {
    async fn connect(&self, _api: &WebApiClient) -> Result<String> {
        Ok(self.device_id.clone())
    }
}

/// Polls the device list until a device with the given name shows up
#[derive(Debug, Clone)]
pub struct NamedDeviceConnector {
    name: String,
    poll_interval: Duration,
}

impl NamedDeviceConnector {
    pub fn new(name: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            name: name.into(),
            poll_interval,
        }
    }
}

#[async_trait]
impl DeviceConnector for NamedDeviceConnector {
    async fn connect(&self, api: &WebApiClient) -> Result<String> {
        loop {
            let devices = api.devices().await?;
            let found = devices
                .into_iter()
                .find(|d| d.name.eq_ignore_ascii_case(&self.name))
                .and_then(|d| d.id);

            if let Some(id) = found {
                info!(device = %self.name, device_id = %id, "Spotify device found");
                return Ok(id);
            }

            debug!(device = %self.name, "Spotify device not visible yet");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
