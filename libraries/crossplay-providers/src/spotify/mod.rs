//! Spotify Connect provider

mod adapter;
mod api;
mod device;

pub use adapter::{SpotifyAdapter, DEFAULT_POLL_INTERVAL};
pub use api::{Device, PlayerState, PlayingItem, WebApiClient, DEFAULT_API_BASE};
pub use device::{DeviceConnector, FixedDeviceConnector, NamedDeviceConnector};
