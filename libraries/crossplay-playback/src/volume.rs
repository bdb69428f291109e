//! Master volume bridge
//!
//! One logical volume (fraction in `[0, 1]`) fanned out to every adapter and,
//! for authenticated users, persisted server-side in the background.

use crate::adapter::AdapterRegistry;
use crossplay_core::VolumePersistence;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Clamp a volume fraction into `[0, 1]`, mapping NaN to silence
pub fn clamp_fraction(fraction: f32) -> f32 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}

/// Convert a volume fraction to a whole percentage (0-100)
pub fn to_percent(fraction: f32) -> u8 {
    (clamp_fraction(fraction) * 100.0).round() as u8
}

/// Fans master volume out to adapters and the persistence collaborator
pub struct VolumeBridge {
    volume: f32,
    persistence: Option<Arc<dyn VolumePersistence>>,
}

impl VolumeBridge {
    /// Create a bridge starting at `initial` (clamped)
    pub fn new(initial: f32) -> Self {
        Self {
            volume: clamp_fraction(initial),
            persistence: None,
        }
    }

    /// Attach the server-side persistence collaborator
    #[must_use]
    pub fn with_persistence(mut self, persistence: Arc<dyn VolumePersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Current master volume
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Set master volume
    ///
    /// Every registered adapter receives the new value, active or not, so an
    /// inactive one is primed for when it takes over. Adapter failures are
    /// logged. When the user is authenticated the value is persisted on a
    /// background task whose handle is returned; failures there are logged
    /// and never roll back the local change.
    pub async fn set_volume(
        &mut self,
        fraction: f32,
        registry: &AdapterRegistry,
    ) -> Option<JoinHandle<()>> {
        self.volume = clamp_fraction(fraction);
        self.apply(registry).await;
        self.persist()
    }

    /// Push the current volume to every adapter without persisting it
    pub async fn apply(&self, registry: &AdapterRegistry) {
        for adapter in registry.iter() {
            if let Err(e) = adapter.set_volume(self.volume).await {
                warn!(provider = %adapter.provider(), error = %e, "Failed to apply volume");
            }
        }
    }

    fn persist(&self) -> Option<JoinHandle<()>> {
        let persistence = self.persistence.as_ref()?;
        if !persistence.is_authenticated() {
            debug!("Anonymous session, volume kept local");
            return None;
        }

        let persistence = Arc::clone(persistence);
        let volume = self.volume;
        Some(tokio::spawn(async move {
            if let Err(e) = persistence.set_user_volume(volume).await {
                warn!(volume, error = %e, "Failed to persist volume");
            }
        }))
    }
}

impl std::fmt::Debug for VolumeBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeBridge")
            .field("volume", &self.volume)
            .field("persistence", &self.persistence.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_is_clamped() {
        assert_eq!(clamp_fraction(-0.5), 0.0);
        assert_eq!(clamp_fraction(1.5), 1.0);
        assert_eq!(clamp_fraction(f32::NAN), 0.0);
        assert_eq!(clamp_fraction(0.7), 0.7);
    }

    #[test]
    fn percent_rounds() {
        assert_eq!(to_percent(0.7), 70);
        assert_eq!(to_percent(0.333), 33);
        assert_eq!(to_percent(0.005), 1);
        assert_eq!(to_percent(2.0), 100);
    }

    #[test]
    fn initial_volume_is_clamped() {
        assert_eq!(VolumeBridge::new(3.0).volume(), 1.0);
    }
}
