//! Session persistence
//!
//! Best-effort mirror of queue, cursor and position so a restart resumes
//! the playback context (not the audio). The blob is internal JSON with no
//! compatibility promise; anything unreadable is treated as "no session".

use crate::error::{PlaybackError, Result};
use crate::queue::Queue;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crossplay_core::Track;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Persisted playback context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub queue: Vec<Track>,
    pub current_index: Option<usize>,
    pub position_ms: u64,
    pub saved_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Capture the given queue and position
    pub fn capture(queue: &Queue, position_ms: u64) -> Self {
        Self {
            queue: queue.tracks().to_vec(),
            current_index: queue.current_index(),
            position_ms,
            saved_at: Utc::now(),
        }
    }

    /// Rebuild the queue, rejecting snapshots that break the cursor invariant
    ///
    /// The position is clamped to the current track's duration when known.
    pub fn into_queue(self) -> Option<(Queue, u64)> {
        let queue = Queue::from_parts(self.queue, self.current_index)?;
        let position_ms = match queue.current() {
            Some(t) if t.duration_ms > 0 => self.position_ms.min(t.duration_ms),
            Some(_) => self.position_ms,
            None => 0,
        };
        Some((queue, position_ms))
    }

    /// Whether two snapshots hold the same context, ignoring `saved_at`
    pub fn same_context(&self, other: &SessionSnapshot) -> bool {
        self.current_index == other.current_index
            && self.position_ms == other.position_ms
            && self.queue == other.queue
    }
}

/// Storage for the session snapshot
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the last snapshot, `Ok(None)` when there is none
    async fn load(&self) -> Result<Option<SessionSnapshot>>;

    /// Replace the stored snapshot
    async fn save(&self, snapshot: &SessionSnapshot) -> Result<()>;

    /// Remove the stored snapshot
    async fn clear(&self) -> Result<()>;
}

/// JSON file store, written atomically via a sibling temp file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store the snapshot at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "session.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn load(&self) -> Result<Option<SessionSnapshot>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot = serde_json::from_slice(&bytes)?;
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec(snapshot)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        debug!(path = %self.path.display(), tracks = snapshot.queue.len(), "Session saved");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store, lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    blob: Mutex<Option<String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding a raw blob (used to simulate corrupted state)
    pub fn with_raw(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.blob
            .lock()
            .map_err(|e| PlaybackError::Session(e.to_string()))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self) -> Result<Option<SessionSnapshot>> {
        let blob = self.lock()?.clone();
        match blob {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot)?;
        *self.lock()? = Some(json);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.lock()? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossplay_core::Provider;

    fn track(id: &str, duration_ms: u64) -> Track {
        Track::new(id, Provider::SoundCloud, format!("https://api.soundcloud.com/tracks/{id}/stream"), id, duration_ms)
    }

    #[test]
    fn position_is_clamped_to_duration() {
        let snapshot = SessionSnapshot {
            queue: vec![track("a", 1_000)],
            current_index: Some(0),
            position_ms: 5_000,
            saved_at: Utc::now(),
        };
        let (queue, position) = snapshot.into_queue().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(position, 1_000);
    }

    #[test]
    fn snapshot_with_dangling_cursor_is_rejected() {
        let snapshot = SessionSnapshot {
            queue: vec![track("a", 1_000)],
            current_index: Some(3),
            position_ms: 0,
            saved_at: Utc::now(),
        };
        assert!(snapshot.into_queue().is_none());
    }

    #[test]
    fn same_context_ignores_timestamp() {
        let mut queue = Queue::new();
        queue.enqueue(track("a", 1_000));
        let first = SessionSnapshot::capture(&queue, 10);
        let mut second = first.clone();
        second.saved_at = Utc::now() + chrono::Duration::seconds(5);
        assert!(first.same_context(&second));

        second.position_ms = 11;
        assert!(!first.same_context(&second));
    }

    #[tokio::test]
    async fn memory_store_round_trip_and_corruption() {
        let store = MemoryStore::new();
        assert!(store.load().await.unwrap().is_none());

        let mut queue = Queue::new();
        queue.enqueue(track("a", 1_000));
        let snapshot = SessionSnapshot::capture(&queue, 250);
        store.save(&snapshot).await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap(), snapshot);

        let corrupted = MemoryStore::with_raw("{not json");
        assert!(corrupted.load().await.is_err());
    }
}
