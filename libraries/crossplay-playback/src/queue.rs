//! Cross-provider play queue
//!
//! One ordered list of tracks with a movable cursor. Tracks from either
//! provider may be interleaved and the same track may appear more than once.
//!
//! ```text
//!   0  A (spotify)
//! > 1  B (soundcloud)   <- current_index = Some(1)
//!   2  C (spotify)
//! ```
//!
//! Invariant: `current_index` is `None` exactly when the queue is empty.

use crossplay_core::{Provider, Track};

/// What a queue mutation did to the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    /// Cursor still references the same logical track (its index may have shifted)
    Unchanged,

    /// Cursor now references a different track; playback must follow
    Moved,

    /// Queue became empty
    Cleared,
}

/// Play queue with a current-track cursor
#[derive(Debug, Clone, Default)]
pub struct Queue {
    tracks: Vec<Track>,
    current_index: Option<usize>,
}

impl Queue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a queue from persisted parts
    ///
    /// Returns `None` when the parts break the cursor invariant.
    pub fn from_parts(tracks: Vec<Track>, current_index: Option<usize>) -> Option<Self> {
        let valid = match current_index {
            None => tracks.is_empty(),
            Some(index) => index < tracks.len(),
        };
        valid.then_some(Self {
            tracks,
            current_index,
        })
    }

    /// Append a track
    ///
    /// Selects it when nothing was selected.
    pub fn enqueue(&mut self, track: Track) -> CursorMove {
        self.tracks.push(track);
        if self.current_index.is_none() {
            self.current_index = Some(0);
            CursorMove::Moved
        } else {
            CursorMove::Unchanged
        }
    }

    /// Replace the whole queue with a single selected track
    pub fn replace_with(&mut self, track: Track) {
        self.tracks = vec![track];
        self.current_index = Some(0);
    }

    /// Remove the first entry matching `(id, provider)`
    ///
    /// Returns the removed track and its effect on the cursor, or `None`
    /// when nothing matched.
    pub fn remove_track(&mut self, id: &str, provider: Provider) -> Option<(Track, CursorMove)> {
        let position = self.tracks.iter().position(|t| t.matches(id, provider))?;
        let removed = self.tracks.remove(position);

        let effect = match self.current_index {
            None => CursorMove::Unchanged,
            Some(_) if self.tracks.is_empty() => {
                self.current_index = None;
                CursorMove::Cleared
            }
            Some(current) if position < current => {
                self.current_index = Some(current - 1);
                CursorMove::Unchanged
            }
            Some(current) if position == current => {
                self.current_index = Some(current.min(self.tracks.len() - 1));
                CursorMove::Moved
            }
            Some(_) => CursorMove::Unchanged,
        };

        Some((removed, effect))
    }

    /// Move one track from `from` to `to`
    ///
    /// The cursor keeps pointing at the same logical track. Out-of-range
    /// indices are ignored; returns whether the move happened.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        let len = self.tracks.len();
        if from >= len || to >= len {
            return false;
        }
        if from == to {
            return true;
        }

        let track = self.tracks.remove(from);
        self.tracks.insert(to, track);

        if let Some(current) = self.current_index {
            self.current_index = Some(if current == from {
                to
            } else if from < current && to >= current {
                current - 1
            } else if from > current && to <= current {
                current + 1
            } else {
                current
            });
        }

        true
    }

    /// Empty the queue
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current_index = None;
    }

    /// Point the cursor at `index`
    ///
    /// Out-of-range indices are ignored; returns whether the cursor moved.
    pub fn select_index(&mut self, index: usize) -> bool {
        if index >= self.tracks.len() {
            return false;
        }
        self.current_index = Some(index);
        true
    }

    /// Step the cursor forward, refusing to run off the end
    pub fn advance(&mut self) -> bool {
        match self.current_index {
            Some(current) if current + 1 < self.tracks.len() => {
                self.current_index = Some(current + 1);
                true
            }
            _ => false,
        }
    }

    /// Step the cursor back, refusing to go below zero
    pub fn retreat(&mut self) -> bool {
        match self.current_index {
            Some(current) if current > 0 => {
                self.current_index = Some(current - 1);
                true
            }
            _ => false,
        }
    }

    /// Track under the cursor
    pub fn current(&self) -> Option<&Track> {
        self.current_index.and_then(|i| self.tracks.get(i))
    }

    /// Cursor position
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// All tracks in play order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Track at index
    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Total number of tracks in queue
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Whether the cursor sits on the last track
    pub fn is_at_end(&self) -> bool {
        self.current_index
            .is_some_and(|i| i + 1 == self.tracks.len())
    }
}
