use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::models::audio_models::TrackHandle;

/// Maps native track handles back to live track objects.
///
/// Entries are weak: the registry never keeps a track alive. A lookup after
/// disposal (or after the last owner dropped) returns `None`, which is how a
/// late native callback learns its track is gone.
pub struct TrackRegistry<T> {
    entries: Mutex<HashMap<TrackHandle, Weak<T>>>,
}

impl<T> TrackRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register `track` under `handle`, replacing any stale entry.
    pub fn insert(&self, handle: TrackHandle, track: &Arc<T>) {
        self.entries.lock().insert(handle, Arc::downgrade(track));
    }

    /// Remove `handle`. Returns whether an entry existed.
    pub fn remove(&self, handle: TrackHandle) -> bool {
        self.entries.lock().remove(&handle).is_some()
    }

    pub fn resolve(&self, handle: TrackHandle) -> Option<Arc<T>> {
        let mut entries = self.entries.lock();
        let track = entries.get(&handle)?.upgrade();
        if track.is_none() {
            entries.remove(&handle);
        }
        track
    }

    pub fn contains(&self, handle: TrackHandle) -> bool {
        self.resolve(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for TrackRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
