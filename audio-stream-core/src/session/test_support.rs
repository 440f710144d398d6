//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioFormat, TrackHandle};
use crate::models::error::{Result, StreamError};
use crate::processing::audio_clip::AudioClip;
use crate::traits::capture_source::{CaptureCallback, CaptureSource};
use crate::traits::track_delegate::TrackDelegate;
use crate::traits::transport_engine::{ReceiveCallback, TransportEngine};

#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    pub handle: TrackHandle,
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_count: usize,
}

/// Transport engine that records every call and lets tests play the native
/// thread by calling `deliver`.
#[derive(Default)]
pub struct RecordingEngine {
    next_handle: AtomicU64,
    created: Mutex<Vec<(TrackHandle, String)>>,
    deleted: Mutex<Vec<TrackHandle>>,
    callbacks: Mutex<HashMap<TrackHandle, ReceiveCallback>>,
    ingested: Mutex<Vec<Ingested>>,
    fail_ingest: AtomicBool,
    fail_register: AtomicBool,
}

impl RecordingEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_ingest(&self, fail: bool) {
        self.fail_ingest.store(fail, Ordering::SeqCst);
    }

    pub fn fail_register(&self, fail: bool) {
        self.fail_register.store(fail, Ordering::SeqCst);
    }

    /// Invoke the receive callback registered for `handle`, as the engine's
    /// native thread would. Returns false if none is registered.
    pub fn deliver(&self, handle: TrackHandle, samples: &[f32], sample_rate: u32, channels: u16) -> bool {
        let callback = self.callbacks.lock().get(&handle).cloned();
        match callback {
            Some(callback) => {
                let frames = samples.len() / channels.max(1) as usize;
                callback(handle, samples, sample_rate, channels, frames);
                true
            }
            None => false,
        }
    }

    pub fn created(&self) -> Vec<(TrackHandle, String)> {
        self.created.lock().clone()
    }

    pub fn deleted(&self) -> Vec<TrackHandle> {
        self.deleted.lock().clone()
    }

    pub fn has_callback(&self, handle: TrackHandle) -> bool {
        self.callbacks.lock().contains_key(&handle)
    }

    pub fn ingested(&self) -> Vec<Ingested> {
        self.ingested.lock().clone()
    }
}

impl TransportEngine for RecordingEngine {
    fn create_track(&self, name: &str) -> Result<TrackHandle> {
        let handle = TrackHandle(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        self.created.lock().push((handle, name.to_string()));
        Ok(handle)
    }

    fn delete_track(&self, handle: TrackHandle) {
        self.deleted.lock().push(handle);
    }

    fn register_receive_callback(
        &self,
        handle: TrackHandle,
        callback: ReceiveCallback,
    ) -> Result<()> {
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(StreamError::Transport("register rejected".into()));
        }
        self.callbacks.lock().insert(handle, callback);
        Ok(())
    }

    fn unregister_receive_callback(&self, handle: TrackHandle) {
        self.callbacks.lock().remove(&handle);
    }

    fn ingest_captured_audio(
        &self,
        handle: TrackHandle,
        samples: &[f32],
        sample_rate: u32,
        channels: u16,
        sample_count: usize,
    ) -> Result<()> {
        if self.fail_ingest.load(Ordering::SeqCst) {
            return Err(StreamError::Transport("encoder unavailable".into()));
        }
        self.ingested.lock().push(Ingested {
            handle,
            samples: samples.to_vec(),
            sample_rate,
            channels,
            sample_count,
        });
        Ok(())
    }
}

/// Delegate that records every notification.
#[derive(Default)]
pub struct RecordingDelegate {
    events: Mutex<Vec<(String, Arc<AudioClip>)>>,
}

impl RecordingDelegate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<(String, Arc<AudioClip>)> {
        self.events.lock().clone()
    }
}

impl TrackDelegate for RecordingDelegate {
    fn on_audio_received(&self, track_id: &str, clip: Arc<AudioClip>) {
        self.events.lock().push((track_id.to_string(), clip));
    }
}

#[derive(Default)]
struct MockSourceState {
    callback: Mutex<Option<CaptureCallback>>,
    starts: AtomicU64,
    stops: AtomicU64,
}

/// Capture source driven by the test through `emit`. Clones share state, so
/// a test can keep one clone after handing another to a track.
#[derive(Clone)]
pub struct MockSource {
    format: Option<AudioFormat>,
    state: Arc<MockSourceState>,
}

impl MockSource {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format: Some(format),
            state: Arc::default(),
        }
    }

    /// A source with no clip attached.
    pub fn without_clip() -> Self {
        Self {
            format: None,
            state: Arc::default(),
        }
    }

    /// Deliver a block as the device thread would. Returns false when stopped.
    pub fn emit(&self, samples: &[f32], channels: u16) -> bool {
        let callback = self.state.callback.lock().clone();
        match callback {
            Some(callback) => {
                callback(samples, channels);
                true
            }
            None => false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.state.callback.lock().is_some()
    }

    pub fn starts(&self) -> u64 {
        self.state.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> u64 {
        self.state.stops.load(Ordering::SeqCst)
    }
}

impl CaptureSource for MockSource {
    fn clip_format(&self) -> Option<AudioFormat> {
        self.format
    }

    fn start(&mut self, callback: CaptureCallback) -> Result<()> {
        *self.state.callback.lock() = Some(callback);
        self.state.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.state.callback.lock().take();
        self.state.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
