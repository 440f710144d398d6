//! In-process transport engine.
//!
//! Audio ingested on a track is re-chunked into 10 ms engine frames and
//! handed to the receive callback of the track it is linked to, on the
//! engine's own `loopback-engine` thread. No encoding takes place; the
//! delivered samples are the ingested ones.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use audio_stream_core::models::audio_models::{AudioFormat, TrackHandle};
use audio_stream_core::models::error::StreamError;
use audio_stream_core::traits::transport_engine::{ReceiveCallback, TransportEngine};

/// Engine frame duration: 1/100 s.
const FRAMES_PER_SECOND: u32 = 100;

struct Delivery {
    target: TrackHandle,
    samples: Vec<f32>,
    format: AudioFormat,
}

#[derive(Default)]
struct LoopbackTrack {
    name: String,
    peer: Option<TrackHandle>,
    callback: Option<ReceiveCallback>,
    pending: Vec<f32>,
    pending_format: Option<AudioFormat>,
}

#[derive(Default)]
struct Inner {
    next_handle: AtomicU64,
    tracks: Mutex<HashMap<TrackHandle, LoopbackTrack>>,
    running: AtomicBool,
    delivered: AtomicU64,
}

impl Inner {
    fn deliver(&self, delivery: Delivery) {
        // Clone the callback out so it runs without the table lock held.
        let callback = self
            .tracks
            .lock()
            .get(&delivery.target)
            .and_then(|track| track.callback.clone());
        let Some(callback) = callback else {
            return;
        };
        let frames = delivery.format.frames_in(delivery.samples.len());
        callback(
            delivery.target,
            &delivery.samples,
            delivery.format.sample_rate,
            delivery.format.channels,
            frames,
        );
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }
}

/// Loopback transport engine.
///
/// Tracks are unlinked when created; audio ingested on an unlinked track is
/// discarded. `link` connects two tracks in both directions, and linking a
/// track to itself makes it an echo.
pub struct LoopbackEngine {
    inner: Arc<Inner>,
    sender: Sender<Delivery>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl LoopbackEngine {
    /// Start the engine thread.
    pub fn new() -> Result<Self, StreamError> {
        let inner = Arc::new(Inner::default());
        inner.running.store(true, Ordering::SeqCst);

        let (sender, receiver) = unbounded::<Delivery>();
        let thread_inner = Arc::clone(&inner);
        let handle = thread::Builder::new()
            .name("loopback-engine".into())
            .spawn(move || {
                while thread_inner.running.load(Ordering::SeqCst) {
                    match receiver.recv_timeout(Duration::from_millis(50)) {
                        Ok(delivery) => thread_inner.deliver(delivery),
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(|e| StreamError::Transport(format!("failed to spawn engine thread: {}", e)))?;

        Ok(Self {
            inner,
            sender,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Route audio ingested on `a` to `b` and vice versa.
    pub fn link(&self, a: TrackHandle, b: TrackHandle) -> Result<(), StreamError> {
        let mut tracks = self.inner.tracks.lock();
        for handle in [a, b] {
            if !tracks.contains_key(&handle) {
                return Err(StreamError::Transport(format!("unknown {}", handle)));
            }
        }
        for (from, to) in [(a, b), (b, a)] {
            if let Some(track) = tracks.get_mut(&from) {
                track.peer = Some(to);
            }
        }
        log::debug!("linked {} <-> {}", a, b);
        Ok(())
    }

    /// Stop routing audio ingested on `handle` and on its peer.
    pub fn unlink(&self, handle: TrackHandle) {
        let mut tracks = self.inner.tracks.lock();
        let peer = tracks.get_mut(&handle).and_then(|track| track.peer.take());
        if let Some(peer) = peer {
            if let Some(track) = tracks.get_mut(&peer) {
                if track.peer == Some(handle) {
                    track.peer = None;
                }
            }
        }
    }

    pub fn peer(&self, handle: TrackHandle) -> Option<TrackHandle> {
        self.inner.tracks.lock().get(&handle).and_then(|track| track.peer)
    }

    pub fn track_name(&self, handle: TrackHandle) -> Option<String> {
        self.inner.tracks.lock().get(&handle).map(|track| track.name.clone())
    }

    pub fn track_count(&self) -> usize {
        self.inner.tracks.lock().len()
    }

    /// Engine frames handed to receive callbacks so far.
    pub fn delivered(&self) -> u64 {
        self.inner.delivered.load(Ordering::Relaxed)
    }

    /// Stop the engine thread. Frames still queued are dropped.
    pub fn shutdown(&self) {
        let Some(handle) = self.worker.lock().take() else {
            return;
        };
        self.inner.running.store(false, Ordering::SeqCst);
        if handle.join().is_err() {
            log::error!("loopback engine thread panicked");
        }
    }
}

impl Drop for LoopbackEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl TransportEngine for LoopbackEngine {
    fn create_track(&self, name: &str) -> Result<TrackHandle, StreamError> {
        if !self.inner.running.load(Ordering::SeqCst) {
            return Err(StreamError::Transport("loopback engine is shut down".into()));
        }
        let handle = TrackHandle(self.inner.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        self.inner.tracks.lock().insert(
            handle,
            LoopbackTrack {
                name: name.to_string(),
                ..Default::default()
            },
        );
        Ok(handle)
    }

    fn delete_track(&self, handle: TrackHandle) {
        self.unlink(handle);
        self.inner.tracks.lock().remove(&handle);
    }

    fn register_receive_callback(
        &self,
        handle: TrackHandle,
        callback: ReceiveCallback,
    ) -> Result<(), StreamError> {
        match self.inner.tracks.lock().get_mut(&handle) {
            Some(track) => {
                track.callback = Some(callback);
                Ok(())
            }
            None => Err(StreamError::Transport(format!("unknown {}", handle))),
        }
    }

    fn unregister_receive_callback(&self, handle: TrackHandle) {
        if let Some(track) = self.inner.tracks.lock().get_mut(&handle) {
            track.callback = None;
        }
    }

    fn ingest_captured_audio(
        &self,
        handle: TrackHandle,
        samples: &[f32],
        sample_rate: u32,
        channels: u16,
        sample_count: usize,
    ) -> Result<(), StreamError> {
        let format = AudioFormat::new(sample_rate, channels);
        if !format.is_valid() {
            return Err(StreamError::InvalidArgument(format!("unusable format {}", format)));
        }
        if sample_count != samples.len() {
            return Err(StreamError::InvalidArgument(format!(
                "sample count {} does not match {} samples",
                sample_count,
                samples.len()
            )));
        }

        let mut tracks = self.inner.tracks.lock();
        let track = tracks
            .get_mut(&handle)
            .ok_or_else(|| StreamError::Transport(format!("unknown {}", handle)))?;
        let Some(target) = track.peer else {
            return Ok(());
        };

        if track.pending_format != Some(format) {
            track.pending.clear();
            track.pending_format = Some(format);
        }
        track.pending.extend_from_slice(samples);

        let frame_samples = engine_frame_samples(format);
        while track.pending.len() >= frame_samples {
            let chunk: Vec<f32> = track.pending.drain(..frame_samples).collect();
            self.sender
                .send(Delivery {
                    target,
                    samples: chunk,
                    format,
                })
                .map_err(|_| StreamError::Transport("loopback engine is shut down".into()))?;
        }
        Ok(())
    }
}

/// Interleaved samples in one 10 ms engine frame, at least one frame.
fn engine_frame_samples(format: AudioFormat) -> usize {
    let frames = (format.sample_rate / FRAMES_PER_SECOND).max(1) as usize;
    frames * format.channels as usize
}
