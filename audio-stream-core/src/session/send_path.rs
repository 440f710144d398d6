use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::models::audio_models::TrackHandle;
use crate::traits::transport_engine::TransportEngine;

/// Send side of a track: capture block → transport ingest.
///
/// A direct, synchronous forward from the capture thread. No buffering and
/// no retries; failures are logged and counted. Counters are atomics so the
/// capture thread never waits on a lock.
pub struct SendPath {
    handle: TrackHandle,
    sample_rate: u32,
    engine: Arc<dyn TransportEngine>,
    active: AtomicBool,
    blocks: AtomicU64,
    samples: AtomicU64,
    failures: AtomicU64,
}

impl SendPath {
    pub fn new(handle: TrackHandle, sample_rate: u32, engine: Arc<dyn TransportEngine>) -> Self {
        Self {
            handle,
            sample_rate,
            engine,
            active: AtomicBool::new(true),
            blocks: AtomicU64::new(0),
            samples: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Forward one captured block with the track's fixed sample rate.
    pub fn on_capture(&self, samples: &[f32], channels: u16) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }

        match self.engine.ingest_captured_audio(
            self.handle,
            samples,
            self.sample_rate,
            channels,
            samples.len(),
        ) {
            Ok(()) => {
                self.blocks.fetch_add(1, Ordering::Relaxed);
                self.samples.fetch_add(samples.len() as u64, Ordering::Relaxed);
            }
            Err(e) => {
                let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
                // Throttle: a dead transport fails every block.
                if failures.is_power_of_two() {
                    log::warn!("{}: ingest failed ({} failures so far): {}", self.handle, failures, e);
                }
            }
        }
    }

    /// Stop forwarding. Blocks still in flight on the capture thread are dropped.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn blocks(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}
