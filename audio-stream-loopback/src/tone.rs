//! Sine-tone capture source.
//!
//! Stands in for a microphone: delivers fixed-size interleaved blocks on a
//! dedicated `tone-capture` thread, paced in real time.

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use audio_stream_core::models::audio_models::AudioFormat;
use audio_stream_core::models::error::StreamError;
use audio_stream_core::traits::capture_source::{CaptureCallback, CaptureSource};

/// Default device block size in frames.
const DEFAULT_BLOCK_FRAMES: usize = 1024;

/// Capture source producing a sine tone in the format of its clip.
pub struct ToneSource {
    format: AudioFormat,
    frequency: f32,
    amplitude: f32,
    block_frames: usize,
    running: Arc<AtomicBool>,
    capture_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl ToneSource {
    pub fn new(format: AudioFormat, frequency: f32) -> Self {
        Self {
            format,
            frequency,
            amplitude: 0.5,
            block_frames: DEFAULT_BLOCK_FRAMES,
            running: Arc::new(AtomicBool::new(false)),
            capture_handle: Mutex::new(None),
        }
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    pub fn with_block_frames(mut self, block_frames: usize) -> Self {
        self.block_frames = block_frames.max(1);
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl CaptureSource for ToneSource {
    fn clip_format(&self) -> Option<AudioFormat> {
        Some(self.format)
    }

    fn start(&mut self, callback: CaptureCallback) -> Result<(), StreamError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(StreamError::Capture("tone capture already running".into()));
        }
        if !self.format.is_valid() {
            return Err(StreamError::Capture(format!("unusable tone format {}", self.format)));
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let format = self.format;
        let step = TAU * self.frequency / format.sample_rate as f32;
        let amplitude = self.amplitude;
        let block_frames = self.block_frames;

        let handle = thread::Builder::new()
            .name("tone-capture".into())
            .spawn(move || {
                let channels = format.channels;
                let block_duration =
                    Duration::from_secs_f64(block_frames as f64 / format.sample_rate as f64);
                let mut block = vec![0.0f32; block_frames * channels as usize];
                let mut phase = 0.0f32;
                let mut deadline = Instant::now();

                while running.load(Ordering::SeqCst) {
                    phase = fill_tone(&mut block, channels, phase, step, amplitude);
                    callback(&block, channels);

                    deadline += block_duration;
                    if let Some(wait) = deadline.checked_duration_since(Instant::now()) {
                        thread::sleep(wait);
                    }
                }
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                StreamError::Capture(format!("failed to spawn tone thread: {}", e))
            })?;

        *self.capture_handle.lock() = Some(handle);
        log::debug!("tone capture started: {} Hz at {}", self.frequency, self.format);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), StreamError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture_handle.lock().take() {
            if handle.join().is_err() {
                return Err(StreamError::Capture("tone capture thread panicked".into()));
            }
        }
        Ok(())
    }
}

impl Drop for ToneSource {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("{}", e);
        }
    }
}

/// Fill `block` with interleaved sine samples, the same value on every
/// channel. Returns the phase to continue from.
fn fill_tone(block: &mut [f32], channels: u16, mut phase: f32, step: f32, amplitude: f32) -> f32 {
    for frame in block.chunks_exact_mut(channels as usize) {
        frame.fill(amplitude * phase.sin());
        phase = (phase + step) % TAU;
    }
    phase
}
