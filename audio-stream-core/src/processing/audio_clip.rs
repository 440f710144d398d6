use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;

use crate::models::audio_models::AudioFormat;

/// Fixed-length interleaved f32 playback buffer shared with an output device.
///
/// Samples are stored as `AtomicU32` bit patterns so a playback thread can
/// pull while the receive path writes, with no exclusion beyond per-sample
/// atomicity. A reader may observe a block that is half old, half new audio.
///
/// The storage lock is only taken exclusively by `release()`.
#[derive(Debug)]
pub struct AudioClip {
    name: String,
    length_frames: usize,
    format: AudioFormat,
    samples: RwLock<Option<Box<[AtomicU32]>>>,
}

impl AudioClip {
    /// Allocate a zero-filled clip of `length_frames` frames.
    pub fn new(name: &str, length_frames: usize, format: AudioFormat) -> Self {
        let len = length_frames * format.channels as usize;
        let storage: Box<[AtomicU32]> = (0..len).map(|_| AtomicU32::new(0.0f32.to_bits())).collect();
        Self {
            name: name.to_string(),
            length_frames,
            format,
            samples: RwLock::new(Some(storage)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Length in frames (samples per channel).
    pub fn length_frames(&self) -> usize {
        self.length_frames
    }

    pub fn channels(&self) -> u16 {
        self.format.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn is_released(&self) -> bool {
        self.samples.read().is_none()
    }

    /// Write interleaved samples starting at `offset_frames`.
    ///
    /// Samples past the end of the clip are ignored. Returns the number of
    /// samples written.
    pub fn write_frames(&self, offset_frames: usize, samples: &[f32]) -> usize {
        let guard = self.samples.read();
        let Some(storage) = guard.as_ref() else {
            log::warn!("write to released clip '{}' ignored", self.name);
            return 0;
        };

        let start = offset_frames * self.format.channels as usize;
        if start >= storage.len() {
            return 0;
        }
        let count = samples.len().min(storage.len() - start);
        for (slot, sample) in storage[start..start + count].iter().zip(samples) {
            slot.store(sample.to_bits(), Ordering::Relaxed);
        }
        count
    }

    /// Copy interleaved samples starting at `offset_frames` into `out`.
    ///
    /// Returns the number of samples copied; zero once released.
    pub fn read_frames(&self, offset_frames: usize, out: &mut [f32]) -> usize {
        let guard = self.samples.read();
        let Some(storage) = guard.as_ref() else {
            return 0;
        };

        let start = offset_frames * self.format.channels as usize;
        if start >= storage.len() {
            return 0;
        }
        let count = out.len().min(storage.len() - start);
        for (dst, slot) in out[..count].iter_mut().zip(&storage[start..start + count]) {
            *dst = f32::from_bits(slot.load(Ordering::Relaxed));
        }
        count
    }

    /// Snapshot of the whole clip. Empty once released.
    pub fn to_vec(&self) -> Vec<f32> {
        let guard = self.samples.read();
        match guard.as_ref() {
            Some(storage) => storage
                .iter()
                .map(|slot| f32::from_bits(slot.load(Ordering::Relaxed)))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Free the sample storage. Safe to call more than once.
    pub fn release(&self) {
        if self.samples.write().take().is_some() {
            log::debug!("released clip '{}'", self.name);
        }
    }
}
