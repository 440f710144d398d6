use std::sync::Arc;

use crate::models::audio_models::AudioFormat;
use crate::processing::audio_clip::AudioClip;
use crate::traits::clip_allocator::{ClipAllocator, HeapClipAllocator};

/// Fixed-capacity circular writer over a playback clip.
///
/// Absorbs inbound blocks of any size and lays them into the clip at a
/// wrapping cursor. Nothing is dequeued: playback devices read the clip
/// directly at their own cadence.
///
/// Single writer. The owning track serializes every `write` through its
/// dispatcher, so no locking happens here.
#[derive(Debug)]
pub struct RingAudioBuffer {
    clip: Arc<AudioClip>,
    capacity: usize,
    channels: u16,
    position: usize,
}

impl RingAudioBuffer {
    /// One second of audio at `sample_rate`, heap allocated.
    pub fn create(name: &str, sample_rate: u32, channels: u16) -> Self {
        Self::with_length(&HeapClipAllocator, name, AudioFormat::new(sample_rate, channels), 1)
    }

    /// `seconds` seconds of audio in a clip obtained from `allocator`.
    pub fn with_length(
        allocator: &dyn ClipAllocator,
        name: &str,
        format: AudioFormat,
        seconds: u32,
    ) -> Self {
        let capacity = format.sample_rate as usize * seconds as usize;
        let clip = allocator.allocate(name, capacity, format);
        Self {
            clip,
            capacity,
            channels: format.channels,
            position: 0,
        }
    }

    /// Write interleaved samples at the cursor, wrapping at the end.
    ///
    /// A block longer than the space left fills to the end, wraps to zero and
    /// continues; blocks longer than the whole buffer wrap as often as needed.
    /// Trailing samples that do not make a whole frame are ignored.
    ///
    /// Returns the number of frames written.
    pub fn write(&mut self, samples: &[f32], channels: u16) -> usize {
        if channels != self.channels {
            log::warn!(
                "clip '{}': dropping block with {} channels, stream has {}",
                self.clip.name(),
                channels,
                self.channels
            );
            return 0;
        }
        if self.capacity == 0 || channels == 0 {
            return 0;
        }

        let channels = channels as usize;
        let frames = samples.len() / channels;
        let mut written = 0;

        while written < frames {
            let remaining = self.capacity - self.position;
            let length = (frames - written).min(remaining);
            let chunk = &samples[written * channels..(written + length) * channels];

            self.clip.write_frames(self.position, chunk);
            self.position += length;
            written += length;

            if self.position == self.capacity {
                self.position = 0;
            }
        }
        written
    }

    /// Snapshot of the full buffer as currently materialized.
    pub fn read(&self) -> Vec<f32> {
        self.clip.to_vec()
    }

    /// Copy frames starting at `offset_frames` into `out`, for device pulls.
    pub fn read_frames(&self, offset_frames: usize, out: &mut [f32]) -> usize {
        self.clip.read_frames(offset_frames, out)
    }

    /// Next frame index to be overwritten.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Capacity in frames.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn format(&self) -> AudioFormat {
        self.clip.format()
    }

    /// The playback clip this buffer writes into.
    pub fn clip(&self) -> Arc<AudioClip> {
        Arc::clone(&self.clip)
    }

    /// Release the clip storage. Consumes the buffer so no write can follow.
    pub fn dispose(self) {
        self.clip.release();
    }
}
