use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use crate::models::audio_models::AudioFormat;
use crate::models::state::{ReceiveState, ReceiveStreamState};
use crate::processing::audio_clip::AudioClip;
use crate::processing::ring_buffer::RingAudioBuffer;
use crate::traits::clip_allocator::ClipAllocator;
use crate::traits::track_delegate::TrackDelegate;

/// Receive side of a track: decoded remote audio → ring buffer → clip.
///
/// `on_receive` must only be called from the dispatcher's execution context.
/// The internal locks are uncontended there; they exist so the playback side
/// can ask for the clip from other threads.
pub struct ReceivePath {
    name: String,
    allocator: Arc<dyn ClipAllocator>,
    buffer_length_secs: u32,
    validate_frame_count: bool,
    state: Mutex<ReceiveState>,
    delegate: Mutex<Option<Arc<dyn TrackDelegate>>>,
    callbacks: AtomicU64,
    frames: AtomicU64,
    skipped: AtomicU64,
}

impl ReceivePath {
    pub fn new(
        name: &str,
        allocator: Arc<dyn ClipAllocator>,
        buffer_length_secs: u32,
        validate_frame_count: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            allocator,
            buffer_length_secs,
            validate_frame_count,
            state: Mutex::new(ReceiveState::Uninitialized),
            delegate: Mutex::new(None),
            callbacks: AtomicU64::new(0),
            frames: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    pub fn set_delegate(&self, delegate: Arc<dyn TrackDelegate>) {
        *self.delegate.lock() = Some(delegate);
    }

    /// Handle one inbound block.
    ///
    /// The first valid block fixes the stream format, allocates the ring
    /// buffer and fires `on_audio_received`; every block, the first included,
    /// is then written. Malformed blocks are logged and skipped. Returns the
    /// number of frames written.
    pub fn on_receive(
        &self,
        samples: &[f32],
        sample_rate: u32,
        channels: u16,
        frame_count: usize,
    ) -> usize {
        self.callbacks.fetch_add(1, Ordering::Relaxed);

        let format = AudioFormat::new(sample_rate, channels);
        if !format.is_valid() {
            log::warn!("{}: dropping block with invalid format {}", self.name, format);
            self.skipped.fetch_add(1, Ordering::Relaxed);
            return 0;
        }
        if self.validate_frame_count && format.frames_in(samples.len()) != frame_count {
            log::warn!(
                "{}: dropping block of {} samples reporting {} frames at {} channels",
                self.name,
                samples.len(),
                frame_count,
                channels
            );
            self.skipped.fetch_add(1, Ordering::Relaxed);
            return 0;
        }

        // Notify outside the state lock so the delegate may call back into
        // the track (e.g. to fetch the renderer clip).
        if let Some(clip) = self.begin(format) {
            let delegate = self.delegate.lock().clone();
            if let Some(delegate) = delegate {
                delegate.on_audio_received(&self.name, clip);
            }
        }

        let written = match &mut *self.state.lock() {
            ReceiveState::Streaming(stream) => stream.buffer.write(samples, channels),
            ReceiveState::Uninitialized | ReceiveState::Closed => return 0,
        };
        if written == 0 && !samples.is_empty() {
            self.skipped.fetch_add(1, Ordering::Relaxed);
        }
        self.frames.fetch_add(written as u64, Ordering::Relaxed);
        written
    }

    /// Transition `uninitialized → streaming`. Returns the new clip only on
    /// the call that performed the transition.
    fn begin(&self, format: AudioFormat) -> Option<Arc<AudioClip>> {
        let mut state = self.state.lock();
        if !state.is_uninitialized() {
            return None;
        }

        let buffer = RingAudioBuffer::with_length(
            self.allocator.as_ref(),
            &self.name,
            format,
            self.buffer_length_secs,
        );
        let clip = buffer.clip();
        *state = ReceiveState::Streaming(Box::new(ReceiveStreamState {
            format,
            buffer,
            started_at: Utc::now(),
        }));
        log::debug!("{}: receive stream started at {}", self.name, format);
        Some(clip)
    }

    /// The playback clip, once the first frame has arrived.
    pub fn clip(&self) -> Option<Arc<AudioClip>> {
        self.state.lock().clip()
    }

    pub fn format(&self) -> Option<AudioFormat> {
        self.state.lock().format()
    }

    /// Current write cursor, once streaming.
    pub fn position(&self) -> Option<usize> {
        match &*self.state.lock() {
            ReceiveState::Streaming(stream) => Some(stream.buffer.position()),
            _ => None,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.state.lock().is_streaming()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().is_closed()
    }

    pub fn started_at(&self) -> Option<String> {
        match &*self.state.lock() {
            ReceiveState::Streaming(stream) => Some(stream.started_at.to_rfc3339()),
            _ => None,
        }
    }

    pub fn callbacks(&self) -> u64 {
        self.callbacks.load(Ordering::Relaxed)
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Enter `closed` and release the buffer storage. Idempotent.
    pub fn close(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), ReceiveState::Closed);
        if let ReceiveState::Streaming(stream) = previous {
            stream.buffer.dispose();
        }
        self.delegate.lock().take();
    }
}
