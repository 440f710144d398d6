use std::sync::Arc;

use crate::models::audio_models::AudioFormat;
use crate::processing::audio_clip::AudioClip;

/// Allocates playback clips for receive streams.
///
/// Lets an audio backend hand out clips it can attach to its output device.
pub trait ClipAllocator: Send + Sync {
    fn allocate(&self, name: &str, length_frames: usize, format: AudioFormat) -> Arc<AudioClip>;
}

/// Allocates clips on the heap.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapClipAllocator;

impl ClipAllocator for HeapClipAllocator {
    fn allocate(&self, name: &str, length_frames: usize, format: AudioFormat) -> Arc<AudioClip> {
        Arc::new(AudioClip::new(name, length_frames, format))
    }
}
