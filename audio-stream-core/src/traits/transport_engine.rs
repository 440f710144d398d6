use std::sync::Arc;

use crate::models::audio_models::TrackHandle;
use crate::models::error::Result;

/// Callback invoked by the transport engine when decoded remote audio arrives.
///
/// Parameters:
/// - `handle`: The native track the audio belongs to.
/// - `samples`: Interleaved f32 samples, engine-determined block size.
/// - `sample_rate`: Sample rate of the delivered audio.
/// - `channels`: Number of interleaved channels.
/// - `frame_count`: Number of frames in `samples`.
///
/// Fires on the engine's own thread. Must return quickly.
pub type ReceiveCallback =
    Arc<dyn Fn(TrackHandle, &[f32], u32, u16, usize) + Send + Sync + 'static>;

/// Media-transport engine that owns the native track objects.
///
/// Encoding, decoding and transmission all live behind this seam.
pub trait TransportEngine: Send + Sync {
    /// Create a native audio track and return its handle.
    fn create_track(&self, name: &str) -> Result<TrackHandle>;

    /// Destroy a native track. Unknown handles are ignored.
    fn delete_track(&self, handle: TrackHandle);

    /// Start delivering decoded audio for `handle` to `callback`.
    fn register_receive_callback(
        &self,
        handle: TrackHandle,
        callback: ReceiveCallback,
    ) -> Result<()>;

    /// Stop delivering decoded audio for `handle`.
    fn unregister_receive_callback(&self, handle: TrackHandle);

    /// Submit a captured block for encoding. `sample_count` is `samples.len()`.
    fn ingest_captured_audio(
        &self,
        handle: TrackHandle,
        samples: &[f32],
        sample_rate: u32,
        channels: u16,
        sample_count: usize,
    ) -> Result<()>;
}
