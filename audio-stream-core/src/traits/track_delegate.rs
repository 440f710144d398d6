use std::sync::Arc;

use crate::processing::audio_clip::AudioClip;

/// Application-facing notifications for a track.
///
/// Called from the dispatcher's execution context, never from the engine
/// thread directly.
pub trait TrackDelegate: Send + Sync {
    /// The first inbound frame arrived and the playback clip now exists.
    ///
    /// Fires exactly once per track. `clip` carries the sample rate and
    /// channel count of that first frame.
    fn on_audio_received(&self, track_id: &str, clip: Arc<AudioClip>);
}
