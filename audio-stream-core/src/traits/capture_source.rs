use std::sync::Arc;

use crate::models::audio_models::AudioFormat;
use crate::models::error::Result;

/// Callback invoked when the capture device has a block ready.
///
/// Parameters:
/// - `samples`: Interleaved f32 samples, fixed device block size.
/// - `channels`: Number of interleaved channels.
pub type CaptureCallback = Arc<dyn Fn(&[f32], u16) + Send + Sync + 'static>;

/// Audio source whose output is captured and sent over the transport.
pub trait CaptureSource: Send {
    /// Format of the clip attached to this source, or `None` when no clip
    /// is attached. A send track cannot be built from a source without one.
    fn clip_format(&self) -> Option<AudioFormat>;

    /// Start delivering blocks via `callback`.
    ///
    /// The callback fires on the device's audio thread.
    fn start(&mut self, callback: CaptureCallback) -> Result<()>;

    /// Stop delivering blocks and drop the callback.
    fn stop(&mut self) -> Result<()>;
}
