use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::audio_models::AudioFormat;
use crate::processing::audio_clip::AudioClip;
use crate::processing::ring_buffer::RingAudioBuffer;

/// Stream parameters and buffer, established by the first inbound frame.
#[derive(Debug)]
pub struct ReceiveStreamState {
    pub format: AudioFormat,
    pub buffer: RingAudioBuffer,
    pub started_at: DateTime<Utc>,
}

/// Receive-side state machine.
///
/// State transitions:
/// ```text
/// uninitialized → streaming → closed
///       └──────────────────────↗
/// ```
/// `streaming` is entered once, on the first inbound frame. `closed` is
/// entered only by disposal and is terminal.
#[derive(Debug, Default)]
pub enum ReceiveState {
    #[default]
    Uninitialized,
    Streaming(Box<ReceiveStreamState>),
    Closed,
}

impl ReceiveState {
    pub fn is_uninitialized(&self) -> bool {
        matches!(self, Self::Uninitialized)
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Format of the established stream, if streaming.
    pub fn format(&self) -> Option<AudioFormat> {
        match self {
            Self::Streaming(stream) => Some(stream.format),
            _ => None,
        }
    }

    /// Playback clip of the established stream, if streaming.
    pub fn clip(&self) -> Option<Arc<AudioClip>> {
        match self {
            Self::Streaming(stream) => Some(stream.buffer.clip()),
            _ => None,
        }
    }
}
