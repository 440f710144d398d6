use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a transport-engine track object.
///
/// Handed out by `TransportEngine::create_track` and echoed back on every
/// native callback so the callback can be routed to its track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackHandle(pub u64);

impl fmt::Display for TrackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track#{}", self.0)
    }
}

/// Sample rate and channel layout of a stream. Fixed for a stream's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.sample_rate > 0 && self.channels > 0
    }

    /// Number of whole frames contained in `sample_count` interleaved samples.
    pub fn frames_in(&self, sample_count: usize) -> usize {
        if self.channels == 0 {
            return 0;
        }
        sample_count / self.channels as usize
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz / {} ch", self.sample_rate, self.channels)
    }
}

/// Per-track counters for debugging stream flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDiagnostics {
    pub received_callbacks: u64,
    pub received_frames: u64,
    pub skipped_blocks: u64,
    pub sent_blocks: u64,
    pub sent_samples: u64,
    pub send_failures: u64,
    /// RFC 3339 timestamp of the first inbound frame.
    pub stream_started_at: Option<String>,
}

/// Dispatcher queue counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    pub enqueued: u64,
    pub executed: u64,
    /// Actions dropped because their handle no longer resolved.
    pub skipped: u64,
}

impl DispatchStats {
    /// Actions enqueued but not yet run or skipped. The counters are read
    /// one at a time, so a snapshot taken mid-drain never goes below zero.
    pub fn pending(&self) -> u64 {
        self.enqueued
            .saturating_sub(self.executed)
            .saturating_sub(self.skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_in_ignores_partial_frame() {
        let stereo = AudioFormat::new(48000, 2);
        assert_eq!(stereo.frames_in(960), 480);
        assert_eq!(stereo.frames_in(961), 480);
        assert_eq!(AudioFormat::new(48000, 0).frames_in(10), 0);
    }

    #[test]
    fn validity() {
        assert!(AudioFormat::new(8000, 1).is_valid());
        assert!(!AudioFormat::new(0, 1).is_valid());
        assert!(!AudioFormat::new(8000, 0).is_valid());
    }

    #[test]
    fn pending_never_underflows() {
        let stats = DispatchStats {
            enqueued: 3,
            executed: 4,
            skipped: 1,
        };
        assert_eq!(stats.pending(), 0);

        let stats = DispatchStats {
            enqueued: 10,
            executed: 6,
            skipped: 1,
        };
        assert_eq!(stats.pending(), 3);
    }

    #[test]
    fn diagnostics_serialize_as_json() {
        let diagnostics = TrackDiagnostics {
            received_callbacks: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(&diagnostics).unwrap();
        assert_eq!(json["received_callbacks"], 3);
        assert!(json["stream_started_at"].is_null());
    }
}
