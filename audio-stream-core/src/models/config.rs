use serde::{Deserialize, Serialize};

use super::error::StreamError;

/// Configuration shared by every track created from a `StreamContext`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfiguration {
    /// Length of each receive ring buffer in seconds (default: 1).
    pub buffer_length_secs: u32,

    /// Name of the dispatcher drain thread when spawned (default: "audio-stream-sync").
    pub dispatcher_thread_name: String,

    /// Skip inbound blocks whose reported frame count disagrees with their
    /// sample count (default: true). When off, the frame count is derived
    /// from the samples alone.
    pub validate_frame_count: bool,
}

impl StreamConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.buffer_length_secs == 0 {
            return Err("buffer length must be at least one second".into());
        }
        if self.dispatcher_thread_name.trim().is_empty() {
            return Err("dispatcher thread name must not be empty".into());
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, StreamError> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            StreamError::InvalidConfiguration(format!("failed to parse configuration: {}", e))
        })?;
        config.validate().map_err(StreamError::InvalidConfiguration)?;
        Ok(config)
    }
}

impl Default for StreamConfiguration {
    fn default() -> Self {
        Self {
            buffer_length_secs: 1,
            dispatcher_thread_name: "audio-stream-sync".into(),
            validate_frame_count: true,
        }
    }
}
