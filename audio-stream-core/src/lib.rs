//! # audio-stream-core
//!
//! Engine-agnostic core of a bidirectional audio stream track.
//!
//! Each track binds one native transport-engine track to a ring-buffered
//! playback clip (receive side) and, optionally, a capture source (send
//! side). Engine callbacks arrive on arbitrary threads; the dispatcher
//! marshals them into one serial execution context and skips those whose
//! track was disposed in the meantime.
//!
//! Transport backends implement `TransportEngine`; capture backends
//! implement `CaptureSource`.
//!
//! ## Architecture
//!
//! ```text
//! audio-stream-core (this crate)
//! ├── traits/       ← TransportEngine, CaptureSource, TrackDelegate, ClipAllocator
//! ├── models/       ← StreamError, StreamConfiguration, AudioFormat, ReceiveState, etc.
//! ├── processing/   ← AudioClip, RingAudioBuffer
//! └── session/      ← StreamContext, AudioStreamTrack, Dispatcher, receive/send paths
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioFormat, DispatchStats, TrackDiagnostics, TrackHandle};
pub use models::config::StreamConfiguration;
pub use models::error::StreamError;
pub use models::state::ReceiveState;
pub use processing::audio_clip::AudioClip;
pub use processing::ring_buffer::RingAudioBuffer;
pub use session::context::StreamContext;
pub use session::dispatcher::Dispatcher;
pub use session::registry::TrackRegistry;
pub use session::track::AudioStreamTrack;
pub use traits::capture_source::{CaptureCallback, CaptureSource};
pub use traits::clip_allocator::{ClipAllocator, HeapClipAllocator};
pub use traits::track_delegate::TrackDelegate;
pub use traits::transport_engine::{ReceiveCallback, TransportEngine};
