//! # audio-stream-loopback
//!
//! In-process backend for audio-stream-core.
//!
//! Provides:
//! - `LoopbackEngine` — Transport engine routing ingested audio to a linked track
//! - `ToneSource` — Capture source generating a sine tone
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use audio_stream_core::{AudioFormat, StreamConfiguration, StreamContext};
//! use audio_stream_loopback::{LoopbackEngine, ToneSource};
//!
//! let engine = Arc::new(LoopbackEngine::new()?);
//! let context = StreamContext::new(engine.clone(), StreamConfiguration::default())?;
//! let sender = context.create_send_track(ToneSource::new(AudioFormat::new(48000, 1), 440.0))?;
//! let receiver = context.create_track()?;
//! engine.link(sender.handle(), receiver.handle())?;
//! ```

pub mod engine;
pub mod tone;

pub use engine::LoopbackEngine;
pub use tone::ToneSource;
