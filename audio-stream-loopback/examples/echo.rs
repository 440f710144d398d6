//! Sends a tone through the loopback engine into a second track and prints
//! both tracks' diagnostics.
//!
//! ```text
//! RUST_LOG=debug cargo run -p audio-stream-loopback --example echo
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use audio_stream_core::{AudioClip, AudioFormat, StreamConfiguration, StreamContext, StreamError, TrackDelegate};
use audio_stream_loopback::{LoopbackEngine, ToneSource};

struct Announce;

impl TrackDelegate for Announce {
    fn on_audio_received(&self, track_id: &str, clip: Arc<AudioClip>) {
        log::info!("{}: audio received, clip {} ({} frames)", track_id, clip.format(), clip.length_frames());
    }
}

fn main() -> Result<(), StreamError> {
    env_logger::init();

    let engine = Arc::new(LoopbackEngine::new()?);
    let context = StreamContext::new(engine.clone(), StreamConfiguration::default())?;

    let receiver = context.create_track()?;
    receiver.set_delegate(Arc::new(Announce));
    let sender = context.create_send_track(ToneSource::new(AudioFormat::new(48000, 2), 440.0))?;
    engine.link(sender.handle(), receiver.handle())?;

    thread::sleep(Duration::from_secs(2));

    for (label, track) in [("sender", &sender), ("receiver", &receiver)] {
        let diagnostics = serde_json::to_string_pretty(&track.diagnostics())
            .map_err(|e| StreamError::InvalidArgument(e.to_string()))?;
        println!("{} {}:\n{}", label, track.id(), diagnostics);
    }
    println!("dispatcher: {:?}", context.dispatch_stats());
    Ok(())
}
