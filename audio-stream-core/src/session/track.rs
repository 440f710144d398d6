use std::sync::{Arc, Weak};

use crate::models::audio_models::{AudioFormat, TrackDiagnostics, TrackHandle};
use crate::models::error::{Result, StreamError};
use crate::processing::audio_clip::AudioClip;
use crate::session::dispatcher::Dispatcher;
use crate::session::receive_path::ReceivePath;
use crate::session::send_path::SendPath;
use crate::traits::capture_source::{CaptureCallback, CaptureSource};
use crate::traits::track_delegate::TrackDelegate;
use crate::traits::transport_engine::{ReceiveCallback, TransportEngine};

/// Track state reachable from dispatched callbacks.
pub(crate) struct TrackShared {
    handle: TrackHandle,
    receive: ReceivePath,
}

pub(crate) type TrackDispatcher = Dispatcher<TrackShared>;

/// Everything a track needs from the context that creates it.
pub(crate) struct TrackParts {
    pub engine: Arc<dyn TransportEngine>,
    pub dispatcher: Arc<TrackDispatcher>,
    pub receive: ReceivePath,
}

/// One logical audio stream bound to a transport-engine track.
///
/// Every track can receive: decoded remote audio is marshalled through the
/// dispatcher into a ring buffer, and `TrackDelegate::on_audio_received`
/// fires when the first frame arrives. A track built with a capture source
/// also sends: each captured block is forwarded to the engine.
///
/// Dropping the track disposes it.
pub struct AudioStreamTrack {
    id: String,
    shared: Arc<TrackShared>,
    engine: Arc<dyn TransportEngine>,
    dispatcher: Arc<TrackDispatcher>,
    source: Option<Box<dyn CaptureSource>>,
    source_format: Option<AudioFormat>,
    send: Option<Arc<SendPath>>,
    disposed: bool,
}

impl AudioStreamTrack {
    /// Create the native track and hook up both directions.
    ///
    /// A source without an attached clip is rejected before the engine is
    /// touched. Any later failure disposes what was set up so far.
    pub(crate) fn open(
        id: String,
        parts: TrackParts,
        source: Option<Box<dyn CaptureSource>>,
    ) -> Result<Self> {
        let source_format = match &source {
            Some(source) => {
                let format = source.clip_format().ok_or_else(|| {
                    StreamError::InvalidArgument("audio clip must be attached to the capture source".into())
                })?;
                if !format.is_valid() {
                    return Err(StreamError::InvalidArgument(format!(
                        "capture clip has unusable format {}",
                        format
                    )));
                }
                Some(format)
            }
            None => None,
        };

        let TrackParts {
            engine,
            dispatcher,
            receive,
        } = parts;

        let handle = engine.create_track(&id)?;
        let shared = Arc::new(TrackShared { handle, receive });
        dispatcher.register(handle, &shared);

        let mut track = Self {
            id,
            shared,
            engine,
            dispatcher,
            source,
            source_format,
            send: None,
            disposed: false,
        };

        if let Err(e) = track.connect() {
            track.dispose();
            return Err(e);
        }

        log::debug!(
            "created track {} ({}){}",
            track.id,
            handle,
            track
                .source_format
                .map(|f| format!(", sending {}", f))
                .unwrap_or_default()
        );
        Ok(track)
    }

    fn connect(&mut self) -> Result<()> {
        let handle = self.shared.handle;

        // Weak, so callbacks the engine still holds do not keep the
        // dispatcher alive.
        let dispatcher: Weak<TrackDispatcher> = Arc::downgrade(&self.dispatcher);
        let on_receive: ReceiveCallback = Arc::new(
            move |handle: TrackHandle, samples: &[f32], sample_rate: u32, channels: u16, frame_count: usize| {
                let Some(dispatcher) = dispatcher.upgrade() else {
                    return;
                };
                let samples = samples.to_vec();
                dispatcher.sync(handle, move |track: Arc<TrackShared>| {
                    track.receive.on_receive(&samples, sample_rate, channels, frame_count);
                });
            },
        );
        self.engine.register_receive_callback(handle, on_receive)?;

        if let (Some(source), Some(format)) = (self.source.as_mut(), self.source_format) {
            let send = Arc::new(SendPath::new(handle, format.sample_rate, Arc::clone(&self.engine)));
            let forward = Arc::clone(&send);
            let on_capture: CaptureCallback =
                Arc::new(move |samples: &[f32], channels: u16| forward.on_capture(samples, channels));
            self.send = Some(send);
            source.start(on_capture)?;
        }
        Ok(())
    }

    /// Track identifier, also used as the native track and clip name.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn handle(&self) -> TrackHandle {
        self.shared.handle
    }

    /// Receive notifications for this track.
    pub fn set_delegate(&self, delegate: Arc<dyn TrackDelegate>) {
        self.shared.receive.set_delegate(delegate);
    }

    /// Playback clip of the receive stream, once the first frame arrived.
    pub fn renderer(&self) -> Option<Arc<AudioClip>> {
        self.shared.receive.clip()
    }

    /// Format established by the first inbound frame.
    pub fn receive_format(&self) -> Option<AudioFormat> {
        self.shared.receive.format()
    }

    /// Write cursor of the receive ring buffer, once streaming.
    pub fn receive_position(&self) -> Option<usize> {
        self.shared.receive.position()
    }

    /// The capture source this track sends from, if any.
    pub fn source(&self) -> Option<&dyn CaptureSource> {
        self.source.as_deref()
    }

    /// Format of the capture source's clip, fixed at construction.
    pub fn source_format(&self) -> Option<AudioFormat> {
        self.source_format
    }

    pub fn is_sending(&self) -> bool {
        self.send.as_ref().is_some_and(|send| send.is_active())
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn diagnostics(&self) -> TrackDiagnostics {
        let receive = &self.shared.receive;
        let mut diagnostics = TrackDiagnostics {
            received_callbacks: receive.callbacks(),
            received_frames: receive.frames(),
            skipped_blocks: receive.skipped(),
            stream_started_at: receive.started_at(),
            ..Default::default()
        };
        if let Some(send) = &self.send {
            diagnostics.sent_blocks = send.blocks();
            diagnostics.sent_samples = send.samples();
            diagnostics.send_failures = send.failures();
        }
        diagnostics
    }

    /// Release the native track, receive callback, clip storage and capture
    /// hook. Safe to call repeatedly and while callbacks are in flight:
    /// the handle stops resolving first, so queued callbacks are skipped.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        let handle = self.shared.handle;
        self.dispatcher.unregister(handle);

        if let Some(send) = &self.send {
            send.deactivate();
            if let Some(source) = self.source.as_mut() {
                if let Err(e) = source.stop() {
                    log::warn!("track {}: failed to stop capture source: {}", self.id, e);
                }
            }
        }

        self.engine.unregister_receive_callback(handle);
        self.shared.receive.close();
        self.engine.delete_track(handle);
        log::debug!("disposed track {} ({})", self.id, handle);
    }
}

impl Drop for AudioStreamTrack {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::StreamConfiguration;
    use crate::session::context::StreamContext;
    use crate::session::test_support::{MockSource, RecordingDelegate, RecordingEngine};
    use std::thread;
    use std::time::{Duration, Instant};

    fn manual_context(engine: &Arc<RecordingEngine>) -> StreamContext {
        StreamContext::manual(engine.clone(), StreamConfiguration::default()).unwrap()
    }

    #[test]
    fn receive_is_deferred_until_dispatch() {
        let engine = RecordingEngine::new();
        let context = manual_context(&engine);
        let track = context.create_track().unwrap();
        let delegate = RecordingDelegate::new();
        track.set_delegate(delegate.clone());

        assert!(engine.deliver(track.handle(), &[0.5; 480], 48000, 1));
        assert!(track.renderer().is_none());
        assert!(delegate.events().is_empty());

        assert_eq!(context.run_pending(), 1);
        let events = delegate.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, track.id());
        assert_eq!(track.receive_format(), Some(AudioFormat::new(48000, 1)));
        assert_eq!(track.receive_position(), Some(480));
        assert!(Arc::ptr_eq(&events[0].1, &track.renderer().unwrap()));
    }

    #[test]
    fn audio_received_fires_once_with_first_format() {
        let engine = RecordingEngine::new();
        let context = manual_context(&engine);
        let track = context.create_track().unwrap();
        let delegate = RecordingDelegate::new();
        track.set_delegate(delegate.clone());

        engine.deliver(track.handle(), &[0.1; 320], 16000, 2);
        engine.deliver(track.handle(), &[0.1; 320], 16000, 2);
        context.run_pending();
        engine.deliver(track.handle(), &[0.1; 320], 16000, 2);
        context.run_pending();

        let events = delegate.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].1.sample_rate(), 16000);
        assert_eq!(events[0].1.channels(), 2);
        assert_eq!(track.diagnostics().received_callbacks, 3);
        assert_eq!(track.diagnostics().received_frames, 480);
    }

    #[test]
    fn consecutive_callbacks_land_in_order() {
        let engine = RecordingEngine::new();
        let context = manual_context(&engine);
        let track = context.create_track().unwrap();

        engine.deliver(track.handle(), &[1.0, 2.0, 3.0], 8000, 1);
        engine.deliver(track.handle(), &[4.0, 5.0], 8000, 1);
        context.run_pending();

        let data = track.renderer().unwrap().to_vec();
        assert_eq!(data[..6], [1.0, 2.0, 3.0, 4.0, 5.0, 0.0]);
    }

    #[test]
    fn send_track_without_clip_fails_before_native_track() {
        let engine = RecordingEngine::new();
        let context = manual_context(&engine);

        let err = context
            .create_send_track(MockSource::without_clip())
            .err()
            .unwrap();
        assert!(matches!(err, StreamError::InvalidArgument(_)));
        assert!(engine.created().is_empty());
    }

    #[test]
    fn send_track_with_invalid_clip_format_fails() {
        let engine = RecordingEngine::new();
        let context = manual_context(&engine);

        let err = context
            .create_send_track(MockSource::new(AudioFormat::new(0, 2)))
            .err()
            .unwrap();
        assert!(matches!(err, StreamError::InvalidArgument(_)));
        assert!(engine.created().is_empty());
    }

    #[test]
    fn captured_blocks_forwarded_with_source_rate() {
        let engine = RecordingEngine::new();
        let context = manual_context(&engine);
        let source = MockSource::new(AudioFormat::new(44100, 2));
        let track = context.create_send_track(source.clone()).unwrap();

        assert!(track.is_sending());
        assert!(source.is_started());
        assert_eq!(source.starts(), 1);
        assert_eq!(track.source_format(), Some(AudioFormat::new(44100, 2)));
        assert!(track.source().is_some());
        assert!(source.emit(&[0.25; 1024], 2));

        let ingested = engine.ingested();
        assert_eq!(ingested.len(), 1);
        assert_eq!(ingested[0].handle, track.handle());
        assert_eq!(ingested[0].sample_rate, 44100);
        assert_eq!(ingested[0].sample_count, 1024);
        assert_eq!(track.diagnostics().sent_blocks, 1);
    }

    #[test]
    fn send_track_also_receives() {
        let engine = RecordingEngine::new();
        let context = manual_context(&engine);
        let track = context
            .create_send_track(MockSource::new(AudioFormat::new(48000, 1)))
            .unwrap();

        engine.deliver(track.handle(), &[0.0; 480], 48000, 1);
        context.run_pending();
        assert!(track.renderer().is_some());
    }

    #[test]
    fn dispose_is_idempotent() {
        let engine = RecordingEngine::new();
        let context = manual_context(&engine);
        let source = MockSource::new(AudioFormat::new(48000, 1));
        let mut track = context.create_send_track(source.clone()).unwrap();
        let handle = track.handle();

        engine.deliver(handle, &[0.5; 48], 48000, 1);
        context.run_pending();
        let clip = track.renderer().unwrap();

        track.dispose();
        track.dispose();

        assert!(track.is_disposed());
        assert!(!track.is_sending());
        assert_eq!(engine.deleted(), vec![handle]);
        assert!(!engine.has_callback(handle));
        assert!(clip.is_released());
        assert!(track.renderer().is_none());
        assert_eq!(source.stops(), 1);
        assert!(!source.is_started());
        assert!(!source.emit(&[0.0; 48], 1));

        drop(track);
        assert_eq!(engine.deleted(), vec![handle]);
    }

    #[test]
    fn callback_queued_before_dispose_is_skipped() {
        let engine = RecordingEngine::new();
        let context = manual_context(&engine);
        let mut track = context.create_track().unwrap();
        let delegate = RecordingDelegate::new();
        track.set_delegate(delegate.clone());

        engine.deliver(track.handle(), &[0.5; 160], 16000, 1);
        track.dispose();

        assert_eq!(context.run_pending(), 1);
        assert_eq!(context.dispatch_stats().skipped, 1);
        assert!(delegate.events().is_empty());
    }

    #[test]
    fn drop_disposes() {
        let engine = RecordingEngine::new();
        let context = manual_context(&engine);
        let handle = {
            let track = context.create_track().unwrap();
            track.handle()
        };
        assert_eq!(engine.deleted(), vec![handle]);
        assert!(!engine.deliver(handle, &[0.0; 4], 8000, 1));
    }

    #[test]
    fn failed_registration_releases_native_track() {
        let engine = RecordingEngine::new();
        engine.fail_register(true);
        let context = manual_context(&engine);

        let err = context.create_track().err().unwrap();
        assert!(matches!(err, StreamError::Transport(_)));
        let created = engine.created();
        assert_eq!(created.len(), 1);
        assert_eq!(engine.deleted(), vec![created[0].0]);
    }

    #[test]
    fn track_ids_are_unique_and_name_native_tracks() {
        let engine = RecordingEngine::new();
        let context = manual_context(&engine);
        let a = context.create_track().unwrap();
        let b = context.create_track().unwrap();

        assert_ne!(a.id(), b.id());
        let created = engine.created();
        assert_eq!(created[0].1, a.id());
        assert_eq!(created[1].1, b.id());
    }

    #[test]
    fn playback_pull_runs_alongside_dispatched_writes() {
        let engine = RecordingEngine::new();
        let context = StreamContext::new(engine.clone(), StreamConfiguration::default()).unwrap();
        let track = context.create_track().unwrap();
        let handle = track.handle();

        engine.deliver(handle, &[0.25; 160], 16000, 1);
        let start = Instant::now();
        while track.renderer().is_none() && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(2));
        }
        let clip = track.renderer().unwrap();

        let reader = thread::spawn(move || {
            let mut block = [0.0f32; 512];
            let mut offset = 0;
            for _ in 0..500 {
                assert_eq!(clip.to_vec().len(), 16000);
                let read = clip.read_frames(offset, &mut block);
                assert_eq!(read, block.len().min(16000 - offset));
                offset = (offset + read) % 16000;
            }
        });

        for _ in 0..300 {
            engine.deliver(handle, &[0.5; 333], 16000, 1);
        }
        reader.join().unwrap();

        let start = Instant::now();
        while track.diagnostics().received_callbacks < 301 && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(track.diagnostics().received_frames, 160 + 300 * 333);
        assert_eq!(track.receive_position(), Some((160 + 300 * 333) % 16000));
    }

    #[test]
    fn threaded_context_delivers_off_engine_thread() {
        let engine = RecordingEngine::new();
        let context = StreamContext::new(engine.clone(), StreamConfiguration::default()).unwrap();
        let track = context.create_track().unwrap();
        let handle = track.handle();

        let native = {
            let engine = engine.clone();
            thread::spawn(move || {
                for _ in 0..10 {
                    engine.deliver(handle, &[0.5; 441], 44100, 1);
                }
            })
        };
        native.join().unwrap();

        let start = Instant::now();
        while track.diagnostics().received_callbacks < 10 && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(track.diagnostics().received_frames, 4410);
        assert_eq!(track.receive_position(), Some(4410));
    }
}
