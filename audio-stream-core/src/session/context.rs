use std::sync::Arc;

use uuid::Uuid;

use crate::models::audio_models::DispatchStats;
use crate::models::config::StreamConfiguration;
use crate::models::error::{Result, StreamError};
use crate::session::dispatcher::Dispatcher;
use crate::session::receive_path::ReceivePath;
use crate::session::track::{AudioStreamTrack, TrackDispatcher, TrackParts};
use crate::traits::capture_source::CaptureSource;
use crate::traits::clip_allocator::{ClipAllocator, HeapClipAllocator};
use crate::traits::transport_engine::TransportEngine;

/// Factory for tracks bound to one transport engine.
///
/// Owns the dispatcher that marshals engine callbacks, so every track
/// created from the same context shares one execution context and one
/// FIFO order.
///
/// ```rust,ignore
/// let context = StreamContext::new(engine, StreamConfiguration::default())?;
/// let track = context.create_send_track(microphone)?;
/// track.set_delegate(player);
/// ```
pub struct StreamContext {
    engine: Arc<dyn TransportEngine>,
    dispatcher: Arc<TrackDispatcher>,
    allocator: Arc<dyn ClipAllocator>,
    config: StreamConfiguration,
}

impl StreamContext {
    /// Context whose callbacks run on a dedicated dispatcher thread.
    pub fn new(engine: Arc<dyn TransportEngine>, config: StreamConfiguration) -> Result<Self> {
        config.validate().map_err(StreamError::InvalidConfiguration)?;
        let dispatcher = Dispatcher::spawn(&config.dispatcher_thread_name)?;
        Ok(Self::assemble(engine, dispatcher, config))
    }

    /// Context whose callbacks run only when the host calls `run_pending`,
    /// e.g. once per frame of its own main loop.
    pub fn manual(engine: Arc<dyn TransportEngine>, config: StreamConfiguration) -> Result<Self> {
        config.validate().map_err(StreamError::InvalidConfiguration)?;
        Ok(Self::assemble(engine, Dispatcher::manual(), config))
    }

    fn assemble(
        engine: Arc<dyn TransportEngine>,
        dispatcher: TrackDispatcher,
        config: StreamConfiguration,
    ) -> Self {
        Self {
            engine,
            dispatcher: Arc::new(dispatcher),
            allocator: Arc::new(HeapClipAllocator),
            config,
        }
    }

    /// Replace the allocator used for receive clips of tracks created later.
    pub fn with_allocator(mut self, allocator: Arc<dyn ClipAllocator>) -> Self {
        self.allocator = allocator;
        self
    }

    /// Receive-only track.
    pub fn create_track(&self) -> Result<AudioStreamTrack> {
        self.open(None)
    }

    /// Track that sends what `source` captures and receives like any other.
    ///
    /// Fails with `InvalidArgument` if the source has no clip attached.
    pub fn create_send_track<S>(&self, source: S) -> Result<AudioStreamTrack>
    where
        S: CaptureSource + 'static,
    {
        self.open(Some(Box::new(source)))
    }

    fn open(&self, source: Option<Box<dyn CaptureSource>>) -> Result<AudioStreamTrack> {
        let id = Uuid::new_v4().to_string();
        let receive = ReceivePath::new(
            &id,
            Arc::clone(&self.allocator),
            self.config.buffer_length_secs,
            self.config.validate_frame_count,
        );
        let parts = TrackParts {
            engine: Arc::clone(&self.engine),
            dispatcher: Arc::clone(&self.dispatcher),
            receive,
        };
        AudioStreamTrack::open(id, parts, source)
    }

    /// Run queued callbacks on the calling thread. Returns how many were
    /// taken off the queue, skipped ones included.
    pub fn run_pending(&self) -> usize {
        self.dispatcher.run_pending()
    }

    /// Callbacks waiting to run.
    pub fn pending(&self) -> usize {
        self.dispatcher.pending()
    }

    pub fn is_threaded(&self) -> bool {
        self.dispatcher.is_threaded()
    }

    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    pub fn config(&self) -> &StreamConfiguration {
        &self.config
    }

    /// Stop the dispatcher thread after flushing the queue. Tracks stay
    /// valid but their receive callbacks no longer run unless the host
    /// calls `run_pending`.
    pub fn shutdown(&self) {
        self.dispatcher.shutdown();
    }
}
