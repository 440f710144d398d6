use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::models::audio_models::{DispatchStats, TrackHandle};
use crate::models::error::{Result, StreamError};
use crate::session::registry::TrackRegistry;

type Action<T> = Box<dyn FnOnce(Arc<T>) + Send + 'static>;

struct Job<T> {
    handle: TrackHandle,
    action: Action<T>,
}

struct Shared<T> {
    registry: TrackRegistry<T>,
    queue: Mutex<VecDeque<Job<T>>>,
    ready: Condvar,
    // Held for the whole of a drain pass so passes never overlap.
    drain: Mutex<()>,
    running: AtomicBool,
    enqueued: AtomicU64,
    executed: AtomicU64,
    skipped: AtomicU64,
}

impl<T> Shared<T> {
    /// Run queued jobs in FIFO order until the queue is empty.
    ///
    /// Returns `None` without draining if another pass is already in
    /// progress, including a pass further up this thread's stack. That pass
    /// picks up anything enqueued meanwhile.
    fn drain(&self) -> Option<usize> {
        let _pass = self.drain.try_lock()?;

        let mut processed = 0;
        loop {
            // The queue lock is released before the action runs, so actions
            // (and native threads) can keep enqueueing.
            let job = self.queue.lock().pop_front();
            let Some(job) = job else {
                break;
            };
            self.execute(job);
            processed += 1;
        }
        Some(processed)
    }

    fn execute(&self, job: Job<T>) {
        match self.registry.resolve(job.handle) {
            Some(track) => {
                (job.action)(track);
                self.executed.fetch_add(1, Ordering::Release);
            }
            None => {
                log::trace!("{} no longer registered, dropping dispatched action", job.handle);
                self.skipped.fetch_add(1, Ordering::Release);
            }
        }
    }
}

/// Serializes native-thread callbacks onto one execution context.
///
/// `sync(handle, action)` queues an action from any thread. Actions run
/// strictly in enqueue order, one at a time, either on a dedicated drain
/// thread (`spawn`) or on whichever thread the host uses to call
/// `run_pending` (`manual`). Before running, the handle is resolved against
/// the registry; an action whose track was disposed in the meantime is
/// dropped silently.
///
/// Everything that mutates per-track receive state goes through here, which
/// is what lets `RingAudioBuffer` stay lock-free.
pub struct Dispatcher<T> {
    shared: Arc<Shared<T>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl<T: Send + Sync + 'static> Dispatcher<T> {
    /// Dispatcher drained by the host calling `run_pending`.
    pub fn manual() -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: TrackRegistry::new(),
                queue: Mutex::new(VecDeque::new()),
                ready: Condvar::new(),
                drain: Mutex::new(()),
                running: AtomicBool::new(false),
                enqueued: AtomicU64::new(0),
                executed: AtomicU64::new(0),
                skipped: AtomicU64::new(0),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Dispatcher drained by a dedicated thread named `thread_name`.
    pub fn spawn(thread_name: &str) -> Result<Self> {
        let dispatcher = Self::manual();
        dispatcher.shared.running.store(true, Ordering::SeqCst);

        let shared = Arc::clone(&dispatcher.shared);
        let handle = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                while shared.running.load(Ordering::SeqCst) {
                    {
                        let mut queue = shared.queue.lock();
                        if queue.is_empty() {
                            shared.ready.wait_for(&mut queue, Duration::from_millis(100));
                        }
                    }
                    if shared.drain().is_none() {
                        // A host `run_pending` pass owns the queue; wait for it
                        // rather than spin. Bounded: that pass may be joining us.
                        let _pass = shared.drain.try_lock_for(Duration::from_millis(10));
                    }
                }
                // Flush whatever was queued before shutdown. If a host pass is
                // still running, it takes the rest.
                let _ = shared.drain();
            })
            .map_err(|e| {
                StreamError::Dispatcher(format!("failed to spawn dispatcher thread: {}", e))
            })?;

        *dispatcher.worker.lock() = Some(handle);
        log::debug!("dispatcher thread '{}' started", thread_name);
        Ok(dispatcher)
    }

    /// Queue `action` to run against the track registered under `handle`.
    ///
    /// Never blocks beyond the queue push; safe from native callback threads.
    pub fn sync<F>(&self, handle: TrackHandle, action: F)
    where
        F: FnOnce(Arc<T>) + Send + 'static,
    {
        {
            let mut queue = self.shared.queue.lock();
            // Counted before the push so `executed` never overtakes it.
            self.shared.enqueued.fetch_add(1, Ordering::Relaxed);
            queue.push_back(Job {
                handle,
                action: Box::new(action),
            });
        }
        self.shared.ready.notify_one();
    }

    /// Drain the queue on the calling thread. Returns how many jobs were
    /// processed (executed or skipped).
    pub fn run_pending(&self) -> usize {
        self.shared.drain().unwrap_or(0)
    }

    pub fn register(&self, handle: TrackHandle, track: &Arc<T>) {
        self.shared.registry.insert(handle, track);
    }

    /// Stop resolving `handle`. Queued actions for it will be skipped.
    pub fn unregister(&self, handle: TrackHandle) -> bool {
        self.shared.registry.remove(handle)
    }

    pub fn resolve(&self, handle: TrackHandle) -> Option<Arc<T>> {
        self.shared.registry.resolve(handle)
    }

    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }

    pub fn is_threaded(&self) -> bool {
        self.worker.lock().is_some()
    }

    pub fn stats(&self) -> DispatchStats {
        // Completions first: a job is always counted as enqueued before it
        // can be counted as executed or skipped.
        let skipped = self.shared.skipped.load(Ordering::SeqCst);
        let executed = self.shared.executed.load(Ordering::SeqCst);
        DispatchStats {
            enqueued: self.shared.enqueued.load(Ordering::SeqCst),
            executed,
            skipped,
        }
    }
}

impl<T> Dispatcher<T> {
    /// Stop the drain thread after it flushes the queue. No-op for manual
    /// dispatchers and on repeated calls.
    pub fn shutdown(&self) {
        let Some(handle) = self.worker.lock().take() else {
            return;
        };
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.ready.notify_all();
        if handle.thread().id() == thread::current().id() {
            // Shutdown requested from inside a dispatched action.
            return;
        }
        if handle.join().is_err() {
            log::error!("dispatcher thread panicked");
        }
    }
}

impl<T> Drop for Dispatcher<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
