//! Coalescing change scheduler.
//!
//! The host supplies the tick primitive through [`Ticker`]. [`FrameClock`] is
//! the bundled one: a render loop calls [`FrameClock::tick`] once per frame.

use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub type FrameCallback = Box<dyn FnOnce() + Send>;

/// A host tick primitive: runs a callback once, on the next frame.
pub trait Ticker: Send + Sync {
    fn request_frame(&self, callback: FrameCallback);
}

/// Frame-driven [`Ticker`].
///
/// Callbacks requested while a tick is running are deferred to the next tick.
#[derive(Default)]
pub struct FrameClock {
    queue: Mutex<Vec<FrameCallback>>,
    frames: AtomicU64,
}

impl FrameClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every callback queued before this call and returns how many ran.
    pub fn tick(&self) -> usize {
        let due = mem::take(&mut *self.queue.lock().unwrap_or_else(PoisonError::into_inner));
        self.frames.fetch_add(1, Ordering::Relaxed);
        let ran = due.len();
        for callback in due {
            callback();
        }
        ran
    }

    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of ticks run so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

impl Ticker for FrameClock {
    fn request_frame(&self, callback: FrameCallback) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }
}

impl fmt::Debug for FrameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameClock")
            .field("queued", &self.queued())
            .field("frames", &self.frames())
            .finish()
    }
}

struct SchedulerInner {
    pending: AtomicBool,
    ticker: Option<Arc<dyn Ticker>>,
    callback: Box<dyn Fn() + Send + Sync>,
}

impl SchedulerInner {
    fn fire(&self) {
        // Cleared before the callback so a write made by a listener starts a new batch.
        if !self.pending.swap(false, Ordering::AcqRel) {
            return;
        }
        (self.callback)();
    }
}

/// Collapses any number of [`schedule`](Self::schedule) calls made before the
/// next tick into one callback invocation.
#[derive(Clone)]
pub struct ChangeScheduler {
    inner: Arc<SchedulerInner>,
}

impl ChangeScheduler {
    /// Without a ticker the callback runs synchronously inside `schedule`.
    pub fn new(
        ticker: Option<Arc<dyn Ticker>>,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                pending: AtomicBool::new(false),
                ticker,
                callback: Box::new(callback),
            }),
        }
    }

    pub fn immediate(callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self::new(None, callback)
    }

    pub fn schedule(&self) {
        if self.inner.pending.swap(true, Ordering::AcqRel) {
            return;
        }
        match &self.inner.ticker {
            Some(ticker) => {
                let inner = Arc::clone(&self.inner);
                ticker.request_frame(Box::new(move || inner.fire()));
            }
            None => self.inner.fire(),
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Runs a pending batch now. The already requested frame then finds
    /// nothing pending and does nothing.
    pub fn flush(&self) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.inner.fire();
        true
    }
}

impl fmt::Debug for ChangeScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeScheduler")
            .field("pending", &self.is_pending())
            .field("ticked", &self.inner.ticker.is_some())
            .finish()
    }
}
