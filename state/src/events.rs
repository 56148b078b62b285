//! The "state changed" event source.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Zero-argument change notification, emitted once per scheduled batch.
///
/// Listeners run in subscription order. A listener subscribed during an
/// emission first runs on the next one. A panicking listener propagates out of
/// [`emit`](Self::emit) and later listeners miss that batch.
#[derive(Default)]
pub struct ChangeEvents {
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
    emitted: AtomicU64,
}

impl ChangeEvents {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(listener)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn emit(&self) {
        let snapshot: Vec<Listener> = self
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        let batch = self.emitted.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(batch, listeners = snapshot.len(), "state change emitted");
        for listener in snapshot {
            listener();
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    /// Number of emissions so far.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(ListenerId, Listener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ChangeEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeEvents")
            .field("listeners", &self.listener_count())
            .field("emitted", &self.emitted())
            .finish()
    }
}
