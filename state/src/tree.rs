//! The process-wide state tree.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use strata_types::{Path, PathError, Value};

use crate::events::{ChangeEvents, ListenerId};
use crate::node::PathNode;
use crate::scheduler::{ChangeScheduler, FrameClock, Ticker};

struct TreeInner {
    root_key: String,
    state: RwLock<Value>,
    revision: AtomicU64,
    scheduler: ChangeScheduler,
    events: Arc<ChangeEvents>,
}

/// One immutable tree rooted under a single top-level key.
///
/// Every write swaps the whole tree reference and schedules (never fires) a
/// change notification. Cloning a `StateTree` yields another handle to the same
/// tree; construct a fresh one for an isolated instance.
#[derive(Clone)]
pub struct StateTree {
    inner: Arc<TreeInner>,
}

impl StateTree {
    /// Without a ticker, every write notifies synchronously.
    pub fn new(root_key: impl Into<String>, ticker: Option<Arc<dyn Ticker>>) -> Self {
        let root_key = root_key.into();
        let events = Arc::new(ChangeEvents::new());
        let emitter = Arc::clone(&events);
        let scheduler = ChangeScheduler::new(ticker, move || emitter.emit());
        Self {
            inner: Arc::new(TreeInner {
                state: RwLock::new(initial_state(&root_key)),
                root_key,
                revision: AtomicU64::new(0),
                scheduler,
                events,
            }),
        }
    }

    pub fn immediate(root_key: impl Into<String>) -> Self {
        Self::new(root_key, None)
    }

    pub fn with_frame_clock(root_key: impl Into<String>, clock: &Arc<FrameClock>) -> Self {
        let ticker: Arc<dyn Ticker> = clock.clone();
        Self::new(root_key, Some(ticker))
    }

    #[must_use]
    pub fn root_key(&self) -> &str {
        &self.inner.root_key
    }

    /// The current tree. O(1): the snapshot shares storage with the live tree.
    #[must_use]
    pub fn get_state(&self) -> Value {
        self.read().clone()
    }

    pub fn update_state(&self, new_tree: Value) {
        *self.write() = new_tree;
        self.committed();
    }

    /// Restores `{ <root_key>: {} }`.
    pub fn reset(&self) {
        self.update_state(initial_state(&self.inner.root_key));
    }

    /// Bumped on every committed write.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::Acquire)
    }

    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
        self.inner.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.events.unsubscribe(id)
    }

    #[must_use]
    pub fn has_pending_change(&self) -> bool {
        self.inner.scheduler.is_pending()
    }

    /// Emits a pending batch without waiting for the next tick.
    pub fn flush_now(&self) -> bool {
        self.inner.scheduler.flush()
    }

    /// A view over the whole tree below the root key.
    #[must_use]
    pub fn root(&self) -> PathNode {
        PathNode::new(self, Path::root(), Value::map())
    }

    #[must_use]
    pub fn node(&self, path: impl Into<Path>, default: Value) -> PathNode {
        PathNode::new(self, path, default)
    }

    /// Read-modify-write of the whole tree.
    ///
    /// `f` edits a snapshot with no lock held, so it may read this tree. The
    /// edited snapshot replaces the live tree only if `f` returns `Ok(true)`.
    /// Writers are expected to run on one logical thread; a write committed by
    /// someone else while `f` runs is overwritten.
    pub(crate) fn modify(
        &self,
        f: impl FnOnce(&mut Value) -> Result<bool, PathError>,
    ) -> Result<bool, PathError> {
        let mut draft = self.get_state();
        if !f(&mut draft)? {
            return Ok(false);
        }
        *self.write() = draft;
        self.committed();
        Ok(true)
    }

    fn committed(&self) {
        self.inner.revision.fetch_add(1, Ordering::AcqRel);
        self.inner.scheduler.schedule();
    }

    // Writers only ever assign a complete value, so a poisoned lock still
    // guards a whole tree.
    fn read(&self) -> RwLockReadGuard<'_, Value> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Value> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for StateTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTree")
            .field("root_key", &self.inner.root_key)
            .field("revision", &self.revision())
            .field("scheduler", &self.inner.scheduler)
            .finish_non_exhaustive()
    }
}

fn initial_state(root_key: &str) -> Value {
    [(root_key, Value::map())].into_iter().collect()
}
