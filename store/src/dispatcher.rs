//! Synchronous action bus.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::StoreError;

/// A message broadcast to every registered store.
///
/// Applications define one closed enum with a variant per feature area and
/// match it exhaustively in each reducer.
pub trait Action: fmt::Debug {
    /// The discriminant reported in logs, e.g. `"WIDGET_LIST"`.
    fn kind(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchToken(u64);

impl DispatchToken {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DispatchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Callback<A> = Arc<dyn Fn(&A) -> Result<(), StoreError> + Send + Sync>;

/// Invokes every registered callback, in registration order, for each action.
///
/// # Failure semantics
///
/// Callbacks are not isolated from each other. The first callback to return an
/// error ends the dispatch: the error is returned to the caller and callbacks
/// registered after it never see that action. A panicking callback unwinds
/// through `dispatch` the same way. Stores and action creators rely on this
/// ordering, so it is kept as is.
///
/// Dispatching from inside a callback is allowed; the nested dispatch runs to
/// completion before the outer one moves on. Callbacks registered during a
/// dispatch first see the next action.
pub struct Dispatcher<A> {
    callbacks: Mutex<Vec<(DispatchToken, Callback<A>)>>,
    next_token: AtomicU64,
}

impl<A> Default for Dispatcher<A> {
    fn default() -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
            next_token: AtomicU64::new(1),
        }
    }
}

impl<A: Action> Dispatcher<A> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        callback: impl Fn(&A) -> Result<(), StoreError> + Send + Sync + 'static,
    ) -> DispatchToken {
        let token = DispatchToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.lock().push((token, Arc::new(callback)));
        token
    }

    /// Returns `false` if `token` is not registered.
    pub fn unregister(&self, token: DispatchToken) -> bool {
        let mut callbacks = self.lock();
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != token);
        callbacks.len() != before
    }

    pub fn dispatch(&self, action: &A) -> Result<(), StoreError> {
        let snapshot: Vec<(DispatchToken, Callback<A>)> = self
            .lock()
            .iter()
            .map(|(token, callback)| (*token, Arc::clone(callback)))
            .collect();
        tracing::trace!(action = action.kind(), stores = snapshot.len(), "dispatch");

        for (token, callback) in snapshot {
            if let Err(err) = callback(action) {
                tracing::warn!(
                    action = action.kind(),
                    token = %token,
                    error = %err,
                    "dispatch aborted by store"
                );
                return Err(err);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(DispatchToken, Callback<A>)>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A> fmt::Debug for Dispatcher<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("Dispatcher")
            .field("registered", &registered)
            .finish()
    }
}
