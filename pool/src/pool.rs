//! FIFO-fair pool of interchangeable tokens.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::PoolError;

struct PoolState<T> {
    capacity: usize,
    free: VecDeque<T>,
    waiters: VecDeque<oneshot::Sender<T>>,
}

impl<T> PoolState<T> {
    /// Gives `token` to the oldest live waiter, or returns it to the free list.
    fn hand_off(&mut self, mut token: T) {
        while let Some(waiter) = self.waiters.pop_front() {
            match waiter.send(token) {
                Ok(()) => return,
                // The waiter gave up; try the next one.
                Err(returned) => token = returned,
            }
        }
        self.free.push_back(token);
    }

    fn waiting(&self) -> usize {
        self.waiters.iter().filter(|tx| !tx.is_closed()).count()
    }
}

/// A fixed set of tokens, each either free, held by a caller, or promised to
/// the oldest waiter.
///
/// Requests are granted strictly in arrival order. A released token goes to
/// the oldest waiter directly and never passes through the free list first.
/// Cloning yields another handle to the same pool.
pub struct ResourcePool<T> {
    state: Arc<Mutex<PoolState<T>>>,
}

impl<T> ResourcePool<T> {
    pub fn new(tokens: impl IntoIterator<Item = T>) -> Self {
        let free: VecDeque<T> = tokens.into_iter().collect();
        Self {
            state: Arc::new(Mutex::new(PoolState {
                capacity: free.len(),
                free,
                waiters: VecDeque::new(),
            })),
        }
    }

    /// Takes a token. The returned future is already complete when a token
    /// was free at the time of the call; otherwise it joins the wait queue.
    ///
    /// A queued request has no timeout. Dropping it forfeits its place, and a
    /// token already promised to it moves on to the next waiter.
    pub fn acquire(&self) -> Acquire<T> {
        let mut state = self.lock();
        if let Some(token) = state.free.pop_front() {
            return Acquire {
                state: AcquireState::Ready {
                    token,
                    pool: Arc::downgrade(&self.state),
                },
            };
        }

        // Abandoned requests leave closed senders behind.
        state.waiters.retain(|tx| !tx.is_closed());
        let (tx, rx) = oneshot::channel();
        state.waiters.push_back(tx);
        tracing::trace!(waiting = state.waiters.len(), "acquire queued");
        Acquire {
            state: AcquireState::Waiting {
                rx,
                pool: Arc::downgrade(&self.state),
            },
        }
    }

    /// Total number of tokens.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Tokens sitting in the free list.
    #[must_use]
    pub fn available(&self) -> usize {
        self.lock().free.len()
    }

    /// Requests still waiting for a token.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.lock().waiting()
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<T>> {
        lock(&self.state)
    }
}

impl<T: PartialEq + fmt::Debug> ResourcePool<T> {
    /// Returns `token` to the pool.
    ///
    /// Fails with [`PoolError::AlreadyFree`], changing nothing, when an equal
    /// token is already in the free list.
    pub fn release(&self, token: T) -> Result<(), PoolError> {
        let mut state = self.lock();
        if state.free.contains(&token) {
            tracing::warn!(?token, "release of a token that is already free");
            return Err(PoolError::AlreadyFree);
        }
        tracing::trace!(?token, waiting = state.waiters.len(), "release");
        state.hand_off(token);
        Ok(())
    }
}

impl<T> Clone for ResourcePool<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> fmt::Debug for ResourcePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ResourcePool")
            .field("capacity", &state.capacity)
            .field("available", &state.free.len())
            .field("waiting", &state.waiting())
            .finish()
    }
}

fn lock<T>(state: &Mutex<PoolState<T>>) -> MutexGuard<'_, PoolState<T>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

enum AcquireState<T> {
    Ready {
        token: T,
        pool: Weak<Mutex<PoolState<T>>>,
    },
    Waiting {
        rx: oneshot::Receiver<T>,
        pool: Weak<Mutex<PoolState<T>>>,
    },
    Done,
}

/// A pending or completed [`ResourcePool::acquire`].
#[must_use = "an unawaited acquire holds its place in the queue until dropped"]
pub struct Acquire<T> {
    state: AcquireState<T>,
}

impl<T> Acquire<T> {
    /// True if the token was granted without waiting.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, AcquireState::Ready { .. })
    }
}

// The token is moved out, never pinned.
impl<T> Unpin for Acquire<T> {}

impl<T> Future for Acquire<T> {
    type Output = Result<T, PoolError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let AcquireState::Waiting { rx, .. } = &mut this.state else {
            return match mem::replace(&mut this.state, AcquireState::Done) {
                AcquireState::Ready { token, .. } => Poll::Ready(Ok(token)),
                _ => panic!("`Acquire` polled after completion"),
            };
        };

        let granted = match Pin::new(rx).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(granted) => granted,
        };
        this.state = AcquireState::Done;
        Poll::Ready(granted.map_err(|_| PoolError::Closed))
    }
}

impl<T> Drop for Acquire<T> {
    fn drop(&mut self) {
        let (token, pool) = match mem::replace(&mut self.state, AcquireState::Done) {
            AcquireState::Ready { token, pool } => (token, pool),
            AcquireState::Waiting { mut rx, pool } => {
                rx.close();
                // A token sent before `close` would otherwise be lost.
                let Ok(token) = rx.try_recv() else {
                    return;
                };
                (token, pool)
            }
            AcquireState::Done => return,
        };
        if let Some(pool) = pool.upgrade() {
            lock(&pool).hand_off(token);
        }
    }
}

impl<T> fmt::Debug for Acquire<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            AcquireState::Ready { .. } => "ready",
            AcquireState::Waiting { .. } => "waiting",
            AcquireState::Done => "done",
        };
        f.debug_struct("Acquire").field("state", &state).finish()
    }
}
