//! Concurrency limits for async fan-out.
//!
//! [`ResourcePool`] hands out a fixed set of interchangeable tokens, queueing
//! requests in strict arrival order when none are free. [`Semaphore`] is a
//! pool of `N` numbered tokens with a validated size and a forgiving
//! `release`.
//!
//! ```text
//! acquire ──► free token? ──yes──► ready now
//!                 │ no
//!                 ▼
//!           wait queue (FIFO) ◄── release hands the token to the oldest waiter
//! ```

mod error;
mod pool;
mod semaphore;

pub use error::{PoolError, SemaphoreError};
pub use pool::{Acquire, ResourcePool};
pub use semaphore::{Semaphore, SemaphoreSize};
