//! Counting semaphore over a [`ResourcePool`] of numbered tokens.

use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{PoolError, SemaphoreError};
use crate::pool::{Acquire, ResourcePool};

/// A validated semaphore capacity: a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemaphoreSize(NonZeroUsize);

impl SemaphoreSize {
    #[must_use]
    pub const fn new(size: NonZeroUsize) -> Self {
        Self(size)
    }

    #[must_use]
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl fmt::Display for SemaphoreSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<usize> for SemaphoreSize {
    type Error = SemaphoreError;

    fn try_from(size: usize) -> Result<Self, Self::Error> {
        NonZeroUsize::new(size)
            .map(Self)
            .ok_or_else(|| SemaphoreError::NotPositive {
                input: size.to_string(),
            })
    }
}

impl TryFrom<i64> for SemaphoreSize {
    type Error = SemaphoreError;

    fn try_from(size: i64) -> Result<Self, Self::Error> {
        let not_positive = || SemaphoreError::NotPositive {
            input: size.to_string(),
        };
        let size = usize::try_from(size).map_err(|_| not_positive())?;
        NonZeroUsize::new(size).map(Self).ok_or_else(not_positive)
    }
}

impl TryFrom<f64> for SemaphoreSize {
    type Error = SemaphoreError;

    fn try_from(size: f64) -> Result<Self, Self::Error> {
        let input = size.to_string();
        if size.is_nan() {
            return Err(SemaphoreError::NotNumeric { input });
        }
        if !size.is_finite() || size.fract() != 0.0 || size > usize::MAX as f64 {
            return Err(SemaphoreError::NotInteger { input });
        }
        if size < 1.0 {
            return Err(SemaphoreError::NotPositive { input });
        }
        Self::try_from(size as usize)
    }
}

impl FromStr for SemaphoreSize {
    type Err = SemaphoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(size) = trimmed.parse::<i64>() {
            return Self::try_from(size);
        }
        match trimmed.parse::<f64>() {
            Ok(size) => Self::try_from(size),
            Err(_) => Err(SemaphoreError::NotNumeric {
                input: s.to_string(),
            }),
        }
    }
}

impl TryFrom<&str> for SemaphoreSize {
    type Error = SemaphoreError;

    fn try_from(size: &str) -> Result<Self, Self::Error> {
        size.parse()
    }
}

/// Limits how many holders run at once.
///
/// Tokens are the strings `"1"` through `"N"`, fixed at construction.
/// Releasing any other string is ignored: it never fails and never wakes a
/// waiter. Cloning yields another handle to the same semaphore.
#[derive(Clone)]
pub struct Semaphore {
    pool: ResourcePool<String>,
    tokens: Arc<[String]>,
}

impl Semaphore {
    pub fn new(size: SemaphoreSize) -> Self {
        let tokens: Arc<[String]> = (1..=size.get()).map(|n| n.to_string()).collect();
        Self {
            pool: ResourcePool::new(tokens.iter().cloned()),
            tokens,
        }
    }

    /// Validates `size` before any token exists.
    pub fn try_new<S>(size: S) -> Result<Self, SemaphoreError>
    where
        S: TryInto<SemaphoreSize, Error = SemaphoreError>,
    {
        size.try_into().map(Self::new)
    }

    pub fn acquire(&self) -> Acquire<String> {
        self.pool.acquire()
    }

    /// Returns `token`. A token this semaphore never issued is ignored.
    pub fn release(&self, token: &str) -> Result<(), PoolError> {
        if !self.owns(token) {
            tracing::trace!(token, "ignoring release of a foreign token");
            return Ok(());
        }
        self.pool.release(token.to_string())
    }

    /// Runs `f` while holding one token.
    ///
    /// The token is released when `f`'s future completes or is dropped.
    pub async fn with_permit<F, Fut, R>(&self, f: F) -> Result<R, PoolError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = R>,
    {
        let token = self.acquire().await?;
        let permit = Permit {
            semaphore: self,
            token,
        };
        Ok(f(permit.token.clone()).await)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn available(&self) -> usize {
        self.pool.available()
    }

    #[must_use]
    pub fn waiting(&self) -> usize {
        self.pool.waiting()
    }

    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    fn owns(&self, token: &str) -> bool {
        self.tokens.iter().any(|known| known == token)
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("size", &self.size())
            .field("pool", &self.pool)
            .finish()
    }
}

struct Permit<'a> {
    semaphore: &'a Semaphore,
    token: String,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        // Only fails if the holder already released the token by hand; the
        // pool logs that case.
        let _ = self.semaphore.release(&self.token);
    }
}
