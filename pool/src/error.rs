use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The released token is already in the free list.
    #[error("released token is already free")]
    AlreadyFree,
    /// Every pool handle was dropped while the request waited.
    #[error("pool closed before a token became available")]
    Closed,
}

/// Rejected semaphore sizes. Construction never issues a token on failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemaphoreError {
    #[error("semaphore size must be a number, got {input:?}")]
    NotNumeric { input: String },
    #[error("semaphore size must be an integer, got {input}")]
    NotInteger { input: String },
    #[error("semaphore size must be positive, got {input}")]
    NotPositive { input: String },
}
