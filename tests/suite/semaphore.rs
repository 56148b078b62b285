//! Semaphore validation and release guard

use futures_util::FutureExt;
use strata_pool::{Semaphore, SemaphoreError, SemaphoreSize};

#[test]
fn construction_rejects_non_integer_sizes() {
    assert!(matches!(
        Semaphore::try_new("NaN"),
        Err(SemaphoreError::NotNumeric { .. })
    ));
    assert!(matches!(
        Semaphore::try_new(1.1),
        Err(SemaphoreError::NotInteger { .. })
    ));
    assert!(matches!(
        "2.5".parse::<SemaphoreSize>(),
        Err(SemaphoreError::NotInteger { .. })
    ));
}

#[test]
fn size_two_admits_two_holders() {
    let semaphore = Semaphore::try_new(2_usize).unwrap();
    let first = semaphore.acquire().now_or_never().unwrap().unwrap();
    let _second = semaphore.acquire().now_or_never().unwrap().unwrap();

    let mut third = semaphore.acquire();
    assert!((&mut third).now_or_never().is_none());

    semaphore.release(&first).unwrap();
    assert_eq!((&mut third).now_or_never(), Some(Ok(first)));
}

#[test]
fn foreign_token_release_is_noop() {
    let semaphore = Semaphore::try_new(1_usize).unwrap();
    let held = semaphore.acquire().now_or_never().unwrap().unwrap();
    let mut waiter = semaphore.acquire();

    assert!(semaphore.release("unknown-token").is_ok());
    assert!((&mut waiter).now_or_never().is_none());

    semaphore.release(&held).unwrap();
    assert_eq!((&mut waiter).now_or_never(), Some(Ok(held)));
}

#[test]
fn tokens_are_numbered_from_one() {
    let semaphore = Semaphore::try_new("3").unwrap();
    assert_eq!(semaphore.tokens(), ["1", "2", "3"]);
    assert_eq!(semaphore.size(), 3);
    assert_eq!(semaphore.available(), 3);
}
