//! Resource pool fairness

use futures_util::FutureExt;
use strata_pool::{PoolError, ResourcePool};
use tokio::sync::mpsc;
use tokio::task::yield_now;

#[test]
fn acquire_resolves_immediately_when_available() {
    let pool = ResourcePool::new(["a"]);
    assert_eq!(pool.acquire().now_or_never(), Some(Ok("a")));
}

#[test]
fn second_acquire_pends_until_release() {
    let pool = ResourcePool::new(["a"]);
    let token = pool.acquire().now_or_never().unwrap().unwrap();

    let mut second = pool.acquire();
    assert!((&mut second).now_or_never().is_none());

    pool.release(token).unwrap();
    assert_eq!(second.now_or_never(), Some(Ok("a")));
}

#[test]
fn release_serves_oldest_request_first() {
    let pool = ResourcePool::new(["a"]);
    let mut req1 = pool.acquire();
    let mut req2 = pool.acquire();
    let mut req3 = pool.acquire();

    let token = (&mut req1).now_or_never().unwrap().unwrap();
    assert!((&mut req2).now_or_never().is_none());
    assert!((&mut req3).now_or_never().is_none());

    pool.release(token).unwrap();
    assert_eq!((&mut req2).now_or_never(), Some(Ok("a")));
    assert!((&mut req3).now_or_never().is_none());
}

#[test]
fn double_release_faults_without_side_effects() {
    let pool = ResourcePool::new(["a", "b"]);
    let a = pool.acquire().now_or_never().unwrap().unwrap();
    pool.release(a).unwrap();

    assert_eq!(pool.release("a"), Err(PoolError::AlreadyFree));
    assert_eq!(pool.available(), 2);
    assert_eq!(pool.capacity(), 2);
}

#[test]
fn tokens_are_conserved() {
    let pool = ResourcePool::new(["a", "b"]);
    let a = pool.acquire().now_or_never().unwrap().unwrap();
    let b = pool.acquire().now_or_never().unwrap().unwrap();
    let mut waiter = pool.acquire();
    let abandoned = pool.acquire();

    pool.release(a).unwrap();
    drop(abandoned);
    pool.release(b).unwrap();

    let held = (&mut waiter).now_or_never().unwrap().unwrap();
    assert_eq!(held, "a");
    assert_eq!(pool.available() + 1, pool.capacity());
}

#[tokio::test]
async fn waiting_tasks_resume_in_order() {
    let pool = ResourcePool::new(["only"]);
    let token = pool.acquire().await.unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut tasks = Vec::new();
    for idx in 0..3 {
        let pool = pool.clone();
        let tx = tx.clone();
        tasks.push(tokio::spawn(async move {
            let token = pool.acquire().await.unwrap();
            tx.send(idx).unwrap();
            pool.release(token).unwrap();
        }));
        // Let the task enqueue before spawning the next.
        yield_now().await;
    }
    assert_eq!(pool.waiting(), 3);

    pool.release(token).unwrap();
    for task in tasks {
        task.await.unwrap();
    }
    drop(tx);

    let mut order = Vec::new();
    while let Some(idx) = rx.recv().await {
        order.push(idx);
    }
    assert_eq!(order, [0, 1, 2]);
}
