//! Change notification coalescing

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use strata_state::{ChangeScheduler, FrameClock, StateTree, Value};

use crate::common::{count, notification_counter};

#[test]
fn many_writes_before_a_tick_notify_once() {
    for writes in [1, 2, 10, 100] {
        let clock = Arc::new(FrameClock::new());
        let tree = StateTree::with_frame_clock("app", &clock);
        let notified = notification_counter(&tree);
        let node = tree.node("counters", Value::map());

        for idx in 0..writes {
            node.set_in(format!("c{idx}"), Value::from(idx)).unwrap();
        }
        assert_eq!(count(&notified), 0, "{writes} writes");

        clock.tick();
        assert_eq!(count(&notified), 1, "{writes} writes");
        assert_eq!(tree.revision(), writes as u64);
    }
}

#[test]
fn each_tick_carries_its_own_batch() {
    let clock = Arc::new(FrameClock::new());
    let tree = StateTree::with_frame_clock("app", &clock);
    let notified = notification_counter(&tree);
    let node = tree.node("n", Value::Null);

    node.set(Value::from(1)).unwrap();
    clock.tick();
    node.set(Value::from(2)).unwrap();
    node.set(Value::from(3)).unwrap();
    clock.tick();
    clock.tick();

    assert_eq!(count(&notified), 2);
}

#[test]
fn write_from_listener_starts_next_batch() {
    let clock = Arc::new(FrameClock::new());
    let tree = StateTree::with_frame_clock("app", &clock);
    let notified = notification_counter(&tree);

    let writer = tree.clone();
    tree.subscribe(move || {
        let node = writer.node("echo", Value::from(0));
        if node.value().as_i64() == Some(0) {
            node.set(Value::from(1)).unwrap();
        }
    });

    tree.node("x", Value::Null).set(Value::from(true)).unwrap();
    clock.tick();
    assert_eq!(count(&notified), 1);
    assert!(tree.has_pending_change());

    clock.tick();
    assert_eq!(count(&notified), 2);
    assert!(!tree.has_pending_change());
}

#[test]
fn flush_now_emits_pending_batch_once() {
    let clock = Arc::new(FrameClock::new());
    let tree = StateTree::with_frame_clock("app", &clock);
    let notified = notification_counter(&tree);

    tree.node("x", Value::Null).set(Value::from(1)).unwrap();
    assert!(tree.flush_now());
    assert!(!tree.flush_now());
    clock.tick();

    assert_eq!(count(&notified), 1);
}

#[test]
fn immediate_tree_notifies_every_write() {
    let tree = StateTree::immediate("app");
    let notified = notification_counter(&tree);
    let node = tree.node("x", Value::Null);
    node.set(Value::from(1)).unwrap();
    node.set(Value::from(2)).unwrap();
    assert_eq!(count(&notified), 2);
}

#[test]
fn scheduler_without_ticker_runs_inline() {
    let calls = Arc::new(AtomicUsize::new(0));
    let handle = Arc::clone(&calls);
    let scheduler = ChangeScheduler::immediate(move || {
        handle.fetch_add(1, Ordering::SeqCst);
    });
    scheduler.schedule();
    scheduler.schedule();
    assert_eq!(count(&calls), 2);
    assert!(!scheduler.is_pending());
}

#[test]
fn unsubscribed_listener_is_not_called() {
    let clock = Arc::new(FrameClock::new());
    let tree = StateTree::with_frame_clock("app", &clock);
    let kept = notification_counter(&tree);

    let dropped = Arc::new(AtomicUsize::new(0));
    let handle = Arc::clone(&dropped);
    let id = tree.subscribe(move || {
        handle.fetch_add(1, Ordering::SeqCst);
    });
    assert!(tree.unsubscribe(id));

    tree.reset();
    clock.tick();
    assert_eq!(count(&kept), 1);
    assert_eq!(count(&dropped), 0);
}
