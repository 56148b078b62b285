//! Dispatch through a store into the tree, observed by a listener

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use strata_store::{Store, StoreError};

use crate::common::{App, TestAction, WidgetAction, count, notification_counter, widget};

#[test]
fn widget_list_lands_in_cache() {
    let app = App::new();
    let notified = notification_counter(&app.tree);

    app.dispatch(WidgetAction::List(vec![widget("w1", "foo"), widget("w2", "bar")]));

    let cache = app.widgets.cache();
    assert_eq!(cache.get_all().unwrap().len(), 2);
    assert_eq!(cache.get_by_id("w1").unwrap().unwrap().name, "foo");

    assert_eq!(count(&notified), 0);
    app.clock.tick();
    assert_eq!(count(&notified), 1);

    let state = serde_json::to_string(&app.tree.get_state()).unwrap();
    insta::assert_snapshot!(
        state,
        @r#"{"app":{"widgets":{"w1":{"id":"w1","name":"foo"},"w2":{"id":"w2","name":"bar"}}}}"#
    );
}

#[test]
fn unrelated_action_changes_nothing() {
    let app = App::new();
    app.dispatcher
        .dispatch(&TestAction::Navigate("/settings".to_string()))
        .unwrap();
    assert_eq!(app.tree.revision(), 0);
    assert!(!app.tree.has_pending_change());
}

#[test]
fn failing_store_blocks_later_stores() {
    let app = App::new();
    app.dispatcher
        .register(|_| Err(StoreError::reducer("audit", "offline")));
    let reached = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&reached);
    app.dispatcher.register(move |_| {
        flag.store(true, Ordering::SeqCst);
        Ok(())
    });

    let err = app
        .dispatcher
        .dispatch(&TestAction::Widgets(WidgetAction::List(vec![widget("w1", "foo")])))
        .unwrap_err();
    assert!(matches!(err, StoreError::Reducer { .. }));
    // Registered first, so the widget store still saw the action.
    assert!(app.widgets.cache().contains("w1"));
    assert!(!reached.load(Ordering::SeqCst));
}

#[test]
fn many_actions_in_one_frame_make_one_batch() {
    let app = App::new();
    let notified = notification_counter(&app.tree);
    for page in 0..10 {
        app.dispatch(WidgetAction::List(vec![widget(&format!("w{page}"), "x")]));
    }
    app.clock.tick();
    assert_eq!(count(&notified), 1);
    assert_eq!(app.widgets.cache().len(), 10);
}
