//! Path-scoped views

use serde_json::json;
use strata_state::{Path, PathError, StateTree, Value};

use crate::common::{count, notification_counter};

#[test]
fn sub_node_composition_is_transparent() {
    let tree = StateTree::immediate("app");
    let root = tree.root();
    root.sub(["a", "b"], Value::Null).set(Value::from(5)).unwrap();

    assert_eq!(root.sub(["a"], Value::Null).get("b").as_i64(), Some(5));
    assert_eq!(root.sub("a", Value::Null).sub("b", Value::Null).path(), &Path::from(["a", "b"]));
}

#[test]
fn writes_swap_the_whole_tree() {
    let tree = StateTree::immediate("app");
    let widgets = tree.node("widgets", Value::map());
    let gadgets = tree.node("gadgets", Value::map());
    gadgets.set_in("g1", Value::from(json!({ "name": "gear" }))).unwrap();

    let before = tree.get_state();
    widgets.set_in(["w1", "name"], Value::from("foo")).unwrap();
    let after = tree.get_state();

    assert!(before.get_in(&Path::from(["app", "widgets", "w1"])).is_none());
    assert_eq!(
        after
            .get_in(&Path::from(["app", "widgets", "w1", "name"]))
            .and_then(Value::as_str),
        Some("foo")
    );
    // The untouched sibling subtree is shared, not copied.
    let gadgets_before = before.get_in(&Path::from(["app", "gadgets"])).unwrap();
    let gadgets_after = after.get_in(&Path::from(["app", "gadgets"])).unwrap();
    assert!(gadgets_before.shares_storage_with(gadgets_after));
}

#[test]
fn update_in_is_atomic_read_modify_write() {
    let tree = StateTree::immediate("app");
    let node = tree.node("visits", Value::map());
    for _ in 0..5 {
        node.update_in("home", Value::from(0), |current| {
            Value::from(current.as_i64().unwrap_or_default() + 1)
        })
        .unwrap();
    }
    assert_eq!(node.get("home").as_i64(), Some(5));
    assert_eq!(tree.revision(), 5);
}

#[test]
fn remove_in_missing_path_is_silent_noop() {
    let tree = StateTree::immediate("app");
    let notified = notification_counter(&tree);
    let node = tree.node("teardown", Value::map());

    assert!(!node.remove_in(["optional", "key"]));
    assert!(!node.remove_in("optional"));
    assert_eq!(count(&notified), 0);
    assert_eq!(tree.get_state(), Value::from(json!({ "app": {} })));
}

#[test]
fn keys_are_empty_until_data_arrives() {
    let tree = StateTree::immediate("app");
    let node = tree.node("widgets", Value::map());
    assert!(node.keys().is_empty());
    assert!(!node.has("w1"));

    node.set(Value::from(json!({ "b": 1, "a": 2 }))).unwrap();
    assert_eq!(node.keys(), ["a", "b"]);
    assert_eq!(node.size(), 2);
    assert!(node.has("a"));
}

#[test]
fn list_elements_are_addressed_by_index() {
    let tree = StateTree::immediate("app");
    let node = tree.node("tags", Value::list([]));
    node.set(Value::from(json!(["x", "y"]))).unwrap();
    node.set_in("2", Value::from("z")).unwrap();
    assert_eq!(node.get("2").as_str(), Some("z"));

    let err = node.set_in("7", Value::from("far")).unwrap_err();
    assert!(matches!(err, PathError::IndexOutOfBounds { len: 3, .. }));
}

#[test]
fn reset_restores_empty_tree() {
    let tree = StateTree::immediate("app");
    tree.node("widgets", Value::map())
        .set_in("w1", Value::from(1))
        .unwrap();
    tree.reset();
    assert_eq!(tree.get_state(), Value::from(json!({ "app": {} })));
    assert!(tree.root().keys().is_empty());
}
