//! Shared test utilities and fixtures
//!
//! A small widget feature area wired the way a host application wires its
//! stores, plus helpers for counting change notifications.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use strata_state::{FrameClock, StateTree};
use strata_store::{
    Action, Dispatcher, NormalizedCache, Store, StoreError, WriteMode, register_store,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Widget {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

pub fn widget(id: &str, name: &str) -> Widget {
    Widget {
        id: id.to_string(),
        name: name.to_string(),
        color: None,
    }
}

#[derive(Debug)]
pub enum WidgetAction {
    List(Vec<Widget>),
    Patch(Vec<serde_json::Value>),
    Delete(String),
    Clear,
}

#[derive(Debug)]
pub enum TestAction {
    Widgets(WidgetAction),
    /// Belongs to a feature area with no store in these tests.
    Navigate(String),
}

impl Action for TestAction {
    fn kind(&self) -> &'static str {
        match self {
            TestAction::Widgets(WidgetAction::List(_)) => "WIDGET_LIST",
            TestAction::Widgets(WidgetAction::Patch(_)) => "WIDGET_PATCH",
            TestAction::Widgets(WidgetAction::Delete(_)) => "WIDGET_DELETE",
            TestAction::Widgets(WidgetAction::Clear) => "WIDGET_CLEAR",
            TestAction::Navigate(_) => "NAVIGATE",
        }
    }
}

pub struct WidgetStore {
    cache: NormalizedCache<Widget>,
}

impl Store<TestAction> for WidgetStore {
    type Entity = Widget;

    fn cache(&self) -> &NormalizedCache<Widget> {
        &self.cache
    }

    fn act(&self, action: &TestAction) -> Result<(), StoreError> {
        let TestAction::Widgets(action) = action else {
            return Ok(());
        };
        match action {
            WidgetAction::List(widgets) => {
                self.cache.receive_data(widgets, WriteMode::Replace)?;
            }
            WidgetAction::Patch(patches) => {
                self.cache.receive_data(patches, WriteMode::Merge)?;
            }
            WidgetAction::Delete(id) => {
                self.cache.remove(id);
            }
            WidgetAction::Clear => {
                self.cache.empty();
            }
        }
        Ok(())
    }
}

/// A frame-clocked tree with a registered widget store.
pub struct App {
    pub clock: Arc<FrameClock>,
    pub tree: StateTree,
    pub dispatcher: Dispatcher<TestAction>,
    pub widgets: Arc<WidgetStore>,
}

impl App {
    pub fn new() -> Self {
        let clock = Arc::new(FrameClock::new());
        let tree = StateTree::with_frame_clock("app", &clock);
        let dispatcher = Dispatcher::new();
        let widgets = Arc::new(WidgetStore {
            cache: NormalizedCache::new(&tree, "widgets"),
        });
        register_store(&widgets, &dispatcher).unwrap();
        Self {
            clock,
            tree,
            dispatcher,
            widgets,
        }
    }

    pub fn dispatch(&self, action: WidgetAction) {
        self.dispatcher
            .dispatch(&TestAction::Widgets(action))
            .unwrap();
    }
}

/// Counts change notifications delivered to a listener on `tree`.
pub fn notification_counter(tree: &StateTree) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let handle = Arc::clone(&count);
    tree.subscribe(move || {
        handle.fetch_add(1, Ordering::SeqCst);
    });
    count
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
