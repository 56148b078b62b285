//! The shared state substrate: one immutable tree, coalesced change
//! notification, and path-scoped views.
//!
//! # Architecture
//!
//! ```text
//! PathNode::set_in ─► StateTree::modify ─► swap tree ─► ChangeScheduler::schedule
//!                                                              │
//!                                              (next host tick, or immediately)
//!                                                              ▼
//!                                                    ChangeEvents::emit ─► listeners
//! ```
//!
//! Every write replaces the whole tree reference, so readers only ever see a
//! complete tree. Any number of writes before the next tick produce one
//! emission.

mod events;
mod node;
mod scheduler;
mod tree;

pub use events::{ChangeEvents, ListenerId};
pub use node::PathNode;
pub use scheduler::{ChangeScheduler, FrameCallback, FrameClock, Ticker};
pub use tree::StateTree;

pub use strata_types::{Path, PathError, Value};
