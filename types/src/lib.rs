//! Core state types for Strata.
//!
//! This crate contains pure data types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.
//!
//! - [`Value`]: the persistent, structurally shared state tree
//! - [`Path`]: an ordered key sequence addressing a location in a [`Value`]

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod path;
mod value;

pub use path::Path;
pub use value::{PathError, Value};
