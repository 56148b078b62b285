//! Action dispatch and normalized entity caches for Strata.
//!
//! Feature areas each own one [`Store`]: a [`NormalizedCache`] for their
//! records plus an `act` reducer. [`register_store`] wires the reducer into
//! the application's [`Dispatcher`], which delivers every action to every
//! store, in registration order, synchronously.

mod cache;
mod dispatcher;
mod error;
mod store;

pub use cache::{CacheMode, NormalizedCache, WriteMode};
pub use dispatcher::{Action, DispatchToken, Dispatcher};
pub use error::StoreError;
pub use store::{Store, register_store};
