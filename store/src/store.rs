//! Domain stores: one cache plus one reducer.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::cache::NormalizedCache;
use crate::dispatcher::{Action, DispatchToken, Dispatcher};
use crate::error::StoreError;

/// A feature area's store.
///
/// `act` matches the application's action enum and calls the cache operations
/// each relevant variant needs. Variants that belong to other feature areas
/// fall through to `Ok(())`.
pub trait Store<A>: Send + Sync + 'static {
    type Entity: DeserializeOwned;

    fn cache(&self) -> &NormalizedCache<Self::Entity>;

    fn act(&self, action: &A) -> Result<(), StoreError>;
}

/// Registers `store.act` with `dispatcher`.
///
/// A store registers at most once; the token is recorded on its cache and a
/// second call fails with [`StoreError::AlreadyRegistered`].
pub fn register_store<A, S>(
    store: &Arc<S>,
    dispatcher: &Dispatcher<A>,
) -> Result<DispatchToken, StoreError>
where
    A: Action + 'static,
    S: Store<A>,
{
    let cache = store.cache();
    let already = || StoreError::AlreadyRegistered {
        resource: cache.resource().to_string(),
    };
    if cache.registration.get().is_some() {
        return Err(already());
    }

    let handle = Arc::clone(store);
    let token = dispatcher.register(move |action| handle.act(action));
    if cache.registration.set(token).is_err() {
        // Lost a race with a concurrent registration.
        dispatcher.unregister(token);
        return Err(already());
    }
    tracing::debug!(resource = cache.resource(), token = %token, "store registered");
    Ok(token)
}
