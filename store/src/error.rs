use strata_types::PathError;
use thiserror::Error;

/// Failures raised by stores, caches, and the dispatch bus.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{resource}: record has no `id` field")]
    MissingId { resource: String },
    #[error("{resource}: `id` must be a string or an integer, got {found}")]
    InvalidId { resource: String, found: String },
    #[error("{resource}: cannot load records from a {found} payload")]
    InvalidPayload {
        resource: String,
        found: &'static str,
    },
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("{resource}: {source}")]
    Serde {
        resource: String,
        source: serde_json::Error,
    },
    #[error("{resource}: store is already registered with the dispatcher")]
    AlreadyRegistered { resource: String },
    /// A reducer rejected an action.
    #[error("{store}: {message}")]
    Reducer { store: String, message: String },
}

impl StoreError {
    pub fn reducer(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Reducer {
            store: store.into(),
            message: message.into(),
        }
    }
}
