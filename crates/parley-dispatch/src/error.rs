use parley_store::{Namespace, StoreError};
use parley_translate::TranslateError;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error("{operation} failed on {namespace}: {source}")]
    Adapter {
        operation: &'static str,
        namespace: String,
        #[source]
        source: StoreError,
    },

    #[error("no document found with ID: {id} in {namespace}")]
    NotFound { id: String, namespace: Namespace },

    #[error("refusing to delete from {0} without a filter")]
    UnsafeDelete(Namespace),
}

impl DispatchError {
    /// Wrap a store failure with the operation and target it came from.
    pub(crate) fn adapter(
        operation: &'static str,
        namespace: impl ToString,
    ) -> impl FnOnce(StoreError) -> Self {
        let namespace = namespace.to_string();
        move |source| DispatchError::Adapter {
            operation,
            namespace,
            source,
        }
    }
}
