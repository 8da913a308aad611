pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The store couldn't be opened, prepared, or have its schema created.
    #[error("Store unavailable: {0}")]
    Unavailable(#[source] BoxError),

    /// The store rejected a write, or a transaction control statement.
    #[error("Store rejected {operation}: {source}")]
    WriteFailed {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("Attempted to {0} without an open transaction")]
    NoTransaction(&'static str),

    #[error("Attempted to begin a transaction while one is already open")]
    TransactionAlreadyOpen,
}

impl StoreError {
    pub(crate) fn unavailable(e: impl Into<BoxError>) -> StoreError {
        StoreError::Unavailable(e.into())
    }

    pub(crate) fn write_failed(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> StoreError {
        move |e| StoreError::WriteFailed {
            operation,
            source: Box::new(e),
        }
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
