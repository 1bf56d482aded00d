use thiserror::Error;

/// Errors a loader's background task can hit (§7). Every variant other
/// than a benign duplicate-key on an index table is fatal: the caller
/// should halt the process (§4.3.4) and let the supervisor restart from
/// the last committed offset.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error(transparent)]
    Store(#[from] addresses_store::StoreError),
    #[error(transparent)]
    Cache(#[from] addresses_cache::CacheError)
}

/// Returned by [`crate::Handle`]-style senders when the receiving loader
/// has already shut down.
#[derive(Debug, Error)]
#[error("loader channel closed")]
pub struct SendError;
