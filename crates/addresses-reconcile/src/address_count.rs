//! AddressCount reconciliation routine (§4.5): for each of the three
//! counted categories, recomputes the canonical total via a table scan
//! over its index table and overwrites the counter cache and the
//! canonical row.

use std::sync::Arc;

use addresses_cache::CounterCache;
use addresses_store::{Store, StoreError};
use addresses_types::{AddressCount, AddressCountType};
use tracing::{debug, error};

pub async fn run(store: Arc<dyn Store>, cache: Arc<dyn CounterCache>, interval: std::time::Duration) {
    loop {
        if let Err(err) = run_once(&store, &cache).await {
            error!(error = %err, "address count reconciliation: fatal error");
            std::process::exit(1);
        }
        tokio::time::sleep(interval).await;
    }
}

async fn run_once(store: &Arc<dyn Store>, cache: &Arc<dyn CounterCache>) -> Result<(), ReconcileError> {
    for count_type in AddressCountType::ALL {
        let canonical = store.count_address_count_index(count_type).await?;
        cache.set_count(&count_type.cache_key(), canonical).await?;
        store.upsert_address_count(&AddressCount { count_type, count: canonical }).await?;
        debug!(count_type = count_type.as_str(), canonical, "address count reconciled");
    }

    addresses_metrics::record_reconciliation_pass("address_count", AddressCountType::ALL.len() as u64);
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Cache(#[from] addresses_cache::CacheError)
}
