//! TransactionCountByPublicKey reconciliation routine (§4.5): recomputes
//! each key's canonical count from its index table and rewrites both the
//! counter cache and the canonical row. Crash-recovery resync for the
//! counter protocol.

use std::sync::Arc;

use addresses_cache::{cache_key, CounterCache};
use addresses_store::{Store, StoreError};
use addresses_types::TransactionCountByPublicKey;
use tracing::{debug, error};

const PAGE_SIZE: i64 = 500;
const CACHE_PURPOSE: &str = "transaction_count_by_public_key";

pub async fn run(store: Arc<dyn Store>, cache: Arc<dyn CounterCache>, interval: std::time::Duration) {
    loop {
        if let Err(err) = run_once(&store, &cache).await {
            error!(error = %err, "transaction count reconciliation: fatal error");
            std::process::exit(1);
        }
        tokio::time::sleep(interval).await;
    }
}

async fn run_once(store: &Arc<dyn Store>, cache: &Arc<dyn CounterCache>) -> Result<(), ReconcileError> {
    let mut skip = 0i64;
    let mut corrected = 0u64;

    loop {
        let page = store.select_transaction_count_by_public_key_page(PAGE_SIZE, skip).await?;
        if page.is_empty() {
            break
        }

        for row in &page {
            let canonical = store.count_transaction_count_by_public_key_index(&row.public_key).await?;
            cache.set_count(&cache_key(CACHE_PURPOSE, &row.public_key), canonical).await?;
            store
                .upsert_transaction_count_by_public_key(&TransactionCountByPublicKey {
                    public_key: row.public_key.clone(),
                    count: canonical
                })
                .await?;
            corrected += 1;
        }

        skip += page.len() as i64;
    }

    addresses_metrics::record_reconciliation_pass("transaction_count_by_public_key", corrected);
    debug!(corrected, "transaction count reconciliation pass complete");
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Cache(#[from] addresses_cache::CacheError)
}
