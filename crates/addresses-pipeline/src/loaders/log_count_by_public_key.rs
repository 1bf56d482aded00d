//! LogCountByPublicKey loader: counter protocol (§4.3.3) keyed by public
//! key, then an Address re-enrichment trigger (§4.3.2).

use std::sync::Arc;

use addresses_cache::{cache_key, CounterCache};
use addresses_store::Store;
use addresses_types::{index::LogCountByPublicKeyIndex, LogCountByPublicKey};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::{error::SendError, loaders::address::reenrichment_row, AddressLoaderHandle};

const CACHE_PURPOSE: &str = "log_count_by_public_key";

#[derive(Debug, Clone)]
pub struct LogCountObservation {
    pub public_key: String,
    pub hash: String,
    pub log_index: i32
}

#[derive(Clone)]
pub struct LogCountByPublicKeyLoaderHandle {
    tx: mpsc::Sender<LogCountObservation>
}

impl LogCountByPublicKeyLoaderHandle {
    pub async fn enqueue(&self, row: LogCountObservation) -> Result<(), SendError> {
        self.tx.send(row).await.map_err(|_| SendError)
    }
}

pub fn spawn(
    store: Arc<dyn Store>,
    cache: Arc<dyn CounterCache>,
    address_loader: AddressLoaderHandle,
    capacity: usize
) -> LogCountByPublicKeyLoaderHandle {
    let (tx, rx) = mpsc::channel(capacity);
    tokio::spawn(run(rx, store, cache, address_loader));
    LogCountByPublicKeyLoaderHandle { tx }
}

async fn run(
    mut rx: mpsc::Receiver<LogCountObservation>,
    store: Arc<dyn Store>,
    cache: Arc<dyn CounterCache>,
    address_loader: AddressLoaderHandle
) {
    while let Some(observation) = rx.recv().await {
        if let Err(err) = apply(&store, &cache, &observation).await {
            error!(public_key = %observation.public_key, error = %err, "log count loader: fatal error");
            std::process::exit(1);
        }

        match reenrichment_row(&store, &observation.public_key).await {
            Ok(address_row) => {
                if address_loader.enqueue(address_row).await.is_err() {
                    error!("log count loader: address loader channel closed");
                    std::process::exit(1);
                }
            }
            Err(err) => {
                error!(public_key = %observation.public_key, error = %err, "log count loader: fatal store error");
                std::process::exit(1);
            }
        }
    }
}

async fn apply(
    store: &Arc<dyn Store>,
    cache: &Arc<dyn CounterCache>,
    observation: &LogCountObservation
) -> Result<(), crate::LoaderError> {
    let key = cache_key(CACHE_PURPOSE, &observation.public_key);

    let mut cached = cache.get_count(&key).await?;
    if cached == -1 {
        let canonical =
            store.select_log_count_by_public_key(&observation.public_key).await?.map(|row| row.count).unwrap_or(0);
        cache.set_count(&key, canonical).await?;
        cached = canonical;
    }
    let _ = cached;

    let inserted = store
        .insert_log_count_by_public_key_index(&LogCountByPublicKeyIndex {
            public_key: observation.public_key.clone(),
            hash: observation.hash.clone(),
            log_index: observation.log_index
        })
        .await?;

    if !inserted {
        warn!(public_key = %observation.public_key, hash = %observation.hash, "log already counted, skipping");
        return Ok(())
    }

    let new_value = cache.inc_count(&key).await?;
    store
        .upsert_log_count_by_public_key(&LogCountByPublicKey { public_key: observation.public_key.clone(), count: new_value })
        .await?;

    debug!(public_key = %observation.public_key, count = new_value, "log count incremented");
    Ok(())
}
