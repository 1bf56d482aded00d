//! AddressCount loader: the counter protocol (§4.3.3) applied to the three
//! counted address categories. One observation message means "`public_key`
//! was just sighted as a member of `count_type`"; the loader turns that
//! into exactly-once counting via an insert-only index table plus the
//! counter cache.

use std::sync::Arc;

use addresses_cache::CounterCache;
use addresses_store::Store;
use addresses_types::{index, AddressCount, AddressCountType};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::error::SendError;

#[derive(Debug, Clone)]
pub struct AddressCountObservation {
    pub count_type: AddressCountType,
    pub public_key: String
}

#[derive(Clone)]
pub struct AddressCountLoaderHandle {
    tx: mpsc::Sender<AddressCountObservation>
}

impl AddressCountLoaderHandle {
    pub async fn enqueue(&self, row: AddressCountObservation) -> Result<(), SendError> {
        self.tx.send(row).await.map_err(|_| SendError)
    }
}

pub fn spawn(store: Arc<dyn Store>, cache: Arc<dyn CounterCache>, capacity: usize) -> AddressCountLoaderHandle {
    let (tx, rx) = mpsc::channel(capacity);
    tokio::spawn(run(rx, store, cache));
    AddressCountLoaderHandle { tx }
}

async fn run(
    mut rx: mpsc::Receiver<AddressCountObservation>,
    store: Arc<dyn Store>,
    cache: Arc<dyn CounterCache>
) {
    while let Some(observation) = rx.recv().await {
        if let Err(err) = apply(&store, &cache, &observation).await {
            error!(
                count_type = observation.count_type.as_str(),
                public_key = %observation.public_key,
                error = %err,
                "address count loader: fatal error"
            );
            std::process::exit(1);
        }
    }
}

/// The counter protocol from §4.3.3, parametrised over which of the three
/// index tables applies to `count_type`.
async fn apply(
    store: &Arc<dyn Store>,
    cache: &Arc<dyn CounterCache>,
    observation: &AddressCountObservation
) -> Result<(), crate::LoaderError> {
    let cache_key = observation.count_type.cache_key();

    let mut cached = cache.get_count(&cache_key).await?;
    if cached == -1 {
        let canonical = store.select_address_count(observation.count_type).await?.map(|row| row.count).unwrap_or(0);
        cache.set_count(&cache_key, canonical).await?;
        cached = canonical;
    }

    let inserted = match observation.count_type {
        AddressCountType::All => {
            store
                .insert_address_count_index(&index::AddressCountIndex {
                    count_type: observation.count_type,
                    public_key: observation.public_key.clone()
                })
                .await?
        }
        AddressCountType::Contract => {
            store
                .insert_address_contract_count_index(&index::AddressContractCountIndex {
                    public_key: observation.public_key.clone()
                })
                .await?
        }
        AddressCountType::Token => {
            store
                .insert_address_token_count_index(&index::AddressTokenCountIndex {
                    public_key: observation.public_key.clone()
                })
                .await?
        }
    };

    if !inserted {
        warn!(
            count_type = observation.count_type.as_str(),
            public_key = %observation.public_key,
            "address count observation already counted, skipping"
        );
        return Ok(())
    }

    let new_value = cache.inc_count(&cache_key).await?;
    let _ = cached;

    store
        .upsert_address_count(&AddressCount { count_type: observation.count_type, count: new_value })
        .await?;

    debug!(count_type = observation.count_type.as_str(), count = new_value, "address count incremented");
    Ok(())
}

#[cfg(test)]
mod tests {
    use addresses_cache::InMemoryCounterCache;
    use addresses_store::InMemoryStore;

    use super::*;

    #[tokio::test]
    async fn redelivering_the_same_observation_counts_it_once() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::default());
        let cache: Arc<dyn CounterCache> = Arc::new(InMemoryCounterCache::default());
        let observation = AddressCountObservation { count_type: AddressCountType::All, public_key: "hxA".to_owned() };

        apply(&store, &cache, &observation).await.unwrap();
        apply(&store, &cache, &observation).await.unwrap();

        let row = store.select_address_count(AddressCountType::All).await.unwrap().unwrap();
        assert_eq!(row.count, 1);
    }

    #[tokio::test]
    async fn distinct_public_keys_both_count() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::default());
        let cache: Arc<dyn CounterCache> = Arc::new(InMemoryCounterCache::default());

        apply(&store, &cache, &AddressCountObservation { count_type: AddressCountType::All, public_key: "hxA".to_owned() })
            .await
            .unwrap();
        apply(&store, &cache, &AddressCountObservation { count_type: AddressCountType::All, public_key: "hxB".to_owned() })
            .await
            .unwrap();

        let row = store.select_address_count(AddressCountType::All).await.unwrap().unwrap();
        assert_eq!(row.count, 2);
    }
}
