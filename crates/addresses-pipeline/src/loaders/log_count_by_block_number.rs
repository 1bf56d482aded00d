//! LogCountByBlockNumber loader (§4.3.2): appends one row per observation
//! with a freshly assigned per-block sequence number, then triggers a
//! Block re-enrichment. Unlike the by-public-key counters this has no
//! dedicated index table: `count` is the log's own `max_log_index + 1`
//! (not an accumulated tally), so re-delivering the same log appends a row
//! with an identical count and the block loader's MAX-per-transaction-hash
//! aggregation absorbs the duplicate for free.

use std::sync::Arc;

use addresses_store::Store;
use addresses_types::LogCountByBlockNumber;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::{error::SendError, loaders::block::reenrichment_row, BlockLoaderHandle};

#[derive(Debug, Clone)]
pub struct LogCountByBlockObservation {
    pub block_number: i64,
    pub transaction_hash: String,
    pub count: i64
}

#[derive(Clone)]
pub struct LogCountByBlockNumberLoaderHandle {
    tx: mpsc::Sender<LogCountByBlockObservation>
}

impl LogCountByBlockNumberLoaderHandle {
    pub async fn enqueue(&self, row: LogCountByBlockObservation) -> Result<(), SendError> {
        self.tx.send(row).await.map_err(|_| SendError)
    }
}

pub fn spawn(
    store: Arc<dyn Store>,
    block_loader: BlockLoaderHandle,
    capacity: usize
) -> LogCountByBlockNumberLoaderHandle {
    let (tx, rx) = mpsc::channel(capacity);
    tokio::spawn(run(rx, store, block_loader));
    LogCountByBlockNumberLoaderHandle { tx }
}

async fn run(
    mut rx: mpsc::Receiver<LogCountByBlockObservation>,
    store: Arc<dyn Store>,
    block_loader: BlockLoaderHandle
) {
    while let Some(observation) = rx.recv().await {
        if let Err(err) = insert(&store, &observation).await {
            error!(block_number = observation.block_number, error = %err, "log count by block loader: fatal error");
            std::process::exit(1);
        }
        debug!(block_number = observation.block_number, "log count by block inserted");

        match reenrichment_row(&store, observation.block_number).await {
            Ok(block_row) => {
                if block_loader.enqueue(block_row).await.is_err() {
                    error!("log count by block loader: block loader channel closed");
                    std::process::exit(1);
                }
            }
            Err(err) => {
                error!(block_number = observation.block_number, error = %err, "log count by block loader: fatal store error");
                std::process::exit(1);
            }
        }
    }
}

async fn insert(store: &Arc<dyn Store>, observation: &LogCountByBlockObservation) -> Result<(), addresses_store::StoreError> {
    let sequence = store.next_log_count_sequence(observation.block_number).await?;
    store
        .upsert_log_count_by_block_number(&LogCountByBlockNumber {
            block_number: observation.block_number,
            sequence,
            transaction_hash: observation.transaction_hash.clone(),
            count: observation.count
        })
        .await
}

#[cfg(test)]
mod tests {
    use addresses_store::InMemoryStore;

    use super::*;

    #[tokio::test]
    async fn redelivered_log_does_not_inflate_the_block_sum() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::default());

        let observation =
            LogCountByBlockObservation { block_number: 7, transaction_hash: "0xabc".to_owned(), count: 3 };
        insert(&store, &observation).await.unwrap();
        insert(&store, &observation).await.unwrap(); // redelivery: duplicate row, same count

        // a second transaction in the same block contributes its own max.
        insert(
            &store,
            &LogCountByBlockObservation { block_number: 7, transaction_hash: "0xdef".to_owned(), count: 2 }
        )
        .await
        .unwrap();

        let sum = store.sum_log_counts_for_block(7).await.unwrap();
        assert_eq!(sum, 5); // max(3, 3) for 0xabc + max(2) for 0xdef, not 3 + 3 + 2
    }
}
