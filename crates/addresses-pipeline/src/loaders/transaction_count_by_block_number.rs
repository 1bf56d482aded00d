//! TransactionCountByBlockNumber loader: each transaction carries its own
//! `transaction_index`, so the inbound count (`transaction_index + 1`) is
//! a lower bound on the block's true transaction count rather than an
//! increment. Merging by maximum rather than overwriting keeps the result
//! independent of delivery order and duplication (I3).

use std::sync::Arc;

use addresses_store::Store;
use addresses_types::TransactionCountByBlockNumber;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::SendError;

#[derive(Clone)]
pub struct TransactionCountByBlockNumberLoaderHandle {
    tx: mpsc::Sender<TransactionCountByBlockNumber>
}

impl TransactionCountByBlockNumberLoaderHandle {
    pub async fn enqueue(&self, row: TransactionCountByBlockNumber) -> Result<(), SendError> {
        self.tx.send(row).await.map_err(|_| SendError)
    }
}

pub fn spawn(store: Arc<dyn Store>, capacity: usize) -> TransactionCountByBlockNumberLoaderHandle {
    let (tx, rx) = mpsc::channel(capacity);
    tokio::spawn(run(rx, store));
    TransactionCountByBlockNumberLoaderHandle { tx }
}

async fn run(mut rx: mpsc::Receiver<TransactionCountByBlockNumber>, store: Arc<dyn Store>) {
    while let Some(row) = rx.recv().await {
        if let Err(err) = merge_and_upsert(&store, row.clone()).await {
            error!(block_number = row.block_number, error = %err, "transaction count by block loader: fatal error");
            std::process::exit(1);
        }
        debug!(block_number = row.block_number, "transaction count by block upserted");
    }
}

async fn merge_and_upsert(
    store: &Arc<dyn Store>,
    row: TransactionCountByBlockNumber
) -> Result<(), addresses_store::StoreError> {
    let current = store.select_transaction_count_by_block_number(row.block_number).await?;
    let merged = row.count.max(current);
    store
        .upsert_transaction_count_by_block_number(&TransactionCountByBlockNumber {
            block_number: row.block_number,
            count: merged
        })
        .await
}

#[cfg(test)]
mod tests {
    use addresses_store::InMemoryStore;

    use super::*;

    #[tokio::test]
    async fn out_of_order_and_duplicate_delivery_converge_to_the_max() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::default());

        // transaction_index 0, 2, 1 arriving out of order, with index 2
        // redelivered once.
        for transaction_index in [0, 2, 1, 2] {
            merge_and_upsert(
                &store,
                TransactionCountByBlockNumber { block_number: 5, count: transaction_index + 1 }
            )
            .await
            .unwrap();
        }

        let count = store.select_transaction_count_by_block_number(5).await.unwrap();
        assert_eq!(count, 3);
    }
}
