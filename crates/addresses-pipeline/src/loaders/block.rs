//! Block loader (§4.3.2): before every upsert it reads the per-transaction
//! max log counts accumulated for its block and sums them into
//! `log_count`, so replaying the same log any number of times converges to
//! the same total (the MAX-per-transaction-hash aggregation absorbs
//! duplicates; see `addresses-store`'s `sum_log_counts_for_block`).

use std::sync::Arc;

use addresses_store::Store;
use addresses_types::Block;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::SendError;

#[derive(Clone)]
pub struct BlockLoaderHandle {
    tx: mpsc::Sender<Block>
}

impl BlockLoaderHandle {
    pub async fn enqueue(&self, row: Block) -> Result<(), SendError> {
        self.tx.send(row).await.map_err(|_| SendError)
    }
}

pub fn spawn(store: Arc<dyn Store>, capacity: usize) -> BlockLoaderHandle {
    let (tx, rx) = mpsc::channel(capacity);
    tokio::spawn(run(rx, store));
    BlockLoaderHandle { tx }
}

async fn run(mut rx: mpsc::Receiver<Block>, store: Arc<dyn Store>) {
    while let Some(mut row) = rx.recv().await {
        if let Err(err) = enrich_and_upsert(&store, &mut row).await {
            error!(number = row.number, error = %err, "block loader: fatal store error");
            std::process::exit(1);
        }
        debug!(number = row.number, "block upserted");
    }
}

async fn enrich_and_upsert(store: &Arc<dyn Store>, row: &mut Block) -> Result<(), addresses_store::StoreError> {
    let log_count = store.sum_log_counts_for_block(row.number).await?;
    if log_count > 0 {
        row.log_count = log_count;
    }
    store.upsert_block(row).await
}

/// Builds the re-enrichment message for `block_number` (§4.3.2).
pub async fn reenrichment_row(store: &Arc<dyn Store>, block_number: i64) -> Result<Block, addresses_store::StoreError> {
    Ok(store.select_block(block_number).await?.unwrap_or_else(|| Block::empty(block_number)))
}
