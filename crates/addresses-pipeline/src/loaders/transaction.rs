//! Transaction loader: a plain partial upsert (§4.3.1), written from both
//! the transactions transformer (`log_index = -1`) and the logs
//! transformer's internal-transfer rows (`log_index >= 0`). No
//! cross-entity triggers (§4.3.2 lists none for this table).

use std::sync::Arc;

use addresses_store::Store;
use addresses_types::Transaction;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::SendError;

#[derive(Clone)]
pub struct TransactionLoaderHandle {
    tx: mpsc::Sender<Transaction>
}

impl TransactionLoaderHandle {
    pub async fn enqueue(&self, row: Transaction) -> Result<(), SendError> {
        self.tx.send(row).await.map_err(|_| SendError)
    }
}

pub fn spawn(store: Arc<dyn Store>, capacity: usize) -> TransactionLoaderHandle {
    let (tx, rx) = mpsc::channel(capacity);
    tokio::spawn(run(rx, store));
    TransactionLoaderHandle { tx }
}

async fn run(mut rx: mpsc::Receiver<Transaction>, store: Arc<dyn Store>) {
    while let Some(row) = rx.recv().await {
        if let Err(err) = store.upsert_transaction(&row).await {
            error!(hash = %row.hash, log_index = row.log_index, error = %err, "transaction loader: fatal store error");
            std::process::exit(1);
        }
        debug!(hash = %row.hash, log_index = row.log_index, "transaction upserted");
    }
}
