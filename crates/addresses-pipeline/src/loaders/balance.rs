//! Balance loader (§4.3.2): upserts the balance row, then synchronously
//! triggers an Address re-enrichment for the same `public_key` (I4).

use std::sync::Arc;

use addresses_store::Store;
use addresses_types::Balance;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::{error::SendError, loaders::address::reenrichment_row, AddressLoaderHandle};

#[derive(Clone)]
pub struct BalanceLoaderHandle {
    tx: mpsc::Sender<Balance>
}

impl BalanceLoaderHandle {
    pub async fn enqueue(&self, row: Balance) -> Result<(), SendError> {
        self.tx.send(row).await.map_err(|_| SendError)
    }
}

pub fn spawn(store: Arc<dyn Store>, address_loader: AddressLoaderHandle, capacity: usize) -> BalanceLoaderHandle {
    let (tx, rx) = mpsc::channel(capacity);
    tokio::spawn(run(rx, store, address_loader));
    BalanceLoaderHandle { tx }
}

async fn run(mut rx: mpsc::Receiver<Balance>, store: Arc<dyn Store>, address_loader: AddressLoaderHandle) {
    while let Some(row) = rx.recv().await {
        if let Err(err) = store.upsert_balance(&row).await {
            error!(public_key = %row.public_key, error = %err, "balance loader: fatal store error");
            std::process::exit(1);
        }
        debug!(public_key = %row.public_key, block_number = row.block_number, "balance upserted");

        match reenrichment_row(&store, &row.public_key).await {
            Ok(mut address_row) => {
                address_row.balance = row.value_decimal;
                if address_loader.enqueue(address_row).await.is_err() {
                    error!("balance loader: address loader channel closed");
                    std::process::exit(1);
                }
            }
            Err(err) => {
                error!(public_key = %row.public_key, error = %err, "balance loader: fatal store error reading address");
                std::process::exit(1);
            }
        }
    }
}
