//! Contract loader (§4.3.2): upsert, then trigger an Address re-enrichment.

use std::sync::Arc;

use addresses_store::Store;
use addresses_types::Contract;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::{error::SendError, loaders::address::reenrichment_row, AddressLoaderHandle};

#[derive(Clone)]
pub struct ContractLoaderHandle {
    tx: mpsc::Sender<Contract>
}

impl ContractLoaderHandle {
    pub async fn enqueue(&self, row: Contract) -> Result<(), SendError> {
        self.tx.send(row).await.map_err(|_| SendError)
    }
}

pub fn spawn(store: Arc<dyn Store>, address_loader: AddressLoaderHandle, capacity: usize) -> ContractLoaderHandle {
    let (tx, rx) = mpsc::channel(capacity);
    tokio::spawn(run(rx, store, address_loader));
    ContractLoaderHandle { tx }
}

async fn run(mut rx: mpsc::Receiver<Contract>, store: Arc<dyn Store>, address_loader: AddressLoaderHandle) {
    while let Some(row) = rx.recv().await {
        if let Err(err) = store.upsert_contract(&row).await {
            error!(address = %row.address, error = %err, "contract loader: fatal store error");
            std::process::exit(1);
        }
        debug!(address = %row.address, "contract upserted");

        match reenrichment_row(&store, &row.address).await {
            Ok(address_row) => {
                if address_loader.enqueue(address_row).await.is_err() {
                    error!("contract loader: address loader channel closed");
                    std::process::exit(1);
                }
            }
            Err(err) => {
                error!(address = %row.address, error = %err, "contract loader: fatal store error reading address");
                std::process::exit(1);
            }
        }
    }
}
