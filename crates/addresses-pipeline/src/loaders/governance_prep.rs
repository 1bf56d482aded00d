//! GovernancePrep loader: same lifecycle as the contract loader (§4.3.2) --
//! upsert, then trigger an Address re-enrichment.

use std::sync::Arc;

use addresses_store::Store;
use addresses_types::GovernancePrep;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::{error::SendError, loaders::address::reenrichment_row, AddressLoaderHandle};

#[derive(Clone)]
pub struct GovernancePrepLoaderHandle {
    tx: mpsc::Sender<GovernancePrep>
}

impl GovernancePrepLoaderHandle {
    pub async fn enqueue(&self, row: GovernancePrep) -> Result<(), SendError> {
        self.tx.send(row).await.map_err(|_| SendError)
    }
}

pub fn spawn(
    store: Arc<dyn Store>,
    address_loader: AddressLoaderHandle,
    capacity: usize
) -> GovernancePrepLoaderHandle {
    let (tx, rx) = mpsc::channel(capacity);
    tokio::spawn(run(rx, store, address_loader));
    GovernancePrepLoaderHandle { tx }
}

async fn run(mut rx: mpsc::Receiver<GovernancePrep>, store: Arc<dyn Store>, address_loader: AddressLoaderHandle) {
    while let Some(row) = rx.recv().await {
        if let Err(err) = store.upsert_governance_prep(&row).await {
            error!(address = %row.address, error = %err, "governance prep loader: fatal store error");
            std::process::exit(1);
        }
        debug!(address = %row.address, "governance prep upserted");

        match reenrichment_row(&store, &row.address).await {
            Ok(address_row) => {
                if address_loader.enqueue(address_row).await.is_err() {
                    error!("governance prep loader: address loader channel closed");
                    std::process::exit(1);
                }
            }
            Err(err) => {
                error!(address = %row.address, error = %err, "governance prep loader: fatal store error reading address");
                std::process::exit(1);
            }
        }
    }
}
