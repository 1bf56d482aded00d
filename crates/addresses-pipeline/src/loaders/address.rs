//! Address loader (§4.3.2): the only loader every other loader re-enriches
//! through. On each dequeued row it reads the counters and any matching
//! `Contract`/`GovernancePrep` rows for the same `public_key`, merges them
//! into the inbound row, and upserts.

use std::sync::Arc;

use addresses_store::Store;
use addresses_types::Address;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::SendError;

#[derive(Clone)]
pub struct AddressLoaderHandle {
    tx: mpsc::Sender<Address>
}

impl AddressLoaderHandle {
    pub async fn enqueue(&self, row: Address) -> Result<(), SendError> {
        self.tx.send(row).await.map_err(|_| SendError)
    }
}

pub fn spawn(store: Arc<dyn Store>, capacity: usize) -> AddressLoaderHandle {
    let (tx, rx) = mpsc::channel(capacity);
    tokio::spawn(run(rx, store));
    AddressLoaderHandle { tx }
}

async fn run(mut rx: mpsc::Receiver<Address>, store: Arc<dyn Store>) {
    while let Some(mut row) = rx.recv().await {
        if let Err(err) = enrich_and_upsert(&store, &mut row).await {
            error!(public_key = %row.public_key, error = %err, "address loader: fatal store error");
            std::process::exit(1);
        }
        debug!(public_key = %row.public_key, "address upserted");
    }
}

async fn enrich_and_upsert(store: &Arc<dyn Store>, row: &mut Address) -> Result<(), addresses_store::StoreError> {
    if let Some(tx_count) = store.select_transaction_count_by_public_key(&row.public_key).await? {
        row.transaction_count = tx_count.count;
    }
    if let Some(log_count) = store.select_log_count_by_public_key(&row.public_key).await? {
        row.log_count = log_count.count;
    }
    if let Some(contract) = store.select_contract(&row.public_key).await? {
        if !contract.name.is_empty() {
            row.name = contract.name;
        }
        if contract.created_timestamp != 0 {
            row.created_timestamp = contract.created_timestamp;
        }
        if !contract.status.is_empty() {
            row.status = contract.status;
        }
        row.is_token = row.is_token || contract.is_token;
    }
    if let Some(prep) = store.select_governance_prep(&row.public_key).await? {
        row.is_prep = row.is_prep || prep.is_prep;
    }

    store.upsert_address(row).await
}

/// Builds the re-enrichment message for `public_key`: the current row if
/// one exists, or an empty row keyed only by the identifier otherwise
/// (§4.3.2).
pub async fn reenrichment_row(store: &Arc<dyn Store>, public_key: &str) -> Result<Address, addresses_store::StoreError> {
    Ok(store.select_address(public_key).await?.unwrap_or_else(|| Address::empty(public_key)))
}
