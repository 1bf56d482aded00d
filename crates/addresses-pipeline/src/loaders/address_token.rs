//! AddressToken loader: insert-or-ignore, no enrichment, no triggers (§3).

use std::sync::Arc;

use addresses_store::Store;
use addresses_types::AddressToken;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::SendError;

#[derive(Clone)]
pub struct AddressTokenLoaderHandle {
    tx: mpsc::Sender<AddressToken>
}

impl AddressTokenLoaderHandle {
    pub async fn enqueue(&self, row: AddressToken) -> Result<(), SendError> {
        self.tx.send(row).await.map_err(|_| SendError)
    }
}

pub fn spawn(store: Arc<dyn Store>, capacity: usize) -> AddressTokenLoaderHandle {
    let (tx, rx) = mpsc::channel(capacity);
    tokio::spawn(run(rx, store));
    AddressTokenLoaderHandle { tx }
}

async fn run(mut rx: mpsc::Receiver<AddressToken>, store: Arc<dyn Store>) {
    while let Some(row) = rx.recv().await {
        if let Err(err) = store.upsert_address_token(&row).await {
            error!(public_key = %row.public_key, error = %err, "address token loader: fatal store error");
            std::process::exit(1);
        }
        debug!(public_key = %row.public_key, token = %row.token_contract_address, "address token upserted");
    }
}
