//! Balance reconciliation routine (§4.5): pages through every Address,
//! re-derives its balance from the remote node, and pushes the correction
//! through the Address loader. A single address's RPC failure is logged
//! and skipped; the page keeps advancing.

use std::sync::Arc;

use addresses_node::NodeClient;
use addresses_pipeline::{loaders::address::reenrichment_row, AddressLoaderHandle};
use addresses_store::Store;
use addresses_types::{add_hex, hex_to_decimal};
use tracing::{debug, error, warn};

const PAGE_SIZE: i64 = 500;

pub async fn run(store: Arc<dyn Store>, node: NodeClient, address_loader: AddressLoaderHandle, interval: std::time::Duration) {
    loop {
        if let Err(err) = run_once(&store, &node, &address_loader).await {
            error!(error = %err, "balance reconciliation: fatal store error");
            std::process::exit(1);
        }
        tokio::time::sleep(interval).await;
    }
}

async fn run_once(store: &Arc<dyn Store>, node: &NodeClient, address_loader: &AddressLoaderHandle) -> Result<(), addresses_store::StoreError> {
    let mut skip = 0i64;
    let mut corrected = 0u64;

    loop {
        let page = store.select_addresses_page(PAGE_SIZE, skip).await?;
        if page.is_empty() {
            break
        }

        for address in &page {
            match reconcile_one(store, node, address_loader, &address.public_key).await {
                Ok(()) => corrected += 1,
                Err(err) => warn!(public_key = %address.public_key, error = %err, "balance reconciliation: skipping address")
            }
        }

        skip += page.len() as i64;
    }

    addresses_metrics::record_reconciliation_pass("balance", corrected);
    debug!(corrected, "balance reconciliation pass complete");
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum ReconcileOneError {
    #[error(transparent)]
    Rpc(#[from] addresses_node::NodeRpcError),
    #[error(transparent)]
    HexNum(#[from] addresses_types::HexNumError),
    #[error(transparent)]
    Store(#[from] addresses_store::StoreError),
    #[error("address loader channel closed")]
    LoaderChannelClosed
}

async fn reconcile_one(
    store: &Arc<dyn Store>,
    node: &NodeClient,
    address_loader: &AddressLoaderHandle,
    public_key: &str
) -> Result<(), ReconcileOneError> {
    let balance = node.get_balance(public_key).await?;
    let staked = node.get_staked_balance(public_key).await?;
    let total = add_hex(&balance, &staked)?;
    let decimal = hex_to_decimal(&total)?;

    let mut row = reenrichment_row(store, public_key).await?;
    row.balance = decimal;

    address_loader.enqueue(row).await.map_err(|_| ReconcileOneError::LoaderChannelClosed)
}
