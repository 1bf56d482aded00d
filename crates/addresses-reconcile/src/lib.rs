//! Periodic reconciliation routines (§4.5) correcting drift between the
//! derived tables and their sources of truth -- the remote node for
//! balances, the index tables for counts. None of these ever delete rows;
//! they only overwrite counts and balances with freshly recomputed ones.

pub mod address_count;
pub mod balance;
pub mod transaction_count;

use std::{sync::Arc, time::Duration};

use addresses_cache::CounterCache;
use addresses_node::NodeClient;
use addresses_pipeline::AddressLoaderHandle;
use addresses_store::Store;

/// Intervals the three routines run on, one per routine (§6).
pub struct ReconcileIntervals {
    pub balance: Duration,
    pub transaction_count: Duration,
    pub address_count: Duration
}

/// Spawns all three reconciliation routines as independent background
/// tasks; none of them communicate with each other.
pub fn spawn(
    store: Arc<dyn Store>,
    cache: Arc<dyn CounterCache>,
    node: NodeClient,
    address_loader: AddressLoaderHandle,
    intervals: ReconcileIntervals
) {
    tokio::spawn(balance::run(store.clone(), node, address_loader, intervals.balance));
    tokio::spawn(transaction_count::run(store.clone(), cache.clone(), intervals.transaction_count));
    tokio::spawn(address_count::run(store, cache, intervals.address_count));
}
