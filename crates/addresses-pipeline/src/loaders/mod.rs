//! One module per derived table (§4.3). Each exposes a `spawn` function
//! returning a cheap, cloneable `*Handle` and a background task that owns
//! the table's write path exclusively -- no two loaders ever write the
//! same table (§5).

pub mod address;
pub mod address_count;
pub mod address_token;
pub mod balance;
pub mod block;
pub mod contract;
pub mod governance_prep;
pub mod log_count_by_block_number;
pub mod log_count_by_public_key;
pub mod transaction;
pub mod transaction_count_by_block_number;
pub mod transaction_count_by_public_key;

pub use address::AddressLoaderHandle;
pub use address_count::{AddressCountLoaderHandle, AddressCountObservation};
pub use address_token::AddressTokenLoaderHandle;
pub use balance::BalanceLoaderHandle;
pub use block::BlockLoaderHandle;
pub use contract::ContractLoaderHandle;
pub use governance_prep::GovernancePrepLoaderHandle;
pub use log_count_by_block_number::{LogCountByBlockNumberLoaderHandle, LogCountByBlockObservation};
pub use log_count_by_public_key::{LogCountByPublicKeyLoaderHandle, LogCountObservation};
pub use transaction::TransactionLoaderHandle;
pub use transaction_count_by_block_number::TransactionCountByBlockNumberLoaderHandle;
pub use transaction_count_by_public_key::{TransactionCountByPublicKeyLoaderHandle, TransactionCountObservation};

use std::sync::Arc;

use addresses_cache::CounterCache;
use addresses_store::Store;

/// Every loader handle a transformer might address, bundled for
/// convenient wiring in the worker binary.
#[derive(Clone)]
pub struct Loaders {
    pub address: AddressLoaderHandle,
    pub address_count: AddressCountLoaderHandle,
    pub address_token: AddressTokenLoaderHandle,
    pub balance: BalanceLoaderHandle,
    pub block: BlockLoaderHandle,
    pub contract: ContractLoaderHandle,
    pub governance_prep: GovernancePrepLoaderHandle,
    pub log_count_by_block_number: LogCountByBlockNumberLoaderHandle,
    pub log_count_by_public_key: LogCountByPublicKeyLoaderHandle,
    pub transaction: TransactionLoaderHandle,
    pub transaction_count_by_block_number: TransactionCountByBlockNumberLoaderHandle,
    pub transaction_count_by_public_key: TransactionCountByPublicKeyLoaderHandle
}

impl Loaders {
    /// Spawns every loader's background task, wiring the cross-loader
    /// triggers from §4.3.2 (balance/contract/governance-prep/counters all
    /// hold a handle back to the address loader; log-count-by-block holds
    /// a handle back to the block loader).
    pub fn spawn(store: Arc<dyn Store>, cache: Arc<dyn CounterCache>, queue_capacity: usize) -> Self {
        let address = address::spawn(store.clone(), queue_capacity);
        let block = block::spawn(store.clone(), queue_capacity);

        Self {
            balance: balance::spawn(store.clone(), address.clone(), queue_capacity),
            contract: contract::spawn(store.clone(), address.clone(), queue_capacity),
            governance_prep: governance_prep::spawn(store.clone(), address.clone(), queue_capacity),
            address_count: address_count::spawn(store.clone(), cache.clone(), queue_capacity),
            transaction_count_by_public_key: transaction_count_by_public_key::spawn(
                store.clone(),
                cache.clone(),
                address.clone(),
                queue_capacity
            ),
            log_count_by_public_key: log_count_by_public_key::spawn(
                store.clone(),
                cache,
                address.clone(),
                queue_capacity
            ),
            log_count_by_block_number: log_count_by_block_number::spawn(store.clone(), block.clone(), queue_capacity),
            address_token: address_token::spawn(store.clone(), queue_capacity),
            transaction: transaction::spawn(store.clone(), queue_capacity),
            transaction_count_by_block_number: transaction_count_by_block_number::spawn(store, queue_capacity),
            address,
            block
        }
    }
}
