//! The relational store (§3, §4.3): every read/write operation the loader
//! actors, the balance builder, and the reconciliation routines need,
//! behind one trait so tests can swap a real Postgres for an in-memory
//! double the way the teacher's RPC crates swap a mock provider in for a
//! live node.

mod error;
mod memory;
mod postgres;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;

use addresses_types::{
    index, Address, AddressCount, AddressCountType, AddressToken, Balance, Block, Contract,
    GovernancePrep, LogCountByBlockNumber, LogCountByPublicKey, Transaction,
    TransactionCountByBlockNumber, TransactionCountByPublicKey
};

/// Every relational operation the pipeline performs. Implementors upsert
/// following the partial-upsert contract (§4.3.1) for every method except
/// the `insert_*_index` family, which is insert-only and reports
/// [`StoreError::DuplicateKey`] rather than silently ignoring conflicts
/// (§4.3.3).
#[async_trait]
pub trait Store: Send + Sync {
    async fn upsert_address(&self, row: &Address) -> Result<(), StoreError>;
    async fn select_address(&self, public_key: &str) -> Result<Option<Address>, StoreError>;
    async fn select_addresses_page(&self, limit: i64, skip: i64) -> Result<Vec<Address>, StoreError>;

    async fn upsert_balance(&self, row: &Balance) -> Result<(), StoreError>;
    /// The most recent balance for `public_key` at or before `block_number`,
    /// ordered by `(block_number, transaction_index, log_index)` descending
    /// -- the running balance an address had after its last touched
    /// transaction (§4.4).
    async fn select_latest_balance(
        &self,
        public_key: &str,
        max_block_number: i64
    ) -> Result<Option<Balance>, StoreError>;
    /// The exact balance row the balance builder just wrote, used to poll
    /// for read-after-write visibility before advancing its cursor (§4.4).
    async fn select_balance_exact(
        &self,
        public_key: &str,
        block_number: i64,
        transaction_index: i32,
        log_index: i32
    ) -> Result<Option<Balance>, StoreError>;

    async fn upsert_block(&self, row: &Block) -> Result<(), StoreError>;
    async fn select_block(&self, number: i64) -> Result<Option<Block>, StoreError>;
    /// Highest materialized block number, or `-1` if none (§2 supplement:
    /// `SelectLatestBlockNumber`), used by the balance builder to recover
    /// its cursor on restart.
    async fn select_latest_block_number(&self) -> Result<i64, StoreError>;

    async fn upsert_transaction(&self, row: &Transaction) -> Result<(), StoreError>;
    /// All materialized transaction rows for one block, ordered by
    /// `(transaction_index, log_index)`, the order the balance builder
    /// walks them in (§4.4).
    async fn select_transactions_for_block(&self, block_number: i64) -> Result<Vec<Transaction>, StoreError>;
    async fn select_transaction_count_by_block_number(&self, block_number: i64) -> Result<i64, StoreError>;
    /// `sum(max(count) per transaction_hash)` over
    /// `log_count_by_block_numbers` for one block (§4.3.2 block
    /// enrichment).
    async fn sum_log_counts_for_block(&self, block_number: i64) -> Result<i64, StoreError>;

    async fn upsert_address_token(&self, row: &AddressToken) -> Result<(), StoreError>;
    async fn select_address_tokens_for_public_key(&self, public_key: &str) -> Result<Vec<AddressToken>, StoreError>;

    async fn upsert_contract(&self, row: &Contract) -> Result<(), StoreError>;
    async fn select_contract(&self, address: &str) -> Result<Option<Contract>, StoreError>;

    async fn upsert_governance_prep(&self, row: &GovernancePrep) -> Result<(), StoreError>;
    async fn select_governance_prep(&self, address: &str) -> Result<Option<GovernancePrep>, StoreError>;

    async fn upsert_address_count(&self, row: &AddressCount) -> Result<(), StoreError>;
    async fn select_address_count(&self, count_type: AddressCountType) -> Result<Option<AddressCount>, StoreError>;
    /// `COUNT(*)` over the matching index table -- the reconciliation
    /// routine's source of truth when the counter cache has drifted
    /// (§2 supplement: `SelectLargestCount`).
    async fn count_address_count_index(&self, count_type: AddressCountType) -> Result<i64, StoreError>;

    async fn upsert_transaction_count_by_public_key(
        &self,
        row: &TransactionCountByPublicKey
    ) -> Result<(), StoreError>;
    async fn select_transaction_count_by_public_key(
        &self,
        public_key: &str
    ) -> Result<Option<TransactionCountByPublicKey>, StoreError>;
    async fn select_transaction_count_by_public_key_page(
        &self,
        limit: i64,
        skip: i64
    ) -> Result<Vec<TransactionCountByPublicKey>, StoreError>;
    async fn count_transaction_count_by_public_key_index(&self, public_key: &str) -> Result<i64, StoreError>;

    async fn upsert_log_count_by_public_key(&self, row: &LogCountByPublicKey) -> Result<(), StoreError>;
    async fn select_log_count_by_public_key(&self, public_key: &str) -> Result<Option<LogCountByPublicKey>, StoreError>;

    async fn upsert_transaction_count_by_block_number(
        &self,
        row: &TransactionCountByBlockNumber
    ) -> Result<(), StoreError>;
    async fn upsert_log_count_by_block_number(&self, row: &LogCountByBlockNumber) -> Result<(), StoreError>;
    /// Next unused `sequence` value for `block_number`'s
    /// `log_count_by_block_numbers` rows (§4.3.2).
    async fn next_log_count_sequence(&self, block_number: i64) -> Result<i64, StoreError>;

    /// Inserts one insert-only index row (§3, §4.3.3). Returns `Ok(true)`
    /// if the row was newly inserted, `Ok(false)` if it already existed
    /// (the exactly-once counting signal) -- never an `Err` for that case.
    async fn insert_address_count_index(&self, row: &index::AddressCountIndex) -> Result<bool, StoreError>;
    async fn insert_address_contract_count_index(
        &self,
        row: &index::AddressContractCountIndex
    ) -> Result<bool, StoreError>;
    async fn insert_address_token_count_index(&self, row: &index::AddressTokenCountIndex) -> Result<bool, StoreError>;
    async fn insert_transaction_count_by_public_key_index(
        &self,
        row: &index::TransactionCountByPublicKeyIndex
    ) -> Result<bool, StoreError>;
    async fn insert_log_count_by_public_key_index(
        &self,
        row: &index::LogCountByPublicKeyIndex
    ) -> Result<bool, StoreError>;
}
