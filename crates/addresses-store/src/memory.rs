//! An in-memory [`Store`] for tests: the pipeline, balance builder, and
//! reconciliation routines exercise the exact same trait a Postgres-backed
//! worker would, without a live database, the way the teacher's RPC crates
//! swap a mock provider in for a live node in their own unit tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use addresses_types::{
    index, Address, AddressCount, AddressCountType, AddressToken, Balance, Block, Contract,
    GovernancePrep, LogCountByBlockNumber, LogCountByPublicKey, Transaction,
    TransactionCountByBlockNumber, TransactionCountByPublicKey
};

use crate::{Store, StoreError};

#[derive(Default)]
struct Inner {
    addresses: HashMap<String, Address>,
    balances: HashMap<(i64, i32, i32, String), Balance>,
    blocks: HashMap<i64, Block>,
    transactions: HashMap<(String, i32), Transaction>,
    address_tokens: HashMap<(String, String), AddressToken>,
    contracts: HashMap<String, Contract>,
    governance_preps: HashMap<String, GovernancePrep>,
    address_counts: HashMap<AddressCountType, AddressCount>,
    transaction_count_by_public_key: HashMap<String, TransactionCountByPublicKey>,
    log_count_by_public_key: HashMap<String, LogCountByPublicKey>,
    transaction_count_by_block_number: HashMap<i64, TransactionCountByBlockNumber>,
    log_count_by_block_number: HashMap<(i64, i64), LogCountByBlockNumber>,
    address_count_index: HashSet<(String, String)>,
    address_contract_count_index: HashSet<String>,
    address_token_count_index: HashSet<String>,
    transaction_count_by_public_key_index: HashSet<(String, String, i32)>,
    log_count_by_public_key_index: HashSet<(String, String, i32)>
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>
}

#[async_trait]
impl Store for InMemoryStore {
    async fn upsert_address(&self, row: &Address) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let entry = inner.addresses.entry(row.public_key.clone()).or_default();
        merge_non_zero_address(entry, row);
        Ok(())
    }

    async fn select_address(&self, public_key: &str) -> Result<Option<Address>, StoreError> {
        Ok(self.inner.lock().addresses.get(public_key).cloned())
    }

    async fn select_addresses_page(&self, limit: i64, skip: i64) -> Result<Vec<Address>, StoreError> {
        let inner = self.inner.lock();
        let mut rows: Vec<Address> = inner.addresses.values().cloned().collect();
        rows.sort_by(|a, b| a.public_key.cmp(&b.public_key));
        Ok(rows.into_iter().skip(skip as usize).take(limit as usize).collect())
    }

    async fn upsert_balance(&self, row: &Balance) -> Result<(), StoreError> {
        let key = (row.block_number, row.transaction_index, row.log_index, row.public_key.clone());
        self.inner.lock().balances.insert(key, row.clone());
        Ok(())
    }

    async fn select_latest_balance(
        &self,
        public_key: &str,
        max_block_number: i64
    ) -> Result<Option<Balance>, StoreError> {
        let inner = self.inner.lock();
        let mut candidates: Vec<&Balance> = inner
            .balances
            .values()
            .filter(|b| b.public_key == public_key && b.block_number <= max_block_number)
            .collect();
        candidates.sort_by_key(|b| (b.block_number, b.transaction_index, b.log_index));
        Ok(candidates.last().map(|b| (*b).clone()))
    }

    async fn select_balance_exact(
        &self,
        public_key: &str,
        block_number: i64,
        transaction_index: i32,
        log_index: i32
    ) -> Result<Option<Balance>, StoreError> {
        let key = (block_number, transaction_index, log_index, public_key.to_owned());
        Ok(self.inner.lock().balances.get(&key).cloned())
    }

    async fn upsert_block(&self, row: &Block) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let entry = inner.blocks.entry(row.number).or_insert_with(|| Block::empty(row.number));
        if row.transaction_count != 0 {
            entry.transaction_count = row.transaction_count;
        }
        if row.log_count != 0 {
            entry.log_count = row.log_count;
        }
        Ok(())
    }

    async fn select_block(&self, number: i64) -> Result<Option<Block>, StoreError> {
        Ok(self.inner.lock().blocks.get(&number).cloned())
    }

    async fn select_latest_block_number(&self) -> Result<i64, StoreError> {
        Ok(self.inner.lock().blocks.keys().max().copied().unwrap_or(-1))
    }

    async fn upsert_transaction(&self, row: &Transaction) -> Result<(), StoreError> {
        let key = (row.hash.clone(), row.log_index);
        let mut inner = self.inner.lock();
        let entry = inner.transactions.entry(key).or_default();
        merge_non_zero_transaction(entry, row);
        Ok(())
    }

    async fn select_transactions_for_block(&self, block_number: i64) -> Result<Vec<Transaction>, StoreError> {
        let inner = self.inner.lock();
        let mut rows: Vec<Transaction> =
            inner.transactions.values().filter(|t| t.block_number == block_number).cloned().collect();
        rows.sort_by_key(|t| (t.transaction_index, t.log_index));
        Ok(rows)
    }

    async fn select_transaction_count_by_block_number(&self, block_number: i64) -> Result<i64, StoreError> {
        Ok(self
            .inner
            .lock()
            .transaction_count_by_block_number
            .get(&block_number)
            .map(|r| r.count)
            .unwrap_or(0))
    }

    async fn sum_log_counts_for_block(&self, block_number: i64) -> Result<i64, StoreError> {
        let inner = self.inner.lock();
        let mut max_per_hash: HashMap<String, i64> = HashMap::new();
        for row in inner.log_count_by_block_number.values().filter(|r| r.block_number == block_number) {
            let slot = max_per_hash.entry(row.transaction_hash.clone()).or_insert(0);
            *slot = (*slot).max(row.count);
        }
        Ok(max_per_hash.values().sum())
    }

    async fn upsert_address_token(&self, row: &AddressToken) -> Result<(), StoreError> {
        let key = (row.public_key.clone(), row.token_contract_address.clone());
        self.inner.lock().address_tokens.entry(key).or_insert_with(|| row.clone());
        Ok(())
    }

    async fn select_address_tokens_for_public_key(&self, public_key: &str) -> Result<Vec<AddressToken>, StoreError> {
        Ok(self
            .inner
            .lock()
            .address_tokens
            .values()
            .filter(|t| t.public_key == public_key)
            .cloned()
            .collect())
    }

    async fn upsert_contract(&self, row: &Contract) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let entry = inner.contracts.entry(row.address.clone()).or_default();
        merge_non_zero_contract(entry, row);
        Ok(())
    }

    async fn select_contract(&self, address: &str) -> Result<Option<Contract>, StoreError> {
        Ok(self.inner.lock().contracts.get(address).cloned())
    }

    async fn upsert_governance_prep(&self, row: &GovernancePrep) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let entry = inner.governance_preps.entry(row.address.clone()).or_default();
        if row.is_prep {
            entry.address = row.address.clone();
            entry.is_prep = true;
        }
        Ok(())
    }

    async fn select_governance_prep(&self, address: &str) -> Result<Option<GovernancePrep>, StoreError> {
        Ok(self.inner.lock().governance_preps.get(address).cloned())
    }

    async fn upsert_address_count(&self, row: &AddressCount) -> Result<(), StoreError> {
        self.inner.lock().address_counts.insert(row.count_type, row.clone());
        Ok(())
    }

    async fn select_address_count(&self, count_type: AddressCountType) -> Result<Option<AddressCount>, StoreError> {
        Ok(self.inner.lock().address_counts.get(&count_type).cloned())
    }

    async fn count_address_count_index(&self, count_type: AddressCountType) -> Result<i64, StoreError> {
        let inner = self.inner.lock();
        Ok(match count_type {
            AddressCountType::All => inner.address_count_index.len() as i64,
            AddressCountType::Contract => inner.address_contract_count_index.len() as i64,
            AddressCountType::Token => inner.address_token_count_index.len() as i64
        })
    }

    async fn upsert_transaction_count_by_public_key(
        &self,
        row: &TransactionCountByPublicKey
    ) -> Result<(), StoreError> {
        self.inner.lock().transaction_count_by_public_key.insert(row.public_key.clone(), row.clone());
        Ok(())
    }

    async fn select_transaction_count_by_public_key(
        &self,
        public_key: &str
    ) -> Result<Option<TransactionCountByPublicKey>, StoreError> {
        Ok(self.inner.lock().transaction_count_by_public_key.get(public_key).cloned())
    }

    async fn select_transaction_count_by_public_key_page(
        &self,
        limit: i64,
        skip: i64
    ) -> Result<Vec<TransactionCountByPublicKey>, StoreError> {
        let inner = self.inner.lock();
        let mut rows: Vec<TransactionCountByPublicKey> = inner.transaction_count_by_public_key.values().cloned().collect();
        rows.sort_by(|a, b| a.public_key.cmp(&b.public_key));
        Ok(rows.into_iter().skip(skip as usize).take(limit as usize).collect())
    }

    async fn count_transaction_count_by_public_key_index(&self, public_key: &str) -> Result<i64, StoreError> {
        Ok(self
            .inner
            .lock()
            .transaction_count_by_public_key_index
            .iter()
            .filter(|(pk, _, _)| pk == public_key)
            .count() as i64)
    }

    async fn upsert_log_count_by_public_key(&self, row: &LogCountByPublicKey) -> Result<(), StoreError> {
        self.inner.lock().log_count_by_public_key.insert(row.public_key.clone(), row.clone());
        Ok(())
    }

    async fn select_log_count_by_public_key(
        &self,
        public_key: &str
    ) -> Result<Option<LogCountByPublicKey>, StoreError> {
        Ok(self.inner.lock().log_count_by_public_key.get(public_key).cloned())
    }

    async fn upsert_transaction_count_by_block_number(
        &self,
        row: &TransactionCountByBlockNumber
    ) -> Result<(), StoreError> {
        self.inner.lock().transaction_count_by_block_number.insert(row.block_number, row.clone());
        Ok(())
    }

    async fn upsert_log_count_by_block_number(&self, row: &LogCountByBlockNumber) -> Result<(), StoreError> {
        let key = (row.block_number, row.sequence);
        self.inner.lock().log_count_by_block_number.insert(key, row.clone());
        Ok(())
    }

    async fn next_log_count_sequence(&self, block_number: i64) -> Result<i64, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .log_count_by_block_number
            .keys()
            .filter(|(b, _)| *b == block_number)
            .map(|(_, seq)| *seq)
            .max()
            .map(|max| max + 1)
            .unwrap_or(0))
    }

    async fn insert_address_count_index(&self, row: &index::AddressCountIndex) -> Result<bool, StoreError> {
        let key = (row.count_type.as_str().to_owned(), row.public_key.clone());
        Ok(self.inner.lock().address_count_index.insert(key))
    }

    async fn insert_address_contract_count_index(
        &self,
        row: &index::AddressContractCountIndex
    ) -> Result<bool, StoreError> {
        Ok(self.inner.lock().address_contract_count_index.insert(row.public_key.clone()))
    }

    async fn insert_address_token_count_index(&self, row: &index::AddressTokenCountIndex) -> Result<bool, StoreError> {
        Ok(self.inner.lock().address_token_count_index.insert(row.public_key.clone()))
    }

    async fn insert_transaction_count_by_public_key_index(
        &self,
        row: &index::TransactionCountByPublicKeyIndex
    ) -> Result<bool, StoreError> {
        let key = (row.public_key.clone(), row.hash.clone(), row.log_index);
        Ok(self.inner.lock().transaction_count_by_public_key_index.insert(key))
    }

    async fn insert_log_count_by_public_key_index(
        &self,
        row: &index::LogCountByPublicKeyIndex
    ) -> Result<bool, StoreError> {
        let key = (row.public_key.clone(), row.hash.clone(), row.log_index);
        Ok(self.inner.lock().log_count_by_public_key_index.insert(key))
    }
}

fn merge_non_zero_address(entry: &mut Address, row: &Address) {
    if !row.public_key.is_empty() {
        entry.public_key = row.public_key.clone();
    }
    if row.is_contract {
        entry.is_contract = true;
    }
    if row.transaction_count != 0 {
        entry.transaction_count = row.transaction_count;
    }
    if row.log_count != 0 {
        entry.log_count = row.log_count;
    }
    if row.balance != 0.0 {
        entry.balance = row.balance;
    }
    if !row.name.is_empty() {
        entry.name = row.name.clone();
    }
    if row.created_timestamp != 0 {
        entry.created_timestamp = row.created_timestamp;
    }
    if !row.status.is_empty() {
        entry.status = row.status.clone();
    }
    if row.is_token {
        entry.is_token = true;
    }
    if row.is_prep {
        entry.is_prep = true;
    }
}

fn merge_non_zero_transaction(entry: &mut Transaction, row: &Transaction) {
    if !row.hash.is_empty() {
        entry.hash = row.hash.clone();
    }
    entry.log_index = row.log_index;
    if !row.from_address.is_empty() {
        entry.from_address = row.from_address.clone();
    }
    if !row.to_address.is_empty() {
        entry.to_address = row.to_address.clone();
    }
    if !row.value.is_empty() {
        entry.value = row.value.clone();
    }
    if row.block_number != 0 {
        entry.block_number = row.block_number;
    }
    if row.transaction_index != 0 {
        entry.transaction_index = row.transaction_index;
    }
    if row.block_timestamp != 0 {
        entry.block_timestamp = row.block_timestamp;
    }
    if !row.transaction_fee.is_empty() {
        entry.transaction_fee = row.transaction_fee.clone();
    }
}

fn merge_non_zero_contract(entry: &mut Contract, row: &Contract) {
    if !row.address.is_empty() {
        entry.address = row.address.clone();
    }
    if !row.name.is_empty() {
        entry.name = row.name.clone();
    }
    if row.created_timestamp != 0 {
        entry.created_timestamp = row.created_timestamp;
    }
    if !row.status.is_empty() {
        entry.status = row.status.clone();
    }
    if row.is_token {
        entry.is_token = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn partial_upsert_does_not_clobber_unset_fields() {
        let store = InMemoryStore::default();
        store
            .upsert_address(&Address { public_key: "hx1".into(), name: "alice".into(), ..Default::default() })
            .await
            .unwrap();
        store
            .upsert_address(&Address { public_key: "hx1".into(), transaction_count: 5, ..Default::default() })
            .await
            .unwrap();

        let row = store.select_address("hx1").await.unwrap().unwrap();
        assert_eq!(row.name, "alice");
        assert_eq!(row.transaction_count, 5);
    }

    #[tokio::test]
    async fn insert_only_index_reports_duplicates() {
        let store = InMemoryStore::default();
        let row = index::AddressCountIndex { count_type: AddressCountType::All, public_key: "hx1".into() };
        assert!(store.insert_address_count_index(&row).await.unwrap());
        assert!(!store.insert_address_count_index(&row).await.unwrap());
        assert_eq!(store.count_address_count_index(AddressCountType::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn latest_balance_respects_ordering() {
        let store = InMemoryStore::default();
        store
            .upsert_balance(&Balance {
                block_number: 1,
                transaction_index: 0,
                log_index: -1,
                public_key: "hx1".into(),
                value: "0x10".into(),
                value_decimal: 16.0,
                timestamp: 100
            })
            .await
            .unwrap();
        store
            .upsert_balance(&Balance {
                block_number: 2,
                transaction_index: 0,
                log_index: -1,
                public_key: "hx1".into(),
                value: "0x20".into(),
                value_decimal: 32.0,
                timestamp: 200
            })
            .await
            .unwrap();

        let latest = store.select_latest_balance("hx1", 10).await.unwrap().unwrap();
        assert_eq!(latest.value, "0x20");

        let capped = store.select_latest_balance("hx1", 1).await.unwrap().unwrap();
        assert_eq!(capped.value, "0x10");
    }
}
