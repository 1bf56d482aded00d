//! Derived table row types (§3) and their partial-upsert projections.

use serde::{Deserialize, Serialize};

use crate::upsert::{non_zero, ColumnValue, UpsertRow};

/// `Address` — created on first sighting via transaction or log; mutated
/// on every upsert and on every re-enrichment trigger; never deleted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub public_key: String,
    pub is_contract: bool,
    pub transaction_count: i64,
    pub log_count: i64,
    pub balance: f64,
    pub name: String,
    pub created_timestamp: i64,
    pub status: String,
    pub is_token: bool,
    pub is_prep: bool
}

impl Address {
    /// An empty row keyed only by `public_key`, used when a re-enrichment
    /// trigger fires for an address that hasn't been seen yet (§4.3.2):
    /// the loader will populate the rest from its enrichment sources.
    pub fn empty(public_key: impl Into<String>) -> Self {
        Self { public_key: public_key.into(), ..Default::default() }
    }
}

impl UpsertRow for Address {
    fn table_name() -> &'static str {
        "addresses"
    }

    fn primary_key_columns() -> &'static [&'static str] {
        &["public_key"]
    }

    fn primary_key_values(&self) -> Vec<ColumnValue> {
        vec![ColumnValue::Text(self.public_key.clone())]
    }

    fn set_columns(&self) -> Vec<(&'static str, ColumnValue)> {
        non_zero(vec![
            ("is_contract", ColumnValue::Bool(self.is_contract)),
            ("transaction_count", ColumnValue::I64(self.transaction_count)),
            ("log_count", ColumnValue::I64(self.log_count)),
            ("balance", ColumnValue::F64(self.balance)),
            ("name", ColumnValue::Text(self.name.clone())),
            ("created_timestamp", ColumnValue::I64(self.created_timestamp)),
            ("status", ColumnValue::Text(self.status.clone())),
            ("is_token", ColumnValue::Bool(self.is_token)),
            ("is_prep", ColumnValue::Bool(self.is_prep)),
        ])
    }
}

/// `Balance` — created by the balance builder per participating address
/// per transaction; immutable except via upsert replay. Per §4.3.1's
/// exception, every column is written on conflict: zero is a legitimate
/// value for every field here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub block_number: i64,
    pub transaction_index: i32,
    pub log_index: i32,
    pub public_key: String,
    pub value: String,
    pub value_decimal: f64,
    pub timestamp: i64
}

impl UpsertRow for Balance {
    fn table_name() -> &'static str {
        "balances"
    }

    fn primary_key_columns() -> &'static [&'static str] {
        &["block_number", "transaction_index", "log_index", "public_key"]
    }

    fn primary_key_values(&self) -> Vec<ColumnValue> {
        vec![
            ColumnValue::I64(self.block_number),
            ColumnValue::I32(self.transaction_index),
            ColumnValue::I32(self.log_index),
            ColumnValue::Text(self.public_key.clone()),
        ]
    }

    fn set_columns(&self) -> Vec<(&'static str, ColumnValue)> {
        // Exception to the non-zero rule: every column carries signal.
        vec![
            ("value", ColumnValue::Text(self.value.clone())),
            ("value_decimal", ColumnValue::F64(self.value_decimal)),
            ("timestamp", ColumnValue::I64(self.timestamp)),
        ]
    }
}

/// `Block` (materialized) — created on block event; `log_count` enriched
/// from `LogCountByBlockNumber` rows (§4.3.2).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub number: i64,
    pub transaction_count: i64,
    pub log_count: i64
}

impl Block {
    pub fn empty(number: i64) -> Self {
        Self { number, ..Default::default() }
    }
}

impl UpsertRow for Block {
    fn table_name() -> &'static str {
        "blocks"
    }

    fn primary_key_columns() -> &'static [&'static str] {
        &["number"]
    }

    fn primary_key_values(&self) -> Vec<ColumnValue> {
        vec![ColumnValue::I64(self.number)]
    }

    fn set_columns(&self) -> Vec<(&'static str, ColumnValue)> {
        non_zero(vec![
            ("transaction_count", ColumnValue::I64(self.transaction_count)),
            ("log_count", ColumnValue::I64(self.log_count)),
        ])
    }
}

/// `Transaction` (materialized) — written on both transaction events
/// (`log_index = -1`) and internal-transfer log events (`log_index >= 0`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub log_index: i32,
    pub from_address: String,
    pub to_address: String,
    pub value: String,
    pub block_number: i64,
    pub transaction_index: i32,
    pub block_timestamp: i64,
    pub transaction_fee: String
}

impl UpsertRow for Transaction {
    fn table_name() -> &'static str {
        "transactions"
    }

    fn primary_key_columns() -> &'static [&'static str] {
        &["hash", "log_index"]
    }

    fn primary_key_values(&self) -> Vec<ColumnValue> {
        vec![ColumnValue::Text(self.hash.clone()), ColumnValue::I32(self.log_index)]
    }

    fn set_columns(&self) -> Vec<(&'static str, ColumnValue)> {
        non_zero(vec![
            ("from_address", ColumnValue::Text(self.from_address.clone())),
            ("to_address", ColumnValue::Text(self.to_address.clone())),
            ("value", ColumnValue::Text(self.value.clone())),
            ("block_number", ColumnValue::I64(self.block_number)),
            ("transaction_index", ColumnValue::I32(self.transaction_index)),
            ("block_timestamp", ColumnValue::I64(self.block_timestamp)),
            ("transaction_fee", ColumnValue::Text(self.transaction_fee.clone())),
        ])
    }
}

/// `AddressToken` — created on first observation of a token `Transfer` log
/// touching `public_key`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressToken {
    pub public_key: String,
    pub token_contract_address: String
}

impl UpsertRow for AddressToken {
    fn table_name() -> &'static str {
        "address_tokens"
    }

    fn primary_key_columns() -> &'static [&'static str] {
        &["public_key", "token_contract_address"]
    }

    fn primary_key_values(&self) -> Vec<ColumnValue> {
        vec![
            ColumnValue::Text(self.public_key.clone()),
            ColumnValue::Text(self.token_contract_address.clone()),
        ]
    }

    fn set_columns(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![]
    }
}

/// `Contract` — upserted from the contracts-processed topic; triggers
/// re-enrichment of the matching `Address`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub address: String,
    pub name: String,
    pub created_timestamp: i64,
    pub status: String,
    pub is_token: bool
}

impl UpsertRow for Contract {
    fn table_name() -> &'static str {
        "contracts"
    }

    fn primary_key_columns() -> &'static [&'static str] {
        &["address"]
    }

    fn primary_key_values(&self) -> Vec<ColumnValue> {
        vec![ColumnValue::Text(self.address.clone())]
    }

    fn set_columns(&self) -> Vec<(&'static str, ColumnValue)> {
        non_zero(vec![
            ("name", ColumnValue::Text(self.name.clone())),
            ("created_timestamp", ColumnValue::I64(self.created_timestamp)),
            ("status", ColumnValue::Text(self.status.clone())),
            ("is_token", ColumnValue::Bool(self.is_token)),
        ])
    }
}

/// `GovernancePrep` — same lifecycle as `Contract`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GovernancePrep {
    pub address: String,
    pub is_prep: bool
}

impl UpsertRow for GovernancePrep {
    fn table_name() -> &'static str {
        "governance_preps"
    }

    fn primary_key_columns() -> &'static [&'static str] {
        &["address"]
    }

    fn primary_key_values(&self) -> Vec<ColumnValue> {
        vec![ColumnValue::Text(self.address.clone())]
    }

    fn set_columns(&self) -> Vec<(&'static str, ColumnValue)> {
        non_zero(vec![("is_prep", ColumnValue::Bool(self.is_prep))])
    }
}

/// The three counted address categories (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressCountType {
    All,
    Contract,
    Token
}

impl AddressCountType {
    pub const ALL: [AddressCountType; 3] = [Self::All, Self::Contract, Self::Token];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Contract => "contract",
            Self::Token => "token"
        }
    }

    /// The counter-cache key for this type, per the `icon_addresses_<purpose>_<identifier>`
    /// scheme in §6.
    pub fn cache_key(self) -> String {
        addresses_cache::cache_key("address_count", self.as_str())
    }
}

/// `AddressCount` — single row per type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressCount {
    pub count_type: AddressCountType,
    pub count: i64
}

impl UpsertRow for AddressCount {
    fn table_name() -> &'static str {
        "address_counts"
    }

    fn primary_key_columns() -> &'static [&'static str] {
        &["count_type"]
    }

    fn primary_key_values(&self) -> Vec<ColumnValue> {
        vec![ColumnValue::Text(self.count_type.as_str().to_owned())]
    }

    fn set_columns(&self) -> Vec<(&'static str, ColumnValue)> {
        non_zero(vec![("count", ColumnValue::I64(self.count))])
    }
}

/// `TransactionCountByPublicKey` / `LogCountByPublicKey` — one row per
/// observed address, monotonic-non-decreasing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionCountByPublicKey {
    pub public_key: String,
    pub count: i64
}

impl UpsertRow for TransactionCountByPublicKey {
    fn table_name() -> &'static str {
        "transaction_count_by_public_keys"
    }

    fn primary_key_columns() -> &'static [&'static str] {
        &["public_key"]
    }

    fn primary_key_values(&self) -> Vec<ColumnValue> {
        vec![ColumnValue::Text(self.public_key.clone())]
    }

    fn set_columns(&self) -> Vec<(&'static str, ColumnValue)> {
        non_zero(vec![("count", ColumnValue::I64(self.count))])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogCountByPublicKey {
    pub public_key: String,
    pub count: i64
}

impl UpsertRow for LogCountByPublicKey {
    fn table_name() -> &'static str {
        "log_count_by_public_keys"
    }

    fn primary_key_columns() -> &'static [&'static str] {
        &["public_key"]
    }

    fn primary_key_values(&self) -> Vec<ColumnValue> {
        vec![ColumnValue::Text(self.public_key.clone())]
    }

    fn set_columns(&self) -> Vec<(&'static str, ColumnValue)> {
        non_zero(vec![("count", ColumnValue::I64(self.count))])
    }
}

/// `...ByBlockNumber` rows: one row per (block, per-transaction sequence
/// key), used to drive block enrichment (§4.3.2).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionCountByBlockNumber {
    pub block_number: i64,
    pub count: i64
}

impl UpsertRow for TransactionCountByBlockNumber {
    fn table_name() -> &'static str {
        "transaction_count_by_block_numbers"
    }

    fn primary_key_columns() -> &'static [&'static str] {
        &["block_number"]
    }

    fn primary_key_values(&self) -> Vec<ColumnValue> {
        vec![ColumnValue::I64(self.block_number)]
    }

    fn set_columns(&self) -> Vec<(&'static str, ColumnValue)> {
        non_zero(vec![("count", ColumnValue::I64(self.count))])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogCountByBlockNumber {
    pub block_number: i64,
    /// Monotone per-block sequence number (§4.3.2): one row per
    /// transaction hash seen in the block, so the block loader can sum
    /// "max log count per transaction hash" into the block's `log_count`.
    pub sequence: i64,
    pub transaction_hash: String,
    pub count: i64
}

impl UpsertRow for LogCountByBlockNumber {
    fn table_name() -> &'static str {
        "log_count_by_block_numbers"
    }

    fn primary_key_columns() -> &'static [&'static str] {
        &["block_number", "sequence"]
    }

    fn primary_key_values(&self) -> Vec<ColumnValue> {
        vec![ColumnValue::I64(self.block_number), ColumnValue::I64(self.sequence)]
    }

    fn set_columns(&self) -> Vec<(&'static str, ColumnValue)> {
        non_zero(vec![
            ("transaction_hash", ColumnValue::Text(self.transaction_hash.clone())),
            ("count", ColumnValue::I64(self.count)),
        ])
    }
}

/// Insert-only idempotency tokens (§3). These are never upserted -- a
/// primary-key conflict on insert is the signal that the identity has
/// already been counted (§4.3.3).
pub mod index {
    use super::{AddressCountType, ColumnValue};

    #[derive(Debug, Clone, PartialEq)]
    pub struct AddressCountIndex {
        pub count_type: AddressCountType,
        pub public_key: String
    }

    impl AddressCountIndex {
        pub const TABLE: &'static str = "address_count_indices";

        pub fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
            vec![
                ("count_type", ColumnValue::Text(self.count_type.as_str().to_owned())),
                ("public_key", ColumnValue::Text(self.public_key.clone())),
            ]
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct AddressContractCountIndex {
        pub public_key: String
    }

    impl AddressContractCountIndex {
        pub const TABLE: &'static str = "address_contract_count_indices";

        pub fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
            vec![("public_key", ColumnValue::Text(self.public_key.clone()))]
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct AddressTokenCountIndex {
        pub public_key: String
    }

    impl AddressTokenCountIndex {
        pub const TABLE: &'static str = "address_token_count_indices";

        pub fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
            vec![("public_key", ColumnValue::Text(self.public_key.clone()))]
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct TransactionCountByPublicKeyIndex {
        pub public_key: String,
        pub hash: String,
        pub log_index: i32
    }

    impl TransactionCountByPublicKeyIndex {
        pub const TABLE: &'static str = "transaction_count_by_public_key_indices";

        pub fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
            vec![
                ("public_key", ColumnValue::Text(self.public_key.clone())),
                ("hash", ColumnValue::Text(self.hash.clone())),
                ("log_index", ColumnValue::I32(self.log_index)),
            ]
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct LogCountByPublicKeyIndex {
        pub public_key: String,
        pub hash: String,
        pub log_index: i32
    }

    impl LogCountByPublicKeyIndex {
        pub const TABLE: &'static str = "log_count_by_public_key_indices";

        pub fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
            vec![
                ("public_key", ColumnValue::Text(self.public_key.clone())),
                ("hash", ColumnValue::Text(self.hash.clone())),
                ("log_index", ColumnValue::I32(self.log_index)),
            ]
        }
    }
}
