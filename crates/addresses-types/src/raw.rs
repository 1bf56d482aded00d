//! Raw wire records (§6) -- the typed result of decoding one bus record.
//! Transformers consume these; they never see the wire bytes directly.

use serde::{Deserialize, Serialize};

use crate::address::OptionalAddress;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRaw {
    pub number: i64,
    pub transaction_count: i64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRaw {
    pub hash: String,
    pub block_number: i64,
    pub transaction_index: i32,
    pub block_timestamp: i64,
    pub from_address: OptionalAddress,
    pub to_address: OptionalAddress,
    /// hex-encoded value moved by this transaction.
    pub value: String,
    pub receipt_step_price: String,
    pub receipt_step_used: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRaw {
    pub transaction_hash: String,
    pub log_index: i32,
    pub max_log_index: i32,
    pub block_number: i64,
    pub block_timestamp: i64,
    pub transaction_index: i32,
    pub address: String,
    /// `indexed[0]` is the event signature, e.g. `"ICXTransfer(Address,Address,int)"`.
    pub indexed: Vec<String>,
    pub data: Vec<String>
}

impl LogRaw {
    pub fn signature(&self) -> Option<&str> {
        self.indexed.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractProcessed {
    pub address: String,
    pub name: String,
    pub created_timestamp: i64,
    pub status: String,
    pub is_token: bool
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernancePrepProcessed {
    pub address: String,
    pub is_prep: bool
}

/// The decoded form of any one of the five input topics (§2.1, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawRecord {
    Block(BlockRaw),
    Transaction(TransactionRaw),
    Log(LogRaw),
    Contract(ContractProcessed),
    GovernancePrep(GovernancePrepProcessed)
}
