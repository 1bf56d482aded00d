//! Domain model for the address-indexing pipeline: derived table rows,
//! raw wire records, and the hex/decimal and partial-upsert machinery
//! they share.

pub mod address;
pub mod entities;
pub mod fixtures;
pub mod hexnum;
pub mod raw;
pub mod upsert;

pub use address::{is_contract_address, OptionalAddress, NONE_SENTINEL};
pub use entities::{
    index, Address, AddressCount, AddressCountType, AddressToken, Balance, Block, Contract,
    GovernancePrep, LogCountByBlockNumber, LogCountByPublicKey, Transaction,
    TransactionCountByBlockNumber, TransactionCountByPublicKey
};
pub use hexnum::{add_hex, compute_fee_hex, hex_to_decimal, is_zero_hex, sub_hex, HexNumError};
pub use raw::{BlockRaw, ContractProcessed, GovernancePrepProcessed, LogRaw, RawRecord, TransactionRaw};
pub use upsert::{ColumnValue, UpsertRow};
