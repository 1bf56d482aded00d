//! Canonical sample records (§2 supplement), used by the genesis-credit and
//! two-party-transfer scenario tests rather than having every test build its
//! own ad hoc `TransactionRaw`/`LogRaw`.

use crate::address::OptionalAddress;
use crate::raw::{LogRaw, TransactionRaw};

/// Scenario 1: the hard-coded genesis key and its expected starting value.
pub const GENESIS_PUBLIC_KEY: &str = "hx54f7853dc6481b670caf69c5a27c7c8fe5be8269";
pub const GENESIS_VALUE_HEX: &str = "0x2961FFF8CA4A62327800000";
pub const GENESIS_VALUE_DECIMAL: f64 = 800_460_000.0;

/// Scenario 2: block 1, one transaction `from=hxA, to=hxB, value=0x10`,
/// `receipt_step_price=0x1, receipt_step_used=0x1` (fee `0x1`).
pub fn two_party_transfer() -> TransactionRaw {
    TransactionRaw {
        hash: "0xaaaa000000000000000000000000000000000000000000000000000000bb".to_owned(),
        block_number: 1,
        transaction_index: 0,
        block_timestamp: 1_600_000_000,
        from_address: OptionalAddress::from_wire("hxA"),
        to_address: OptionalAddress::from_wire("hxB"),
        value: "0x10".to_owned(),
        receipt_step_price: "0x1".to_owned(),
        receipt_step_used: "0x1".to_owned()
    }
}

/// Scenario 4: an internal ICX transfer log at `(block=2, tx_idx=0,
/// log_idx=3)` moving `0x5` from `hxA` to `hxB`.
pub fn internal_icx_transfer_log() -> LogRaw {
    LogRaw {
        transaction_hash: "0xcccc000000000000000000000000000000000000000000000000000000dd".to_owned(),
        log_index: 3,
        max_log_index: 3,
        block_number: 2,
        block_timestamp: 1_600_000_100,
        transaction_index: 0,
        address: "cxCaller0000000000000000000000000000000000".to_owned(),
        indexed: vec![
            "ICXTransfer(Address,Address,int)".to_owned(),
            "hxA".to_owned(),
            "hxB".to_owned(),
            "0x5".to_owned()
        ],
        data: vec![]
    }
}

/// Scenario 5: the same log, for replay-ten-times duplicate tests.
pub fn duplicate_log() -> LogRaw {
    LogRaw {
        transaction_hash: "0xeeee000000000000000000000000000000000000000000000000000000ff".to_owned(),
        log_index: 0,
        max_log_index: 0,
        block_number: 3,
        block_timestamp: 1_600_000_200,
        transaction_index: 0,
        address: "cxLoggingContract000000000000000000000000".to_owned(),
        indexed: vec!["Ping()".to_owned()],
        data: vec![]
    }
}
