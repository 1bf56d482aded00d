//! Logs transformer (§4.2): one `LogRaw` always fans out to a
//! `LogCountByPublicKey` observation (keyed on the emitting contract) and a
//! `LogCountByBlockNumber` observation. `ICXTransfer` and token `Transfer`
//! events additionally fan out address/token rows, per each signature's
//! `indexed` layout. Address-count observations are the Transactions
//! transformer's job alone, so internal-transfer logs never touch them.

use addresses_bus::{codec, TopicConsumer};
use addresses_types::raw::LogRaw;
use addresses_types::{is_contract_address, is_zero_hex, Address, AddressToken, Transaction};
use tracing::error;

use crate::{
    loaders::{log_count_by_block_number::LogCountByBlockObservation, log_count_by_public_key::LogCountObservation},
    Loaders
};

const ICX_TRANSFER_SIGNATURE: &str = "ICXTransfer(Address,Address,int)";
const TOKEN_TRANSFER_SIGNATURE: &str = "Transfer(Address,Address,int,bytes)";

pub async fn run(consumer: TopicConsumer, loaders: Loaders) {
    loop {
        let record = match consumer.recv().await {
            Ok(record) => record,
            Err(err) => {
                error!(error = %err, "logs transformer: bus error");
                std::process::exit(1);
            }
        };

        let raw = match codec::decode_log_raw(&record.payload) {
            Ok(raw) => raw,
            Err(err) => {
                error!(error = %err, "logs transformer: malformed record");
                std::process::exit(1);
            }
        };

        handle(&raw, &loaders).await;
    }
}

async fn handle(raw: &LogRaw, loaders: &Loaders) {
    send_or_abort(
        loaders.log_count_by_public_key.enqueue(LogCountObservation {
            public_key: raw.address.clone(),
            hash: raw.transaction_hash.clone(),
            log_index: raw.log_index
        }),
        "log count by public key"
    )
    .await;

    send_or_abort(
        loaders.log_count_by_block_number.enqueue(LogCountByBlockObservation {
            block_number: raw.block_number,
            transaction_hash: raw.transaction_hash.clone(),
            count: i64::from(raw.max_log_index) + 1
        }),
        "log count by block number"
    )
    .await;

    match raw.signature() {
        Some(ICX_TRANSFER_SIGNATURE) if raw.indexed.len() >= 4 => handle_icx_transfer(raw, loaders).await,
        Some(TOKEN_TRANSFER_SIGNATURE) if raw.indexed.len() == 4 => handle_token_transfer(raw, loaders).await,
        _ => {}
    }
}

async fn handle_icx_transfer(raw: &LogRaw, loaders: &Loaders) {
    let from = &raw.indexed[1];
    let to = &raw.indexed[2];
    let value = &raw.indexed[3];

    for public_key in [from, to] {
        send_or_abort(
            loaders.address.enqueue(Address { public_key: public_key.clone(), is_contract: is_contract_address(public_key), ..Default::default() }),
            "address"
        )
        .await;
    }

    if !is_zero_hex(value) {
        send_or_abort(
            loaders.transaction.enqueue(Transaction {
                hash: raw.transaction_hash.clone(),
                log_index: raw.log_index,
                from_address: from.clone(),
                to_address: to.clone(),
                value: value.clone(),
                block_number: raw.block_number,
                transaction_index: raw.transaction_index,
                block_timestamp: raw.block_timestamp,
                transaction_fee: "0x0".to_owned()
            }),
            "transaction"
        )
        .await;
    }
}

async fn handle_token_transfer(raw: &LogRaw, loaders: &Loaders) {
    let from = &raw.indexed[1];
    let to = &raw.indexed[2];

    for public_key in [from, to] {
        send_or_abort(
            loaders.address_token.enqueue(AddressToken { public_key: public_key.clone(), token_contract_address: raw.address.clone() }),
            "address token"
        )
        .await;
    }
}

async fn send_or_abort(result: impl std::future::Future<Output = Result<(), crate::error::SendError>>, loader: &str) {
    if result.await.is_err() {
        error!(loader, "logs transformer: loader channel closed");
        std::process::exit(1);
    }
}
