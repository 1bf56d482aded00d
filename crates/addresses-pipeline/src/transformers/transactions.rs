//! Transactions transformer (§4.2): one `TransactionRaw` fans out to an
//! `Address` (and `AddressCount`/`TransactionCountByPublicKey`
//! observations) per present side, a `Transaction` row, and a
//! `TransactionCountByBlockNumber` observation.

use addresses_bus::{codec, TopicConsumer};
use addresses_types::{
    compute_fee_hex, is_contract_address, Address, AddressCountType, OptionalAddress, Transaction,
    TransactionCountByBlockNumber
};
use addresses_types::raw::TransactionRaw;
use tracing::error;

use crate::{loaders::{address_count::AddressCountObservation, transaction_count_by_public_key::TransactionCountObservation}, Loaders};

pub async fn run(consumer: TopicConsumer, loaders: Loaders) {
    loop {
        let record = match consumer.recv().await {
            Ok(record) => record,
            Err(err) => {
                error!(error = %err, "transactions transformer: bus error");
                std::process::exit(1);
            }
        };

        let raw = match codec::decode_transaction_raw(&record.payload) {
            Ok(raw) => raw,
            Err(err) => {
                error!(error = %err, "transactions transformer: malformed record");
                std::process::exit(1);
            }
        };

        if let Err(err) = handle(&raw, &loaders).await {
            error!(hash = %raw.hash, error = %err, "transactions transformer: malformed quantity field");
            std::process::exit(1);
        }
    }
}

async fn handle(raw: &TransactionRaw, loaders: &Loaders) -> Result<(), addresses_types::HexNumError> {
    for side in [&raw.from_address, &raw.to_address] {
        if let OptionalAddress::Present(public_key) = side {
            let address_row = Address { public_key: public_key.clone(), is_contract: is_contract_address(public_key), ..Default::default() };
            send_or_abort(loaders.address.enqueue(address_row), "address").await;

            send_or_abort(
                loaders.address_count.enqueue(AddressCountObservation {
                    count_type: AddressCountType::All,
                    public_key: public_key.clone()
                }),
                "address count"
            )
            .await;

            if is_contract_address(public_key) {
                send_or_abort(
                    loaders.address_count.enqueue(AddressCountObservation {
                        count_type: AddressCountType::Contract,
                        public_key: public_key.clone()
                    }),
                    "address count"
                )
                .await;
            }

            send_or_abort(
                loaders.transaction_count_by_public_key.enqueue(TransactionCountObservation {
                    public_key: public_key.clone(),
                    hash: raw.hash.clone(),
                    log_index: -1
                }),
                "transaction count by public key"
            )
            .await;
        }
    }

    let fee = compute_fee_hex(&raw.receipt_step_price, &raw.receipt_step_used)?;
    let transaction_row = Transaction {
        hash: raw.hash.clone(),
        log_index: -1,
        from_address: raw.from_address.as_str().unwrap_or_default().to_owned(),
        to_address: raw.to_address.as_str().unwrap_or_default().to_owned(),
        value: raw.value.clone(),
        block_number: raw.block_number,
        transaction_index: raw.transaction_index,
        block_timestamp: raw.block_timestamp,
        transaction_fee: fee
    };
    send_or_abort(loaders.transaction.enqueue(transaction_row), "transaction").await;

    send_or_abort(
        loaders.transaction_count_by_block_number.enqueue(TransactionCountByBlockNumber {
            block_number: raw.block_number,
            count: i64::from(raw.transaction_index) + 1
        }),
        "transaction count by block number"
    )
    .await;

    Ok(())
}

async fn send_or_abort(result: impl std::future::Future<Output = Result<(), crate::error::SendError>>, loader: &str) {
    if result.await.is_err() {
        error!(loader, "transactions transformer: loader channel closed");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use addresses_cache::{CounterCache, InMemoryCounterCache};
    use addresses_store::{InMemoryStore, Store};
    use addresses_types::fixtures;

    use super::*;

    /// Scenario 2: one transaction `from=hxA, to=hxB, value=0x10, fee=0x1`
    /// through the real loaders counts each side into `AddressCount[all]`
    /// exactly once and writes the expected fee onto the `Transaction` row.
    #[tokio::test]
    async fn two_party_transfer_counts_both_sides_once() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::default());
        let cache: Arc<dyn CounterCache> = Arc::new(InMemoryCounterCache::default());
        let loaders = Loaders::spawn(store.clone(), cache, 16);

        let raw = fixtures::two_party_transfer();
        handle(&raw, &loaders).await.unwrap();

        let count = poll_address_count_reaches(&store, AddressCountType::All, 2).await;
        assert_eq!(count, 2);

        let transactions = poll_until_non_empty(&store, raw.block_number).await;
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].transaction_fee, "0x1");
        assert_eq!(transactions[0].value, "0x10");
    }

    async fn poll_address_count_reaches(store: &Arc<dyn Store>, count_type: AddressCountType, expect: i64) -> i64 {
        for _ in 0..200 {
            if let Some(row) = store.select_address_count(count_type).await.unwrap() {
                if row.count >= expect {
                    return row.count
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("address count never reached {expect}");
    }

    async fn poll_until_non_empty(store: &Arc<dyn Store>, block_number: i64) -> Vec<Transaction> {
        for _ in 0..200 {
            let rows = store.select_transactions_for_block(block_number).await.unwrap();
            if !rows.is_empty() {
                return rows
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("transaction row never appeared");
    }
}
