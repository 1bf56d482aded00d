//! Contracts transformer (§4.2): `ContractProcessed` -> `Contract`, plus an
//! `AddressCount{Token}` observation when the contract is a token.

use addresses_bus::{codec, TopicConsumer};
use addresses_types::raw::ContractProcessed;
use addresses_types::{AddressCountType, Contract};
use tracing::error;

use crate::{loaders::address_count::AddressCountObservation, Loaders};

pub async fn run(consumer: TopicConsumer, loaders: Loaders) {
    loop {
        let record = match consumer.recv().await {
            Ok(record) => record,
            Err(err) => {
                error!(error = %err, "contracts transformer: bus error");
                std::process::exit(1);
            }
        };

        let raw = match codec::decode_contract_processed(&record.payload) {
            Ok(raw) => raw,
            Err(err) => {
                error!(error = %err, "contracts transformer: malformed record");
                std::process::exit(1);
            }
        };

        handle(&raw, &loaders).await;
    }
}

async fn handle(raw: &ContractProcessed, loaders: &Loaders) {
    let row = Contract {
        address: raw.address.clone(),
        name: raw.name.clone(),
        created_timestamp: raw.created_timestamp,
        status: raw.status.clone(),
        is_token: raw.is_token
    };

    if loaders.contract.enqueue(row).await.is_err() {
        error!("contracts transformer: contract loader channel closed");
        std::process::exit(1);
    }

    if raw.is_token {
        if loaders
            .address_count
            .enqueue(AddressCountObservation { count_type: AddressCountType::Token, public_key: raw.address.clone() })
            .await
            .is_err()
        {
            error!("contracts transformer: address count loader channel closed");
            std::process::exit(1);
        }
    }
}
