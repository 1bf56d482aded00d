//! Governance preps transformer (§4.2): `GovernancePrepProcessed` ->
//! `GovernancePrep`, a plain one-to-one mapping.

use addresses_bus::{codec, TopicConsumer};
use addresses_types::GovernancePrep;
use tracing::error;

use crate::Loaders;

pub async fn run(consumer: TopicConsumer, loaders: Loaders) {
    loop {
        let record = match consumer.recv().await {
            Ok(record) => record,
            Err(err) => {
                error!(error = %err, "governance preps transformer: bus error");
                std::process::exit(1);
            }
        };

        let raw = match codec::decode_governance_prep_processed(&record.payload) {
            Ok(raw) => raw,
            Err(err) => {
                error!(error = %err, "governance preps transformer: malformed record");
                std::process::exit(1);
            }
        };

        let row = GovernancePrep { address: raw.address, is_prep: raw.is_prep };

        if loaders.governance_prep.enqueue(row).await.is_err() {
            error!("governance preps transformer: governance prep loader channel closed");
            std::process::exit(1);
        }
    }
}
