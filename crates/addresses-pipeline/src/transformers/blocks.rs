//! Blocks transformer (§4.2): `BlockRaw` -> `Block`.

use addresses_bus::{codec, TopicConsumer};
use addresses_types::Block;
use tracing::error;

use crate::Loaders;

pub async fn run(consumer: TopicConsumer, loaders: Loaders) {
    loop {
        let record = match consumer.recv().await {
            Ok(record) => record,
            Err(err) => {
                error!(error = %err, "blocks transformer: bus error");
                std::process::exit(1);
            }
        };

        let raw = match codec::decode_block_raw(&record.payload) {
            Ok(raw) => raw,
            Err(err) => {
                error!(error = %err, "blocks transformer: malformed record");
                std::process::exit(1);
            }
        };

        let row = Block { number: raw.number, transaction_count: raw.transaction_count, log_count: 0 };

        if loaders.block.enqueue(row).await.is_err() {
            error!("blocks transformer: block loader channel closed");
            std::process::exit(1);
        }
    }
}
