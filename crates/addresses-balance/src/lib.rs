//! The balance builder (§4.4): a single cursor `B` that replays every
//! block's transactions into signed-running-balance `Balance` rows,
//! gating on block completeness and polling for read-after-write
//! visibility before moving its own cursor forward.

use std::{sync::Arc, time::Duration};

use addresses_pipeline::BalanceLoaderHandle;
use addresses_store::{Store, StoreError};
use addresses_types::{add_hex, hex_to_decimal, sub_hex, Balance, HexNumError, Transaction};
use thiserror::Error;
use tracing::{debug, error, info};

const BLOCK_WAIT_INTERVAL: Duration = Duration::from_secs(3);
const VISIBILITY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One hard-coded genesis credit, the minimum form of an extensible
/// genesis table (open question in §4.4: a real deployment would want a
/// configurable multi-row table; this keeps the single-entry shape so one
/// can be added alongside it without changing the builder's logic).
#[derive(Debug, Clone)]
pub struct GenesisCredit {
    pub public_key: String,
    pub value: String,
    pub timestamp: i64
}

impl Default for GenesisCredit {
    fn default() -> Self {
        Self {
            public_key: "hx54f7853dc6481b670caf69c5a27c7c8fe5be8269".to_owned(),
            value: "0x2961FFF8CA4A62327800000".to_owned(),
            timestamp: 0
        }
    }
}

#[derive(Debug, Error)]
pub enum BalanceBuilderError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    HexNum(#[from] HexNumError),
    #[error("balance loader channel closed")]
    LoaderChannelClosed
}

pub struct BalanceBuilder {
    store: Arc<dyn Store>,
    balance_loader: BalanceLoaderHandle,
    genesis_credits: Vec<GenesisCredit>
}

impl BalanceBuilder {
    pub fn new(store: Arc<dyn Store>, balance_loader: BalanceLoaderHandle) -> Self {
        Self { store, balance_loader, genesis_credits: vec![GenesisCredit::default()] }
    }

    pub fn with_genesis_credits(mut self, genesis_credits: Vec<GenesisCredit>) -> Self {
        self.genesis_credits = genesis_credits;
        self
    }

    /// Runs forever, recovering its cursor from the highest materialized
    /// block number on startup (§2 supplement) rather than always
    /// restarting from zero. Any store or arithmetic error is fatal: the
    /// supervisor restarts the process and idempotent replay converges.
    pub async fn run(self) {
        if let Err(err) = self.run_inner().await {
            error!(error = %err, "balance builder: fatal error");
            std::process::exit(1);
        }
    }

    async fn run_inner(&self) -> Result<(), BalanceBuilderError> {
        let mut cursor = self.store.select_latest_block_number().await? + 1;

        if cursor == 0 {
            self.emit_genesis().await?;
            cursor = 1;
        }

        loop {
            addresses_metrics::set_balance_builder_cursor(cursor);
            self.process_block(cursor).await?;
            cursor += 1;
        }
    }

    async fn emit_genesis(&self) -> Result<(), BalanceBuilderError> {
        for credit in &self.genesis_credits {
            let value_decimal = hex_to_decimal(&credit.value)?;
            let row = Balance {
                block_number: 0,
                transaction_index: 0,
                log_index: -1,
                public_key: credit.public_key.clone(),
                value: credit.value.clone(),
                value_decimal,
                timestamp: credit.timestamp
            };
            self.send_and_wait(row).await?;
        }
        info!(count = self.genesis_credits.len(), "balance builder: genesis credits emitted");
        Ok(())
    }

    /// Blocks until block `number` is fully materialized (its own row plus
    /// a transaction-count and log-count aggregate at least as large as
    /// what the Block row claims), then replays every transaction in it.
    async fn process_block(&self, number: i64) -> Result<(), BalanceBuilderError> {
        let block = loop {
            match self.store.select_block(number).await? {
                Some(block) => break block,
                None => {
                    debug!(block_number = number, "balance builder: block not yet materialized, waiting");
                    tokio::time::sleep(BLOCK_WAIT_INTERVAL).await;
                }
            }
        };

        loop {
            let transaction_count = self.store.select_transaction_count_by_block_number(number).await?;
            let log_count = self.store.sum_log_counts_for_block(number).await?;
            if transaction_count >= block.transaction_count && log_count >= block.log_count {
                break
            }
            debug!(
                block_number = number,
                transaction_count, log_count, "balance builder: block not yet complete, waiting"
            );
            tokio::time::sleep(BLOCK_WAIT_INTERVAL).await;
        }

        let transactions = self.store.select_transactions_for_block(number).await?;
        for transaction in &transactions {
            for side in [transaction.from_address.as_str(), transaction.to_address.as_str()] {
                if side.is_empty() {
                    continue
                }
                self.replay_side(side, transaction).await?;
            }
        }

        Ok(())
    }

    async fn replay_side(&self, public_key: &str, transaction: &Transaction) -> Result<(), BalanceBuilderError> {
        // Inclusive of the current block: earlier transactions in this same
        // block may have already written a balance row for `public_key`,
        // and `select_latest_balance` orders by (block_number,
        // transaction_index, log_index) DESC so it still returns the most
        // recent prior row, same-block or not.
        let prior = self
            .store
            .select_latest_balance(public_key, transaction.block_number)
            .await?
            .map(|row| row.value)
            .unwrap_or_else(|| "0x0".to_owned());

        let new_value = if public_key == transaction.to_address {
            add_hex(&prior, &transaction.value)?
        } else {
            sub_hex(&prior, &transaction.value, &transaction.transaction_fee)?
        };
        let value_decimal = hex_to_decimal(&new_value)?;

        let row = Balance {
            block_number: transaction.block_number,
            transaction_index: transaction.transaction_index,
            log_index: transaction.log_index,
            public_key: public_key.to_owned(),
            value: new_value,
            value_decimal,
            timestamp: transaction.block_timestamp
        };

        self.send_and_wait(row).await
    }

    /// Sends `row` to the balance loader and polls the store until it is
    /// visible with the exact value just sent, serializing the builder
    /// against the loader's asynchronous commit (§4.4).
    async fn send_and_wait(&self, row: Balance) -> Result<(), BalanceBuilderError> {
        let (block_number, transaction_index, log_index, public_key, value) =
            (row.block_number, row.transaction_index, row.log_index, row.public_key.clone(), row.value.clone());

        self.balance_loader.enqueue(row).await.map_err(|_| BalanceBuilderError::LoaderChannelClosed)?;

        loop {
            if let Some(written) =
                self.store.select_balance_exact(&public_key, block_number, transaction_index, log_index).await?
            {
                if written.value == value {
                    return Ok(())
                }
            }
            tokio::time::sleep(VISIBILITY_POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use addresses_pipeline::Loaders;
    use addresses_store::InMemoryStore;

    use super::*;

    fn spawn_builder() -> BalanceBuilder {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::default());
        let cache: Arc<dyn addresses_cache::CounterCache> = Arc::new(addresses_cache::InMemoryCounterCache::default());
        let loaders = Loaders::spawn(store.clone(), cache, 16);
        BalanceBuilder::new(store, loaders.balance)
    }

    #[tokio::test]
    async fn genesis_credit_produces_expected_balance_row() {
        let builder = spawn_builder();
        builder.emit_genesis().await.unwrap();

        // poll-for-visibility inside emit_genesis already guarantees this
        // read observes the row; a second read is just a sanity check.
        let written = builder
            .store
            .select_balance_exact("hx54f7853dc6481b670caf69c5a27c7c8fe5be8269", 0, 0, -1)
            .await
            .unwrap()
            .expect("genesis balance row must exist");

        assert_eq!(written.value, "0x2961FFF8CA4A62327800000");
        assert_eq!(written.value_decimal, 800_460_000.0);
    }
}
