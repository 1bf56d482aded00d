//! The `sqlx`-backed [`Store`] implementation (§3, §4.3.1).
//!
//! Row mapping is written by hand with `sqlx::Row::try_get` rather than
//! `query_as!`/`query!`, since those macros need a live `DATABASE_URL` at
//! compile time and this crate is built without one. The partial-upsert
//! statement itself is built once, generically, over [`UpsertRow`] with
//! [`sqlx::QueryBuilder`] -- the Rust equivalent of the upstream's
//! reflection-driven "non-zero field" projection (§4.3.1), minus the
//! reflection.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder, Row};

use addresses_types::{
    index, Address, AddressCount, AddressCountType, AddressToken, Balance, Block, ColumnValue,
    Contract, GovernancePrep, LogCountByBlockNumber, LogCountByPublicKey, Transaction,
    TransactionCountByBlockNumber, TransactionCountByPublicKey, UpsertRow
};

use crate::{Store, StoreError};

pub struct PostgresStore {
    pool: PgPool
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn bind_column_value<'a>(
    separated: &mut sqlx::query_builder::Separated<'a, '_, Postgres, &'static str>,
    value: &ColumnValue
) {
    match value {
        ColumnValue::Text(v) => {
            separated.push_bind(v.clone());
        }
        ColumnValue::I64(v) => {
            separated.push_bind(*v);
        }
        ColumnValue::U32(v) => {
            separated.push_bind(*v as i64);
        }
        ColumnValue::I32(v) => {
            separated.push_bind(*v);
        }
        ColumnValue::F64(v) => {
            separated.push_bind(*v);
        }
        ColumnValue::Bool(v) => {
            separated.push_bind(*v);
        }
    }
}

/// Generic partial-upsert: `INSERT ... ON CONFLICT (pk) DO UPDATE SET
/// <non-zero columns>`, or `DO NOTHING` when the row carries no settable
/// columns (e.g. [`addresses_types::AddressToken`]).
async fn upsert<T: UpsertRow + Sync>(pool: &PgPool, row: &T) -> Result<(), StoreError> {
    let pk_columns = T::primary_key_columns();
    let pk_values = row.primary_key_values();
    let set_columns = row.set_columns();

    let all_columns: Vec<&str> = pk_columns.iter().copied().chain(set_columns.iter().map(|(c, _)| *c)).collect();

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!("INSERT INTO {} (", T::table_name()));
    builder.push(all_columns.join(", "));
    builder.push(") VALUES (");
    {
        let mut separated = builder.separated(", ");
        for value in pk_values.iter().chain(set_columns.iter().map(|(_, v)| v)) {
            bind_column_value(&mut separated, value);
        }
    }
    builder.push(")");
    builder.push(" ON CONFLICT (");
    builder.push(pk_columns.join(", "));
    builder.push(") DO ");
    if set_columns.is_empty() {
        builder.push("NOTHING");
    } else {
        builder.push("UPDATE SET ");
        let mut separated = builder.separated(", ");
        for (column, _) in &set_columns {
            separated.push(format!("{column} = EXCLUDED.{column}"));
        }
    }

    builder.build().execute(pool).await?;
    Ok(())
}

/// Insert-only write for an idempotency-index table (§4.3.3): reports
/// `Ok(false)` on a primary-key conflict instead of bubbling it up, since a
/// duplicate there is an expected at-least-once redelivery, not a failure.
async fn insert_index(pool: &PgPool, table: &str, columns: &[(&str, ColumnValue)]) -> Result<bool, StoreError> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!("INSERT INTO {table} ("));
    builder.push(columns.iter().map(|(c, _)| *c).collect::<Vec<_>>().join(", "));
    builder.push(") VALUES (");
    {
        let mut separated = builder.separated(", ");
        for (_, value) in columns {
            bind_column_value(&mut separated, value);
        }
    }
    builder.push(") ON CONFLICT DO NOTHING");

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

async fn count_all(pool: &PgPool, table: &str) -> Result<i64, StoreError> {
    let row = sqlx::query(&format!("SELECT COUNT(*) FROM {table}")).fetch_one(pool).await?;
    Ok(row.try_get::<i64, _>(0)?)
}

async fn count_matching(pool: &PgPool, sql: &str, bind: &str) -> Result<i64, StoreError> {
    let row = sqlx::query(sql).bind(bind).fetch_one(pool).await?;
    Ok(row.try_get::<i64, _>(0)?)
}

fn row_to_address(row: &PgRow) -> Result<Address, StoreError> {
    Ok(Address {
        public_key: row.try_get("public_key")?,
        is_contract: row.try_get("is_contract")?,
        transaction_count: row.try_get("transaction_count")?,
        log_count: row.try_get("log_count")?,
        balance: row.try_get("balance")?,
        name: row.try_get("name")?,
        created_timestamp: row.try_get("created_timestamp")?,
        status: row.try_get("status")?,
        is_token: row.try_get("is_token")?,
        is_prep: row.try_get("is_prep")?
    })
}

fn row_to_balance(row: &PgRow) -> Result<Balance, StoreError> {
    Ok(Balance {
        block_number: row.try_get("block_number")?,
        transaction_index: row.try_get("transaction_index")?,
        log_index: row.try_get("log_index")?,
        public_key: row.try_get("public_key")?,
        value: row.try_get("value")?,
        value_decimal: row.try_get("value_decimal")?,
        timestamp: row.try_get("timestamp")?
    })
}

fn row_to_block(row: &PgRow) -> Result<Block, StoreError> {
    Ok(Block {
        number: row.try_get("number")?,
        transaction_count: row.try_get("transaction_count")?,
        log_count: row.try_get("log_count")?
    })
}

fn row_to_transaction(row: &PgRow) -> Result<Transaction, StoreError> {
    Ok(Transaction {
        hash: row.try_get("hash")?,
        log_index: row.try_get("log_index")?,
        from_address: row.try_get("from_address")?,
        to_address: row.try_get("to_address")?,
        value: row.try_get("value")?,
        block_number: row.try_get("block_number")?,
        transaction_index: row.try_get("transaction_index")?,
        block_timestamp: row.try_get("block_timestamp")?,
        transaction_fee: row.try_get("transaction_fee")?
    })
}

fn row_to_address_token(row: &PgRow) -> Result<AddressToken, StoreError> {
    Ok(AddressToken {
        public_key: row.try_get("public_key")?,
        token_contract_address: row.try_get("token_contract_address")?
    })
}

fn row_to_contract(row: &PgRow) -> Result<Contract, StoreError> {
    Ok(Contract {
        address: row.try_get("address")?,
        name: row.try_get("name")?,
        created_timestamp: row.try_get("created_timestamp")?,
        status: row.try_get("status")?,
        is_token: row.try_get("is_token")?
    })
}

fn row_to_governance_prep(row: &PgRow) -> Result<GovernancePrep, StoreError> {
    Ok(GovernancePrep { address: row.try_get("address")?, is_prep: row.try_get("is_prep")? })
}

fn row_to_address_count(row: &PgRow) -> Result<AddressCount, StoreError> {
    let count_type: String = row.try_get("count_type")?;
    let count_type = match count_type.as_str() {
        "all" => AddressCountType::All,
        "contract" => AddressCountType::Contract,
        "token" => AddressCountType::Token,
        other => {
            return Err(StoreError::Database(sqlx::Error::Decode(
                format!("unrecognized address count_type `{other}`").into()
            )))
        }
    };
    Ok(AddressCount { count_type, count: row.try_get("count")? })
}

fn row_to_tx_count_by_pk(row: &PgRow) -> Result<TransactionCountByPublicKey, StoreError> {
    Ok(TransactionCountByPublicKey { public_key: row.try_get("public_key")?, count: row.try_get("count")? })
}

fn row_to_log_count_by_pk(row: &PgRow) -> Result<LogCountByPublicKey, StoreError> {
    Ok(LogCountByPublicKey { public_key: row.try_get("public_key")?, count: row.try_get("count")? })
}

#[async_trait]
impl Store for PostgresStore {
    async fn upsert_address(&self, row: &Address) -> Result<(), StoreError> {
        upsert(&self.pool, row).await
    }

    async fn select_address(&self, public_key: &str) -> Result<Option<Address>, StoreError> {
        let row = sqlx::query("SELECT * FROM addresses WHERE public_key = $1")
            .bind(public_key)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_address).transpose()
    }

    async fn select_addresses_page(&self, limit: i64, skip: i64) -> Result<Vec<Address>, StoreError> {
        let rows = sqlx::query("SELECT * FROM addresses ORDER BY public_key LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(skip)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_address).collect()
    }

    async fn upsert_balance(&self, row: &Balance) -> Result<(), StoreError> {
        upsert(&self.pool, row).await
    }

    async fn select_latest_balance(
        &self,
        public_key: &str,
        max_block_number: i64
    ) -> Result<Option<Balance>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM balances WHERE public_key = $1 AND block_number <= $2
             ORDER BY block_number DESC, transaction_index DESC, log_index DESC
             LIMIT 1"
        )
        .bind(public_key)
        .bind(max_block_number)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_balance).transpose()
    }

    async fn select_balance_exact(
        &self,
        public_key: &str,
        block_number: i64,
        transaction_index: i32,
        log_index: i32
    ) -> Result<Option<Balance>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM balances
             WHERE public_key = $1 AND block_number = $2 AND transaction_index = $3 AND log_index = $4"
        )
        .bind(public_key)
        .bind(block_number)
        .bind(transaction_index)
        .bind(log_index)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_balance).transpose()
    }

    async fn upsert_block(&self, row: &Block) -> Result<(), StoreError> {
        upsert(&self.pool, row).await
    }

    async fn select_block(&self, number: i64) -> Result<Option<Block>, StoreError> {
        let row = sqlx::query("SELECT * FROM blocks WHERE number = $1")
            .bind(number)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_block).transpose()
    }

    async fn select_latest_block_number(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COALESCE(MAX(number), -1) FROM blocks").fetch_one(&self.pool).await?;
        Ok(row.try_get(0)?)
    }

    async fn upsert_transaction(&self, row: &Transaction) -> Result<(), StoreError> {
        upsert(&self.pool, row).await
    }

    async fn select_transactions_for_block(&self, block_number: i64) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM transactions WHERE block_number = $1 ORDER BY transaction_index, log_index"
        )
        .bind(block_number)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_transaction).collect()
    }

    async fn select_transaction_count_by_block_number(&self, block_number: i64) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT count FROM transaction_count_by_block_numbers WHERE block_number = $1")
            .bind(block_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.try_get::<i64, _>(0)).transpose()?.unwrap_or(0))
    }

    async fn sum_log_counts_for_block(&self, block_number: i64) -> Result<i64, StoreError> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(max_count), 0) FROM (
                 SELECT MAX(count) AS max_count FROM log_count_by_block_numbers
                 WHERE block_number = $1 GROUP BY transaction_hash
             ) per_transaction"
        )
        .bind(block_number)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get(0)?)
    }

    async fn upsert_address_token(&self, row: &AddressToken) -> Result<(), StoreError> {
        upsert(&self.pool, row).await
    }

    async fn select_address_tokens_for_public_key(&self, public_key: &str) -> Result<Vec<AddressToken>, StoreError> {
        let rows = sqlx::query("SELECT * FROM address_tokens WHERE public_key = $1")
            .bind(public_key)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_address_token).collect()
    }

    async fn upsert_contract(&self, row: &Contract) -> Result<(), StoreError> {
        upsert(&self.pool, row).await
    }

    async fn select_contract(&self, address: &str) -> Result<Option<Contract>, StoreError> {
        let row = sqlx::query("SELECT * FROM contracts WHERE address = $1")
            .bind(address)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_contract).transpose()
    }

    async fn upsert_governance_prep(&self, row: &GovernancePrep) -> Result<(), StoreError> {
        upsert(&self.pool, row).await
    }

    async fn select_governance_prep(&self, address: &str) -> Result<Option<GovernancePrep>, StoreError> {
        let row = sqlx::query("SELECT * FROM governance_preps WHERE address = $1")
            .bind(address)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_governance_prep).transpose()
    }

    async fn upsert_address_count(&self, row: &AddressCount) -> Result<(), StoreError> {
        upsert(&self.pool, row).await
    }

    async fn select_address_count(&self, count_type: AddressCountType) -> Result<Option<AddressCount>, StoreError> {
        let row = sqlx::query("SELECT * FROM address_counts WHERE count_type = $1")
            .bind(count_type.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_address_count).transpose()
    }

    async fn count_address_count_index(&self, count_type: AddressCountType) -> Result<i64, StoreError> {
        let table = match count_type {
            AddressCountType::All => "address_count_indices",
            AddressCountType::Contract => "address_contract_count_indices",
            AddressCountType::Token => "address_token_count_indices"
        };
        count_all(&self.pool, table).await
    }

    async fn upsert_transaction_count_by_public_key(
        &self,
        row: &TransactionCountByPublicKey
    ) -> Result<(), StoreError> {
        upsert(&self.pool, row).await
    }

    async fn select_transaction_count_by_public_key(
        &self,
        public_key: &str
    ) -> Result<Option<TransactionCountByPublicKey>, StoreError> {
        let row = sqlx::query("SELECT * FROM transaction_count_by_public_keys WHERE public_key = $1")
            .bind(public_key)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_tx_count_by_pk).transpose()
    }

    async fn select_transaction_count_by_public_key_page(
        &self,
        limit: i64,
        skip: i64
    ) -> Result<Vec<TransactionCountByPublicKey>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM transaction_count_by_public_keys ORDER BY public_key LIMIT $1 OFFSET $2"
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_tx_count_by_pk).collect()
    }

    async fn count_transaction_count_by_public_key_index(&self, public_key: &str) -> Result<i64, StoreError> {
        count_matching(
            &self.pool,
            "SELECT COUNT(*) FROM transaction_count_by_public_key_indices WHERE public_key = $1",
            public_key
        )
        .await
    }

    async fn upsert_log_count_by_public_key(&self, row: &LogCountByPublicKey) -> Result<(), StoreError> {
        upsert(&self.pool, row).await
    }

    async fn select_log_count_by_public_key(
        &self,
        public_key: &str
    ) -> Result<Option<LogCountByPublicKey>, StoreError> {
        let row = sqlx::query("SELECT * FROM log_count_by_public_keys WHERE public_key = $1")
            .bind(public_key)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_log_count_by_pk).transpose()
    }

    async fn upsert_transaction_count_by_block_number(
        &self,
        row: &TransactionCountByBlockNumber
    ) -> Result<(), StoreError> {
        upsert(&self.pool, row).await
    }

    async fn upsert_log_count_by_block_number(&self, row: &LogCountByBlockNumber) -> Result<(), StoreError> {
        upsert(&self.pool, row).await
    }

    async fn next_log_count_sequence(&self, block_number: i64) -> Result<i64, StoreError> {
        let row = sqlx::query(
            "SELECT COALESCE(MAX(sequence), -1) + 1 FROM log_count_by_block_numbers WHERE block_number = $1"
        )
        .bind(block_number)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get(0)?)
    }

    async fn insert_address_count_index(&self, row: &index::AddressCountIndex) -> Result<bool, StoreError> {
        insert_index(&self.pool, index::AddressCountIndex::TABLE, &row.columns()).await
    }

    async fn insert_address_contract_count_index(
        &self,
        row: &index::AddressContractCountIndex
    ) -> Result<bool, StoreError> {
        insert_index(&self.pool, index::AddressContractCountIndex::TABLE, &row.columns()).await
    }

    async fn insert_address_token_count_index(&self, row: &index::AddressTokenCountIndex) -> Result<bool, StoreError> {
        insert_index(&self.pool, index::AddressTokenCountIndex::TABLE, &row.columns()).await
    }

    async fn insert_transaction_count_by_public_key_index(
        &self,
        row: &index::TransactionCountByPublicKeyIndex
    ) -> Result<bool, StoreError> {
        insert_index(&self.pool, index::TransactionCountByPublicKeyIndex::TABLE, &row.columns()).await
    }

    async fn insert_log_count_by_public_key_index(
        &self,
        row: &index::LogCountByPublicKeyIndex
    ) -> Result<bool, StoreError> {
        insert_index(&self.pool, index::LogCountByPublicKeyIndex::TABLE, &row.columns()).await
    }
}
