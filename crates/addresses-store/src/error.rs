use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection or query failed: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique-constraint violation on an insert-only index table. This is
    /// the expected signal that an identity has already been counted
    /// (§4.3.3) and is not itself a failure -- callers match on this variant
    /// rather than treating every database error alike.
    #[error("row already indexed (duplicate key)")]
    DuplicateKey
}

impl StoreError {
    /// Classifies a raw `sqlx::Error` as the benign duplicate-key case or a
    /// genuine failure, per §7's "Kind" column for the loader's insert-only
    /// index writes.
    pub fn from_insert_result(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Self::DuplicateKey;
            }
        }
        Self::Database(err)
    }
}
