//! The partial-upsert projection (§4.3.1).
//!
//! Upstream this was a runtime reflection pass over an ORM-generated
//! struct: any field whose value differed from its Go zero value was
//! included in `ON CONFLICT DO UPDATE SET`. Here each entity hand-writes
//! the projection instead (§9 design note): [`UpsertRow::set_columns`]
//! returns only the columns this particular inbound row actually carries
//! a value for, letting partial transformers and partial enrichers layer
//! writes onto the same row without clobbering fields they don't know
//! about.

use std::fmt;

/// A column value ready to bind into a SQL statement. Kept as a small
/// closed enum (rather than `Box<dyn Any>`) so the store adapter can match
/// on it without downcasting.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(String),
    I64(i64),
    U32(u32),
    I32(i32),
    F64(f64),
    Bool(bool)
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}")
        }
    }
}

/// An entity that can be upserted into its table following §4.3.1.
pub trait UpsertRow {
    /// The table this entity lives in.
    fn table_name() -> &'static str;

    /// The primary key column names, in declaration order. Always written,
    /// regardless of whether their value is a semantic zero.
    fn primary_key_columns() -> &'static [&'static str];

    /// The values of the primary key columns for this row, in the same
    /// order as [`Self::primary_key_columns`].
    fn primary_key_values(&self) -> Vec<ColumnValue>;

    /// Non-primary-key columns this row supplies a non-zero value for.
    /// Entities whose table overwrites every column unconditionally on
    /// conflict (only [`crate::Balance`], per the §4.3.1 exception) return
    /// every column here regardless of zero-ness.
    fn set_columns(&self) -> Vec<(&'static str, ColumnValue)>;
}

/// `true` for the zero value of each semantic type the partial-upsert rule
/// reasons about. A hex string's zero is `"0x0"`/empty, not an empty
/// string in general -- callers that store hex strings should use
/// [`crate::hexnum::is_zero_hex`] instead of this for those columns.
pub fn is_zero(value: &ColumnValue) -> bool {
    match value {
        ColumnValue::Text(v) => v.is_empty(),
        ColumnValue::I64(v) => *v == 0,
        ColumnValue::U32(v) => *v == 0,
        ColumnValue::I32(v) => *v == 0,
        ColumnValue::F64(v) => *v == 0.0,
        ColumnValue::Bool(v) => !*v
    }
}

/// Filters `(column, value)` pairs down to the non-zero ones, the common
/// case for every entity except [`crate::Balance`].
pub fn non_zero(fields: Vec<(&'static str, ColumnValue)>) -> Vec<(&'static str, ColumnValue)> {
    fields.into_iter().filter(|(_, v)| !is_zero(v)).collect()
}
