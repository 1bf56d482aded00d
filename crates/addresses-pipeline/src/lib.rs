//! Transformers and loader actors for the address-indexing pipeline
//! (§4.2-§4.3): the part of the worker that turns bus records into
//! durable, idempotent upserts against the derived tables.

pub mod error;
pub mod loaders;
pub mod transformers;

pub use error::{LoaderError, SendError};
pub use loaders::*;
