//! Message-bus record codec (§4.1) and topic consumer (§5) for the
//! address-indexing pipeline.

pub mod codec;
pub mod consumer;

pub use codec::CodecError;
pub use consumer::{BusError, BusRecord, TopicConsumer};
