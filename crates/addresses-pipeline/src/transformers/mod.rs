//! One module per input topic (§4.2, §6). Each `run` loop owns a single
//! `TopicConsumer` and never terminates except by aborting the process on
//! a bus error, a malformed record, or a closed downstream loader channel.

pub mod blocks;
pub mod contracts;
pub mod governance_preps;
pub mod logs;
pub mod transactions;
