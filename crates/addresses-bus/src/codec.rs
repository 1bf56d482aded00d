//! Record codecs (§4.1).
//!
//! Each topic carries length-delimited records preceded by a fixed 6-byte
//! schema-registry header. The codec strips the header and decodes the
//! remainder into a typed raw event. Codecs are pure and side-effect-free:
//! they never touch the store or the cache.
//!
//! The upstream service encodes record bodies as protobuf; no `.proto`
//! schema travelled with this port, so the body codec here is
//! `serde_json` instead (same wire contract -- strip the header, decode
//! the remainder -- with a JSON body in place of a protobuf one). See
//! `DESIGN.md` for this substitution.

use addresses_types::raw::{BlockRaw, ContractProcessed, GovernancePrepProcessed, LogRaw, TransactionRaw};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Length of the schema-registry header every record is prefixed with.
pub const HEADER_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("record is shorter than the {HEADER_LEN}-byte header (got {0} bytes)")]
    Truncated(usize),
    #[error("malformed record body: {0}")]
    Malformed(#[from] serde_json::Error)
}

/// Strips the 6-byte header, returning the body bytes.
fn strip_header(bytes: &[u8]) -> Result<&[u8], CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::Truncated(bytes.len()))
    }
    Ok(&bytes[HEADER_LEN..])
}

fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    let body = strip_header(bytes)?;
    Ok(serde_json::from_slice(body)?)
}

pub fn decode_block_raw(bytes: &[u8]) -> Result<BlockRaw, CodecError> {
    decode_body(bytes)
}

pub fn decode_transaction_raw(bytes: &[u8]) -> Result<TransactionRaw, CodecError> {
    decode_body(bytes)
}

pub fn decode_log_raw(bytes: &[u8]) -> Result<LogRaw, CodecError> {
    decode_body(bytes)
}

pub fn decode_contract_processed(bytes: &[u8]) -> Result<ContractProcessed, CodecError> {
    decode_body(bytes)
}

pub fn decode_governance_prep_processed(bytes: &[u8]) -> Result<GovernancePrepProcessed, CodecError> {
    decode_body(bytes)
}

#[cfg(test)]
mod tests {
    use addresses_types::address::OptionalAddress;

    use super::*;

    fn framed(body: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; HEADER_LEN];
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn decodes_block_raw_after_stripping_header() {
        let body = serde_json::to_vec(&BlockRaw { number: 42, transaction_count: 3 }).unwrap();
        let decoded = decode_block_raw(&framed(&body)).unwrap();
        assert_eq!(decoded.number, 42);
        assert_eq!(decoded.transaction_count, 3);
    }

    #[test]
    fn truncated_record_is_an_error() {
        assert!(matches!(decode_block_raw(&[0, 1, 2]), Err(CodecError::Truncated(3))));
    }

    #[test]
    fn transaction_raw_round_trips_optional_address() {
        let tx = TransactionRaw {
            hash: "0xabc".into(),
            block_number: 1,
            transaction_index: 0,
            block_timestamp: 0,
            from_address: OptionalAddress::from_wire("hxA"),
            to_address: OptionalAddress::from_wire("None"),
            value: "0x10".into(),
            receipt_step_price: "0x1".into(),
            receipt_step_used: "0x1".into()
        };
        let body = serde_json::to_vec(&tx).unwrap();
        let decoded = decode_transaction_raw(&framed(&body)).unwrap();
        assert_eq!(decoded.to_address, OptionalAddress::Absent);
    }
}
