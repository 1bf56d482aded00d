//! Address identity and the typed "optional address" that replaces the
//! `"None"` sentinel string at the wire boundary (§9, open question).

use serde::{Deserialize, Serialize};

/// The literal the upstream bus uses to signal "no address" on one side of
/// a transaction or log. Suppressed at decode time by [`OptionalAddress`]
/// so it never leaks into transformer or loader logic.
pub const NONE_SENTINEL: &str = "None";

/// An address that may legitimately be absent on the wire.
///
/// Decoding a raw record converts the `"None"` sentinel into `Absent`
/// immediately; everything downstream only ever sees a real address or an
/// explicit absence, never the string literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionalAddress {
    Present(String),
    Absent
}

impl OptionalAddress {
    pub fn from_wire(value: impl Into<String>) -> Self {
        let value = value.into();
        if value == NONE_SENTINEL || value.is_empty() {
            Self::Absent
        } else {
            Self::Present(value)
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Present(s) => Some(s.as_str()),
            Self::Absent => None
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Self::Present(s) => Some(s),
            Self::Absent => None
        }
    }
}

/// Returns whether `public_key` is a contract address (prefix `cx`) rather
/// than an externally-owned account (prefix `hx`).
pub fn is_contract_address(public_key: &str) -> bool {
    public_key.starts_with("cx")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_absent() {
        assert_eq!(OptionalAddress::from_wire("None"), OptionalAddress::Absent);
        assert_eq!(OptionalAddress::from_wire(""), OptionalAddress::Absent);
    }

    #[test]
    fn real_address_is_present() {
        let addr = OptionalAddress::from_wire("hxabc");
        assert_eq!(addr.as_str(), Some("hxabc"));
    }

    #[test]
    fn classification_by_prefix() {
        assert!(is_contract_address("cx0000000000000000000000000000000000000000"));
        assert!(!is_contract_address("hx54f7853dc6481b670caf69c5a27c7c8fe5be8269"));
    }
}
