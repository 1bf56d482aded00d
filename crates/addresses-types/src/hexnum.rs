//! Arbitrary-precision hex <-> decimal conversion for ICX-denominated quantities.
//!
//! Every monetary value in the store is kept in two representations (I1):
//! a `"0x"`-prefixed hex string of the integer quantity, and a normalized
//! `f64` obtained by dividing that integer by `10^18`. This module is the
//! single place that performs the conversion so the two representations
//! can never drift apart.
//!
//! Quantities are sign-magnitude, like the upstream `math/big.Int` values
//! they are ported from: a balance can go negative mid-replay (e.g. a
//! transfer debiting an address with no prior credit in an isolated test
//! fixture), and is rendered as `"-0x.."`.

use std::{cmp::Ordering, fmt, str::FromStr};

use alloy_primitives::U256;
use thiserror::Error;

/// `10^18`, the number of decimals ICX balances are denominated in.
pub const ICX_DECIMALS: u32 = 18;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HexNumError {
    #[error("hex value `{0}` is missing the 0x prefix")]
    MissingPrefix(String),
    #[error("hex value `{0}` is not valid hex")]
    InvalidHex(String)
}

/// A sign-magnitude arbitrary-precision integer, encoded on the wire and in
/// the store as an optionally `-`-prefixed `"0x"` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedQuantity {
    negative: bool,
    magnitude: U256
}

impl SignedQuantity {
    pub const ZERO: Self = Self { negative: false, magnitude: U256::ZERO };

    pub fn is_zero(&self) -> bool {
        self.magnitude.is_zero()
    }

    pub fn from_hex(value: &str) -> Result<Self, HexNumError> {
        let (negative, rest) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value)
        };

        let stripped = rest
            .strip_prefix("0x")
            .or_else(|| rest.strip_prefix("0X"))
            .ok_or_else(|| HexNumError::MissingPrefix(value.to_owned()))?;

        if stripped.is_empty() {
            return Ok(Self::ZERO)
        }

        let magnitude =
            U256::from_str_radix(stripped, 16).map_err(|_| HexNumError::InvalidHex(value.to_owned()))?;

        // Normalize "-0x0" to a non-negative zero.
        let negative = negative && !magnitude.is_zero();
        Ok(Self { negative, magnitude })
    }

    pub fn decimal(&self) -> f64 {
        let digits = self.magnitude.to_string();
        let scaled: f64 = scaled_decimal_string(&digits, ICX_DECIMALS)
            .parse()
            .expect("digit string built from a scaled integer is always valid float syntax");
        if self.negative {
            -scaled
        } else {
            scaled
        }
    }

    fn checked_add(self, rhs: Self) -> Self {
        match (self.negative, rhs.negative) {
            (false, false) => Self { negative: false, magnitude: self.magnitude + rhs.magnitude },
            (true, true) => Self { negative: true, magnitude: self.magnitude + rhs.magnitude },
            _ => {
                // Opposite signs: subtract the smaller magnitude from the larger
                // and keep the sign of whichever had the larger magnitude.
                match self.magnitude.cmp(&rhs.magnitude) {
                    Ordering::Equal => Self::ZERO,
                    Ordering::Greater => Self {
                        negative: self.negative,
                        magnitude: self.magnitude - rhs.magnitude
                    },
                    Ordering::Less => {
                        Self { negative: rhs.negative, magnitude: rhs.magnitude - self.magnitude }
                    }
                }
            }
        }
    }

    fn negated(self) -> Self {
        if self.is_zero() {
            self
        } else {
            Self { negative: !self.negative, magnitude: self.magnitude }
        }
    }
}

impl fmt::Display for SignedQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-0x{:x}", self.magnitude)
        } else {
            write!(f, "0x{:x}", self.magnitude)
        }
    }
}

impl FromStr for SignedQuantity {
    type Err = HexNumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

fn scaled_decimal_string(digits: &str, decimals: u32) -> String {
    let decimals = decimals as usize;
    if digits.len() <= decimals {
        let padded = format!("{:0>width$}", digits, width = decimals + 1);
        let split = padded.len() - decimals;
        format!("{}.{}", &padded[..split], &padded[split..])
    } else {
        let split = digits.len() - decimals;
        format!("{}.{}", &digits[..split], &digits[split..])
    }
}

/// Divides a raw hex quantity by `10^ICX_DECIMALS`, returning the decimal
/// value (I1).
pub fn hex_to_decimal(hex: &str) -> Result<f64, HexNumError> {
    Ok(SignedQuantity::from_hex(hex)?.decimal())
}

/// `true` when a hex quantity is exactly zero (the "zero value" of the hex
/// semantic type, used by the partial-upsert rule in §4.3.1).
pub fn is_zero_hex(value: &str) -> bool {
    value.is_empty() || matches!(SignedQuantity::from_hex(value), Ok(v) if v.is_zero())
}

/// `price * used`, re-encoded as hex. Arbitrary-precision so step price and
/// step count may together exceed 64 bits. Always non-negative.
pub fn compute_fee_hex(step_price_hex: &str, step_used_hex: &str) -> Result<String, HexNumError> {
    let price = SignedQuantity::from_hex(step_price_hex)?;
    let used = SignedQuantity::from_hex(step_used_hex)?;
    let product = price.magnitude.saturating_mul(used.magnitude);
    Ok(SignedQuantity { negative: false, magnitude: product }.to_string())
}

/// `prior + delta`, re-encoded as hex.
pub fn add_hex(prior_hex: &str, delta_hex: &str) -> Result<String, HexNumError> {
    let prior = SignedQuantity::from_hex(prior_hex)?;
    let delta = SignedQuantity::from_hex(delta_hex)?;
    Ok(prior.checked_add(delta).to_string())
}

/// `prior - value - fee`, re-encoded as hex. May go negative (§8 scenario
/// 2): the store keeps sign-magnitude quantities, it does not clamp at
/// zero.
pub fn sub_hex(prior_hex: &str, value_hex: &str, fee_hex: &str) -> Result<String, HexNumError> {
    let prior = SignedQuantity::from_hex(prior_hex)?;
    let value = SignedQuantity::from_hex(value_hex)?;
    let fee = SignedQuantity::from_hex(fee_hex)?;
    let spent = value.checked_add(fee);
    Ok(prior.checked_add(spent.negated()).to_string())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn genesis_credit_matches_scenario_1() {
        let hex = "0x2961FFF8CA4A62327800000";
        let decimal = hex_to_decimal(hex).unwrap();
        assert_eq!(decimal, 800_460_000.0);
    }

    #[test]
    fn zero_is_zero() {
        assert!(is_zero_hex("0x0"));
        assert!(is_zero_hex("0x"));
        assert!(is_zero_hex(""));
        assert!(!is_zero_hex("0x1"));
    }

    #[test]
    fn two_party_transfer_matches_scenario_2() {
        // from=hxA, to=hxB, value=0x10, price=0x1, used=0x1, both starting
        // from a zero prior balance.
        let fee = compute_fee_hex("0x1", "0x1").unwrap();
        assert_eq!(fee, "0x1");

        let from_balance = sub_hex("0x0", "0x10", &fee).unwrap();
        assert_eq!(from_balance, "-0x11");

        let to_balance = add_hex("0x0", "0x10").unwrap();
        assert_eq!(to_balance, "0x10");
    }

    #[test]
    fn add_and_sub_round_trip() {
        let after_credit = add_hex("0x0", "0x10").unwrap();
        assert_eq!(after_credit, "0x10");
        let after_debit = sub_hex(&after_credit, "0x10", "0x0").unwrap();
        assert_eq!(after_debit, "0x0");
    }

    #[test]
    fn negative_balance_can_recover_to_positive() {
        let negative = sub_hex("0x0", "0x5", "0x0").unwrap();
        assert_eq!(negative, "-0x5");
        let recovered = add_hex(&negative, "0xa").unwrap();
        assert_eq!(recovered, "0x5");
    }

    proptest! {
        #[test]
        fn p5_hex_decimal_round_trip(n in any::<u64>()) {
            let hex = format!("0x{n:x}");
            let parsed = SignedQuantity::from_hex(&hex).unwrap();
            prop_assert_eq!(parsed.to_string(), hex);
        }
    }
}
