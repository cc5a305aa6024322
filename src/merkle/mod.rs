//! Merkle builder: CSV input gate, canonical leaf
//! encoding, sorted-pair tree construction, and proof emission.
//!
//! The leaf and hash order are chosen to match the on-chain verifier
//! bit-exactly: `leaf = keccak256(keccak256(abi.encode(address,
//! uint256)))`, parent = `keccak256(min(a, b) ++ max(a, b))` with
//! unsigned big-endian comparison.

mod address;
mod csv_input;
mod tree;

use alloy::primitives::U256;

pub use address::normalize_address;
pub use csv_input::{parse_and_validate_csv, WhitelistEntry, MAX_ROWS};
pub use tree::{build_tree, MerkleBuildResult, ProofEntry};

use crate::error::ServiceError;

/// Parse a decimal (possibly fractional) amount string into an integer
/// wei value scaled by 18 decimals. The raw string's length
/// bound (1-30) is checked by the caller before this runs.
pub fn parse_decimal_to_wei(amount: &str) -> Result<U256, ServiceError> {
    if amount.is_empty() || amount.len() > 30 {
        return Err(ServiceError::Validation(format!(
            "amount must be 1-30 characters: {amount}"
        )));
    }

    let mut parts = amount.splitn(2, '.');
    let integer_part = parts.next().unwrap_or("");
    let fraction_part = parts.next().unwrap_or("");

    if integer_part.is_empty() || !integer_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ServiceError::Validation(format!(
            "invalid amount integer part: {amount}"
        )));
    }
    if !fraction_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ServiceError::Validation(format!(
            "invalid amount fractional part: {amount}"
        )));
    }
    if fraction_part.len() > 18 {
        return Err(ServiceError::Validation(format!(
            "amount has more than 18 fractional digits: {amount}"
        )));
    }

    let padded_fraction = format!("{fraction_part:0<18}");
    let combined = format!("{integer_part}{padded_fraction}");

    combined
        .parse::<U256>()
        .map_err(|e| ServiceError::Validation(format!("amount does not parse as an integer: {e}")))
}

/// Render a wei `U256` back to its base-10 decimal string, as stored in
/// the proofs table (`WhitelistAmountWei`).
pub fn wei_to_decimal_string(wei: U256) -> String {
    wei.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_fractional_amount_by_18_decimals() {
        let wei = parse_decimal_to_wei("6666.67").unwrap();
        assert_eq!(wei.to_string(), "6666670000000000000000");
    }

    #[test]
    fn scales_whole_amount_by_18_decimals() {
        let wei = parse_decimal_to_wei("1250").unwrap();
        assert_eq!(wei.to_string(), "1250000000000000000000");
    }

    #[test]
    fn accepts_exactly_18_fractional_digits() {
        let wei = parse_decimal_to_wei("53228.051486152399030389").unwrap();
        assert_eq!(wei.to_string(), "53228051486152399030389");
    }

    #[test]
    fn rejects_more_than_18_fractional_digits() {
        assert!(parse_decimal_to_wei("1.1234567890123456789").is_err());
    }

    #[test]
    fn rejects_empty_and_overlong_amounts() {
        assert!(parse_decimal_to_wei("").is_err());
        assert!(parse_decimal_to_wei(&"1".repeat(31)).is_err());
    }

    #[test]
    fn rejects_non_numeric_amounts() {
        assert!(parse_decimal_to_wei("abc").is_err());
        assert!(parse_decimal_to_wei(".5").is_err());
        assert!(parse_decimal_to_wei("-5").is_err());
    }
}
