use std::str::FromStr;

use alloy::primitives::Address;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ServiceError;

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(0x|0X)[0-9A-Fa-f]{40}$").unwrap());

/// Validate an address and return its canonical EIP-55 checksummed
/// form.
///
/// Rules: the address must match the syntactic regex, must not be the
/// zero address, and must either be all-lowercase, all-uppercase, or
/// exactly match its EIP-55 checksum.
pub fn normalize_address(raw: &str) -> Result<String, ServiceError> {
    if !ADDRESS_RE.is_match(raw) {
        return Err(ServiceError::Validation(format!(
            "address does not match required syntax: {raw}"
        )));
    }

    let address = Address::from_str(raw)
        .map_err(|e| ServiceError::Validation(format!("invalid address: {e}")))?;

    if address.is_zero() {
        return Err(ServiceError::Validation(
            "the zero address is not a valid whitelist entry".to_string(),
        ));
    }

    let hex_part = &raw[2..];
    let checksummed = address.to_checksum(None);
    let checksummed_hex = &checksummed[2..];

    let is_all_lower = hex_part.chars().all(|c| !c.is_ascii_uppercase());
    let is_all_upper = hex_part.chars().all(|c| !c.is_ascii_lowercase());

    if is_all_lower || is_all_upper || hex_part == checksummed_hex {
        Ok(checksummed)
    } else {
        Err(ServiceError::Validation(format!(
            "address fails EIP-55 checksum validation: {raw}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_all_lowercase_address() {
        let result = normalize_address("0xd31febd31f4a368bce3e0a38ba5e8031d31fe803").unwrap();
        assert!(result.starts_with("0x"));
    }

    #[test]
    fn accepts_all_uppercase_address() {
        let result = normalize_address("0XD31FEBD31F4A368BCE3E0A38BA5E8031D31FE803").unwrap();
        assert!(result.starts_with("0x"));
    }

    #[test]
    fn rejects_zero_address() {
        let err = normalize_address("0x0000000000000000000000000000000000000000").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn rejects_malformed_syntax() {
        assert!(normalize_address("0xnothex").is_err());
        assert!(normalize_address("d31febd31f4a368bce3e0a38ba5e8031d31fe803").is_err());
    }

    #[test]
    fn normalization_is_idempotent_across_casing() {
        let lower = normalize_address("0xd31febd31f4a368bce3e0a38ba5e8031d31fe803").unwrap();
        let upper = normalize_address("0XD31FEBD31F4A368BCE3E0A38BA5E8031D31FE803").unwrap();
        assert_eq!(lower, upper);
    }
}
