use std::collections::HashSet;
use std::io::Cursor;

use serde::Deserialize;

use super::{normalize_address, parse_decimal_to_wei};
use crate::error::ServiceError;

/// Row count above which a CSV is rejected.
pub const MAX_ROWS: usize = 100_000;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "WhitelistAddress")]
    whitelist_address: String,
    #[serde(rename = "WhitelistAmount")]
    whitelist_amount: String,
}

/// A validated, canonicalized whitelist entry ready for the tree
/// builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhitelistEntry {
    pub address: String,
    pub amount: String,
}

/// Parse and validate a whitelist CSV.
///
/// Columns `WhitelistAddress,WhitelistAmount`, header required, rows
/// trimmed, empty lines skipped. Validates row count, address syntax +
/// non-zero + checksum, amount length/format, and address uniqueness
/// after checksum normalization.
pub fn parse_and_validate_csv(bytes: &[u8]) -> Result<Vec<WhitelistEntry>, ServiceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(Cursor::new(bytes));

    let mut entries = Vec::new();
    let mut seen = HashSet::new();

    for result in reader.deserialize::<CsvRow>() {
        let row: CsvRow = result.map_err(|e| ServiceError::Validation(format!("malformed CSV row: {e}")))?;

        if row.whitelist_address.is_empty() && row.whitelist_amount.is_empty() {
            continue;
        }

        let address = normalize_address(&row.whitelist_address)?;

        if row.whitelist_amount.is_empty() || row.whitelist_amount.len() > 30 {
            return Err(ServiceError::Validation(format!(
                "amount must be 1-30 characters: {}",
                row.whitelist_amount
            )));
        }
        let wei = parse_decimal_to_wei(&row.whitelist_amount)?;

        if !seen.insert(address.clone()) {
            return Err(ServiceError::Validation(format!(
                "duplicate address after checksum normalization: {address}"
            )));
        }

        entries.push(WhitelistEntry {
            address,
            amount: wei.to_string(),
        });

        if entries.len() > MAX_ROWS {
            return Err(ServiceError::Validation(format!(
                "whitelist exceeds the maximum of {MAX_ROWS} rows"
            )));
        }
    }

    if entries.is_empty() {
        return Err(ServiceError::Validation(
            "whitelist CSV must contain at least one row".to_string(),
        ));
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv(rows: &[&str]) -> Vec<u8> {
        let mut content = String::from("WhitelistAddress,WhitelistAmount\n");
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        content.into_bytes()
    }

    #[test]
    fn empty_csv_is_validation_error() {
        let bytes = csv(&[]);
        let err = parse_and_validate_csv(&bytes).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn valid_rows_parse_and_scale_amounts() {
        let bytes = csv(&[
            "0xd31Febd31f4A368bce3e0A38ba5E8031d31Fe803,1250",
            "0x9F2e35C1A9E2C6D8c6b0e3f1A2d4B5c6E7F8BA16,53228.051486152399030389",
        ]);
        let entries = parse_and_validate_csv(&bytes).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].amount, "1250000000000000000000");
    }

    #[test]
    fn duplicate_addresses_after_checksum_normalization_fail() {
        let bytes = csv(&[
            "0xd31Febd31f4A368bce3e0A38ba5E8031d31Fe803,1250",
            "0xd31febd31f4a368bce3e0a38ba5e8031d31fe803,1250",
        ]);
        let err = parse_and_validate_csv(&bytes).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let mut content = String::from("WhitelistAddress,WhitelistAmount\n");
        content.push_str("0xd31Febd31f4A368bce3e0A38ba5E8031d31Fe803,1250\n");
        content.push('\n');
        let entries = parse_and_validate_csv(content.as_bytes()).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn row_count_over_max_rows_fails() {
        let mut content = String::from("WhitelistAddress,WhitelistAmount\n");
        for i in 0..(MAX_ROWS + 1) {
            content.push_str(&format!("0x{:040x},1\n", i + 1));
        }
        let err = parse_and_validate_csv(content.as_bytes()).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
