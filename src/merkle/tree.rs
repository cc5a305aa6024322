use std::str::FromStr;

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy_sol_types::SolValue;

use super::WhitelistEntry;
use crate::error::ServiceError;

/// One leaf's emitted proof, ready for the proofs table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofEntry {
    pub address: String,
    pub amount_wei: String,
    /// Comma-joined `0x`-prefixed hex siblings, empty for a single-leaf
    /// tree.
    pub proof: String,
}

/// The root hash plus every leaf's proof.
#[derive(Debug, Clone)]
pub struct MerkleBuildResult {
    pub root: String,
    pub proofs: Vec<ProofEntry>,
}

fn leaf_hash(address: &str, amount_wei: &str) -> Result<B256, ServiceError> {
    let address = Address::from_str(address)
        .map_err(|e| ServiceError::Validation(format!("invalid address for leaf hashing: {e}")))?;
    let amount = U256::from_str(amount_wei)
        .map_err(|e| ServiceError::Validation(format!("invalid amount for leaf hashing: {e}")))?;

    let encoded = (address, amount).abi_encode();
    let inner = keccak256(encoded);
    Ok(keccak256(inner.as_slice()))
}

fn hash_pair(a: B256, b: B256) -> B256 {
    let (lo, hi) = if a.as_slice() <= b.as_slice() { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(lo.as_slice());
    buf[32..].copy_from_slice(hi.as_slice());
    keccak256(buf)
}

fn hex32(hash: B256) -> String {
    format!("0x{}", hex::encode(hash.as_slice()))
}

/// Build the sorted-pair double-keccak Merkle tree over `entries` and
/// emit the root plus each leaf's proof.
///
/// Preconditions (row count, address/amount validity, duplicate
/// detection) are enforced by `parse_and_validate_csv` before this
/// runs; this function only rejects an empty input, since a whitelist
/// can only reach here after CSV validation succeeded.
pub fn build_tree(entries: &[WhitelistEntry]) -> Result<MerkleBuildResult, ServiceError> {
    if entries.is_empty() {
        return Err(ServiceError::Validation(
            "cannot build a Merkle tree over zero entries".to_string(),
        ));
    }

    let leaves: Vec<B256> = entries
        .iter()
        .map(|e| leaf_hash(&e.address, &e.amount))
        .collect::<Result<_, _>>()?;

    if leaves.len() == 1 {
        return Ok(MerkleBuildResult {
            root: hex32(leaves[0]),
            proofs: vec![ProofEntry {
                address: entries[0].address.clone(),
                amount_wei: entries[0].amount.clone(),
                proof: String::new(),
            }],
        });
    }

    // Build every level bottom-up, keeping each level around so we can
    // walk back down to collect each leaf's sibling path.
    let mut levels: Vec<Vec<B256>> = vec![leaves];
    while levels.last().unwrap().len() > 1 {
        let current = levels.last().unwrap();
        let mut next = Vec::with_capacity(current.len().div_ceil(2));
        let mut i = 0;
        while i < current.len() {
            if i + 1 < current.len() {
                next.push(hash_pair(current[i], current[i + 1]));
                i += 2;
            } else {
                next.push(current[i]);
                i += 1;
            }
        }
        levels.push(next);
    }

    let root = levels.last().unwrap()[0];

    let proofs = entries
        .iter()
        .enumerate()
        .map(|(leaf_index, entry)| {
            let mut index = leaf_index;
            let mut siblings = Vec::new();
            for level in &levels[..levels.len() - 1] {
                let sibling_index = if index % 2 == 0 { index + 1 } else { index - 1 };
                if let Some(sibling) = level.get(sibling_index) {
                    siblings.push(hex32(*sibling));
                }
                index /= 2;
            }
            ProofEntry {
                address: entry.address.clone(),
                amount_wei: entry.amount.clone(),
                proof: siblings.join(","),
            }
        })
        .collect();

    Ok(MerkleBuildResult {
        root: hex32(root),
        proofs,
    })
}

/// Verify a leaf's proof against a root, following the same
/// sorted-pair hashing rule used to build the tree. Used by tests and
/// available for operator tooling / defensive re-verification.
pub fn verify_proof(root: &str, address: &str, amount_wei: &str, proof: &str) -> bool {
    let Ok(mut computed) = leaf_hash(address, amount_wei) else {
        return false;
    };
    if !proof.is_empty() {
        for sibling_hex in proof.split(',') {
            let Some(hex_digits) = sibling_hex.strip_prefix("0x") else {
                return false;
            };
            let Ok(bytes) = hex::decode(hex_digits) else {
                return false;
            };
            let Ok(sibling) = B256::try_from(bytes.as_slice()) else {
                return false;
            };
            computed = hash_pair(computed, sibling);
        }
    }
    hex32(computed) == root
}
