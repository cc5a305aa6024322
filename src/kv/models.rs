use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a Merkle root row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WhitelistStatus {
    Creating,
    Completed,
    Failed,
    Deleting,
}

impl fmt::Display for WhitelistStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Creating => "CREATING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Deleting => "DELETING",
        })
    }
}

impl FromStr for WhitelistStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATING" => Ok(Self::Creating),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "DELETING" => Ok(Self::Deleting),
            other => Err(format!("unknown whitelist status: {other}")),
        }
    }
}

/// Roots table row: partition key `whitelist_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootRecord {
    pub whitelist_name: String,
    pub merkle_root: String,
    pub status: WhitelistStatus,
}

/// Proofs table row: partition key `whitelist_name`, sort key
/// `whitelist_address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRecord {
    pub whitelist_name: String,
    pub whitelist_address: String,
    pub whitelist_amount_wei: String,
    pub merkle_proof: String,
}

/// A page of scan/query results plus an opaque continuation token.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}
