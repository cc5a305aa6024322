//! Object-store adapter: read/write/delete whitelist CSV
//! blobs, with naming and size bounds enforced before any network call.

mod memory;
mod s3;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

/// Maximum time to poll after a delete before giving up on
/// wait-until-absent.
pub const DELETE_WAIT_TIMEOUT_SECS: u64 = 30;

static BUCKET_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-z][0-9a-z-]{1,61}[0-9a-z]$").unwrap());
static KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9A-Za-z!\-_.'()]+$").unwrap());

const BUCKET_FORBIDDEN_PREFIXES: &[&str] =
    &["xn--", "sthree-", "sthree-configurator", "amzn-s3-demo-"];
const BUCKET_FORBIDDEN_SUFFIXES: &[&str] = &["-s3alias", "--ol-s3", ".mrap", "--x-s3"];

/// Errors the object-store adapter can surface.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object not found")]
    NotFound,

    #[error("object already exists")]
    Exists,

    #[error("invalid bucket name: {0}")]
    InvalidBucket(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("object store error: {0}")]
    Other(String),
}

/// Validate a bucket name against the S3 naming rules.
pub fn validate_bucket_name(name: &str) -> Result<(), ObjectStoreError> {
    if name.len() < 3 || name.len() > 63 || !BUCKET_NAME_RE.is_match(name) {
        return Err(ObjectStoreError::InvalidBucket(name.to_string()));
    }
    if BUCKET_FORBIDDEN_PREFIXES
        .iter()
        .any(|p| name.starts_with(p))
    {
        return Err(ObjectStoreError::InvalidBucket(name.to_string()));
    }
    if BUCKET_FORBIDDEN_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        return Err(ObjectStoreError::InvalidBucket(name.to_string()));
    }
    Ok(())
}

/// Validate an object key against the same naming rules.
pub fn validate_key(key: &str) -> Result<(), ObjectStoreError> {
    if key.is_empty() || key.len() > 1024 || !KEY_RE.is_match(key) {
        return Err(ObjectStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// The key a whitelist CSV is stored under for a given whitelist name.
pub fn whitelist_key(whitelist_name: &str) -> String {
    format!("{whitelist_name}.csv")
}

/// Object-store adapter trait. Implementations back this
/// with S3 in production and an in-memory map in tests.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Fetch an object's bytes, or `ObjectStoreError::NotFound`.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError>;

    /// Write an object. When `allow_overwrite` is `false`, the write
    /// MUST be enforced server-side via an if-none-match precondition
    /// and surface `ObjectStoreError::Exists` on conflict.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        allow_overwrite: bool,
    ) -> Result<(), ObjectStoreError>;

    /// Delete an object and wait until a subsequent `get` would observe
    /// it absent, bounded by `DELETE_WAIT_TIMEOUT_SECS`.
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_bucket_names() {
        assert!(validate_bucket_name("my-whitelist-bucket").is_ok());
        assert!(validate_bucket_name("abc").is_ok());
    }

    #[test]
    fn rejects_short_or_malformed_bucket_names() {
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name("My-Bucket").is_err());
        assert!(validate_bucket_name("-leading-dash").is_err());
    }

    #[test]
    fn rejects_reserved_bucket_prefixes_and_suffixes() {
        assert!(validate_bucket_name("xn--bucket-name").is_err());
        assert!(validate_bucket_name("sthree-bucket-name").is_err());
        assert!(validate_bucket_name("bucket-name--ol-s3").is_err());
        assert!(validate_bucket_name("bucket-name.mrap").is_err());
    }

    #[test]
    fn key_regex_matches_spec() {
        assert!(validate_key("w0.csv").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key(&"a".repeat(1025)).is_err());
        assert!(validate_key("bad key with spaces").is_err());
    }

    #[test]
    fn whitelist_key_is_name_dot_csv() {
        assert_eq!(whitelist_key("w0"), "w0.csv");
    }
}
