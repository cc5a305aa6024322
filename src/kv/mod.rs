//! KV adapter: typed access to the roots and proofs
//! tables, with strongly-consistent reads, chunked bulk writes, and an
//! unprocessed-items retry loop with exponential backoff.

mod dynamodb;
mod memory;
mod models;

use async_trait::async_trait;
use thiserror::Error;

pub use dynamodb::DynamoDbKvStore;
pub use memory::MemoryKvStore;
pub use models::{Page, ProofRecord, RootRecord, WhitelistStatus};

/// Item count per `batchPutWrite`/`batchInsertViaStatement` chunk.
pub const BATCH_WRITE_CHUNK_SIZE: usize = 25;
/// Default retry budget for the unprocessed-items loop.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Failure taxonomy for the KV adapter.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("conditional check failed")]
    ConditionalCheckFailed,

    #[error("throttled: {0}")]
    Throttled(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    InternalError(String),

    #[error("resource not found")]
    ResourceNotFound,

    #[error("Access denied")]
    AccessDenied,

    /// The unprocessed-items retry loop exhausted its budget with
    /// items still unprocessed. Surfaced rather than silently dropped.
    #[error("batch write partially failed: {0} item(s) left unprocessed")]
    PartialBatch(usize),

    #[error("{0}")]
    Other(String),
}

/// The status (or disjunction of statuses) a conditional write expects
/// to observe before applying a transition.
#[derive(Debug, Clone)]
pub enum ExpectedStatus {
    Exactly(WhitelistStatus),
    OneOf(Vec<WhitelistStatus>),
}

impl ExpectedStatus {
    pub fn matches(&self, actual: WhitelistStatus) -> bool {
        match self {
            Self::Exactly(expected) => *expected == actual,
            Self::OneOf(candidates) => candidates.contains(&actual),
        }
    }
}

/// Typed access to the roots table.
#[async_trait]
pub trait RootsTable: Send + Sync + 'static {
    /// Strongly-consistent point read.
    async fn get(&self, whitelist_name: &str) -> Result<Option<RootRecord>, KvError>;

    /// Insert-only conditional write: fails with
    /// `KvError::ConditionalCheckFailed` if a row already exists
    /// (absent -> CREATING).
    async fn insert_creating(&self, whitelist_name: &str, merkle_root: &str)
        -> Result<(), KvError>;

    /// Conditional status transition pinning both the current status
    /// and the expected (unchanging) root value.
    async fn transition(
        &self,
        whitelist_name: &str,
        expected_root: &str,
        from: ExpectedStatus,
        to: WhitelistStatus,
    ) -> Result<(), KvError>;

    /// Unconditional delete of the root row (DELETING -> absent).
    async fn delete(&self, whitelist_name: &str) -> Result<(), KvError>;

    /// Strongly-consistent scan with a `Limit` and opaque continuation
    /// token derived from the last-evaluated key.
    async fn scan(
        &self,
        page_size: u32,
        starting_token: Option<&str>,
    ) -> Result<Page<RootRecord>, KvError>;
}

/// Typed access to the proofs table.
#[async_trait]
pub trait ProofsTable: Send + Sync + 'static {
    /// Strongly-consistent point read keyed by `(name, address)`.
    async fn get(
        &self,
        whitelist_name: &str,
        whitelist_address: &str,
    ) -> Result<Option<ProofRecord>, KvError>;

    /// Strongly-consistent paginated query of every row for a name,
    /// fully drained (up to 100,000 rows).
    async fn query_all(&self, whitelist_name: &str) -> Result<Vec<ProofRecord>, KvError>;

    /// Bulk insert in chunks of `BATCH_WRITE_CHUNK_SIZE`, retrying
    /// unprocessed items with `10ms * 2^i` backoff up to `max_retries`.
    async fn batch_insert(
        &self,
        records: Vec<ProofRecord>,
        max_retries: u32,
    ) -> Result<(), KvError>;

    /// Bulk delete by sort key in chunks of `BATCH_WRITE_CHUNK_SIZE`,
    /// same retry policy as `batch_insert`.
    async fn batch_delete(
        &self,
        whitelist_name: &str,
        whitelist_addresses: Vec<String>,
        max_retries: u32,
    ) -> Result<(), KvError>;
}

/// Split `items` into chunks no larger than `chunk_size`. Shared by
/// every backend so chunk boundaries are identical across
/// implementations.
pub fn chunked<T>(items: Vec<T>, chunk_size: usize) -> Vec<Vec<T>> {
    let mut chunks = Vec::new();
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(chunk_size).collect());
    }
    chunks
}

/// Backoff delay before the `attempt`-th retry (0-indexed): `10ms * 2^i`.
pub fn backoff_delay(attempt: u32) -> std::time::Duration {
    std::time::Duration::from_millis(10 * 2u64.pow(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunked_splits_at_boundary() {
        let items: Vec<u32> = (0..60).collect();
        let chunks = chunked(items, 25);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 25);
        assert_eq!(chunks[1].len(), 25);
        assert_eq!(chunks[2].len(), 10);
    }

    #[test]
    fn chunked_empty_input_yields_no_chunks() {
        let chunks = chunked(Vec::<u32>::new(), 25);
        assert!(chunks.is_empty());
    }

    #[test]
    fn backoff_grows_exponentially() {
        assert_eq!(backoff_delay(0).as_millis(), 10);
        assert_eq!(backoff_delay(1).as_millis(), 20);
        assert_eq!(backoff_delay(2).as_millis(), 40);
    }

    #[test]
    fn expected_status_one_of_matches_either() {
        let expected =
            ExpectedStatus::OneOf(vec![WhitelistStatus::Completed, WhitelistStatus::Failed]);
        assert!(expected.matches(WhitelistStatus::Completed));
        assert!(expected.matches(WhitelistStatus::Failed));
        assert!(!expected.matches(WhitelistStatus::Creating));
    }
}
