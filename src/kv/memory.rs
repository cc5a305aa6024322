use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{
    chunked, ExpectedStatus, KvError, Page, ProofRecord, ProofsTable, RootRecord, RootsTable,
    WhitelistStatus, BATCH_WRITE_CHUNK_SIZE,
};

/// In-memory roots + proofs store used by unit and integration tests.
/// Emulates DynamoDB's conditional writes and strongly-consistent scans
/// without needing AWS credentials.
#[derive(Default)]
pub struct MemoryKvStore {
    roots: RwLock<BTreeMap<String, RootRecord>>,
    proofs: RwLock<BTreeMap<(String, String), ProofRecord>>,
    /// Chunk indices (0-based, per call to `batch_insert`) that should
    /// fail outright, for exercising the compensating-transition paths
    /// in lifecycle tests.
    fail_insert_chunks: RwLock<Vec<usize>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`-th `batch_insert` chunk (0-indexed) fail on its
    /// next call.
    pub fn fail_insert_chunk(&self, chunk_index: usize) {
        self.fail_insert_chunks.write().push(chunk_index);
    }
}

#[async_trait]
impl RootsTable for MemoryKvStore {
    async fn get(&self, whitelist_name: &str) -> Result<Option<RootRecord>, KvError> {
        Ok(self.roots.read().get(whitelist_name).cloned())
    }

    async fn insert_creating(
        &self,
        whitelist_name: &str,
        merkle_root: &str,
    ) -> Result<(), KvError> {
        let mut roots = self.roots.write();
        if roots.contains_key(whitelist_name) {
            return Err(KvError::ConditionalCheckFailed);
        }
        roots.insert(
            whitelist_name.to_string(),
            RootRecord {
                whitelist_name: whitelist_name.to_string(),
                merkle_root: merkle_root.to_string(),
                status: WhitelistStatus::Creating,
            },
        );
        Ok(())
    }

    async fn transition(
        &self,
        whitelist_name: &str,
        expected_root: &str,
        from: ExpectedStatus,
        to: WhitelistStatus,
    ) -> Result<(), KvError> {
        let mut roots = self.roots.write();
        let Some(row) = roots.get_mut(whitelist_name) else {
            return Err(KvError::ConditionalCheckFailed);
        };
        if row.merkle_root != expected_root || !from.matches(row.status) {
            return Err(KvError::ConditionalCheckFailed);
        }
        row.status = to;
        Ok(())
    }

    async fn delete(&self, whitelist_name: &str) -> Result<(), KvError> {
        self.roots.write().remove(whitelist_name);
        Ok(())
    }

    async fn scan(
        &self,
        page_size: u32,
        starting_token: Option<&str>,
    ) -> Result<Page<RootRecord>, KvError> {
        let roots = self.roots.read();
        let mut iter = roots.iter();
        if let Some(token) = starting_token {
            for (key, _) in iter.by_ref() {
                if key == token {
                    break;
                }
            }
        }
        let mut items = Vec::new();
        let mut next_token = None;
        for (key, value) in iter {
            if items.len() as u32 == page_size {
                next_token = Some(key.clone());
                break;
            }
            items.push(value.clone());
        }
        Ok(Page { items, next_token })
    }
}

#[async_trait]
impl ProofsTable for MemoryKvStore {
    async fn get(
        &self,
        whitelist_name: &str,
        whitelist_address: &str,
    ) -> Result<Option<ProofRecord>, KvError> {
        Ok(self
            .proofs
            .read()
            .get(&(whitelist_name.to_string(), whitelist_address.to_string()))
            .cloned())
    }

    async fn query_all(&self, whitelist_name: &str) -> Result<Vec<ProofRecord>, KvError> {
        Ok(self
            .proofs
            .read()
            .range((whitelist_name.to_string(), String::new())..)
            .take_while(|((name, _), _)| name == whitelist_name)
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn batch_insert(
        &self,
        records: Vec<ProofRecord>,
        max_retries: u32,
    ) -> Result<(), KvError> {
        let chunks = chunked(records, BATCH_WRITE_CHUNK_SIZE);
        for (index, chunk) in chunks.into_iter().enumerate() {
            let should_fail = {
                let mut faults = self.fail_insert_chunks.write();
                if let Some(pos) = faults.iter().position(|c| *c == index) {
                    faults.remove(pos);
                    true
                } else {
                    false
                }
            };
            if should_fail {
                return Err(KvError::InternalError(format!(
                    "simulated failure inserting chunk {index}"
                )));
            }
            let _ = max_retries;
            let mut proofs = self.proofs.write();
            for record in chunk {
                proofs.insert(
                    (record.whitelist_name.clone(), record.whitelist_address.clone()),
                    record,
                );
            }
        }
        Ok(())
    }

    async fn batch_delete(
        &self,
        whitelist_name: &str,
        whitelist_addresses: Vec<String>,
        max_retries: u32,
    ) -> Result<(), KvError> {
        let _ = max_retries;
        let chunks = chunked(whitelist_addresses, BATCH_WRITE_CHUNK_SIZE);
        let mut proofs = self.proofs.write();
        for chunk in chunks {
            for address in chunk {
                proofs.remove(&(whitelist_name.to_string(), address));
            }
        }
        Ok(())
    }
}
