//! Tree lifecycle orchestrator: the roots-table row is a single-writer
//! state machine keyed by whitelist name, and this is the only writer.

use std::sync::Arc;

use tracing::{error, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::kv::{ExpectedStatus, KvError, ProofRecord, ProofsTable, RootsTable, WhitelistStatus};
use crate::merkle::build_tree;
use crate::object_store::{whitelist_key, ObjectStore, ObjectStoreError};

impl From<KvError> for ServiceError {
    fn from(err: KvError) -> Self {
        match err {
            KvError::ConditionalCheckFailed => ServiceError::ConditionalCheckFailed,
            KvError::Throttled(msg) => ServiceError::Throttled(msg),
            KvError::Conflict(msg) => ServiceError::Conflict(msg),
            KvError::InternalError(msg) => ServiceError::InternalError(msg),
            KvError::ResourceNotFound => ServiceError::ResourceNotFound,
            KvError::AccessDenied => ServiceError::Other("Access denied".to_string()),
            KvError::PartialBatch(remaining) => {
                ServiceError::InternalError(format!("{remaining} item(s) left unprocessed"))
            }
            KvError::Other(msg) => ServiceError::Other(msg),
        }
    }
}

impl From<ObjectStoreError> for ServiceError {
    fn from(err: ObjectStoreError) -> Self {
        match err {
            ObjectStoreError::NotFound => ServiceError::ResourceNotFound,
            ObjectStoreError::Exists => ServiceError::Validation("object already exists".to_string()),
            ObjectStoreError::InvalidBucket(msg) => ServiceError::Validation(msg),
            ObjectStoreError::InvalidKey(msg) => ServiceError::Validation(msg),
            ObjectStoreError::Other(msg) => ServiceError::InternalError(msg),
        }
    }
}

/// Bulk-write retry budget used throughout the orchestrator's batch
/// steps.
const MAX_RETRIES: u32 = 3;

/// Coordinates the object store and KV adapter through the tree
/// create/delete protocols, holding `Arc<dyn ...>` handles
/// constructed once at startup.
pub struct TreeLifecycle {
    bucket: String,
    object_store: Arc<dyn ObjectStore>,
    roots: Arc<dyn RootsTable>,
    proofs: Arc<dyn ProofsTable>,
}

impl TreeLifecycle {
    pub fn new(
        bucket: String,
        object_store: Arc<dyn ObjectStore>,
        roots: Arc<dyn RootsTable>,
        proofs: Arc<dyn ProofsTable>,
    ) -> Self {
        Self {
            bucket,
            object_store,
            roots,
            proofs,
        }
    }

    /// Upload a whitelist CSV (control flow: input gate -> object
    /// store write). Validation happens here so a malformed CSV never
    /// reaches the object store.
    pub async fn upload_whitelist(
        &self,
        whitelist_name: &str,
        bytes: Vec<u8>,
        allow_overwrite: bool,
    ) -> ServiceResult<()> {
        crate::merkle::parse_and_validate_csv(&bytes)?;
        let key = whitelist_key(whitelist_name);
        self.object_store
            .put(&self.bucket, &key, bytes, "text/csv", allow_overwrite)
            .await?;
        Ok(())
    }

    /// `DeleteWhitelist`: refuses when a root row exists for this name
    /// in any status, otherwise deletes the CSV.
    pub async fn delete_whitelist(&self, whitelist_name: &str) -> ServiceResult<()> {
        if self.roots.get(whitelist_name).await?.is_some() {
            return Err(ServiceError::Validation(
                "a Merkle tree exists for this whitelist; delete it first".to_string(),
            ));
        }
        let key = whitelist_key(whitelist_name);
        self.object_store.delete(&self.bucket, &key).await?;
        Ok(())
    }

    /// `CreateTree` protocol:
    /// 1. Read + build.
    /// 2. Insert-only conditional CREATING row.
    /// 3. Bulk-insert proofs; on failure, compensate to FAILED.
    /// 4. On success, conditional transition to COMPLETED.
    pub async fn create_tree(&self, whitelist_name: &str) -> ServiceResult<String> {
        let key = whitelist_key(whitelist_name);
        let bytes = self.object_store.get(&self.bucket, &key).await?;
        let entries = crate::merkle::parse_and_validate_csv(&bytes)?;
        let built = build_tree(&entries)?;

        self.roots
            .insert_creating(whitelist_name, &built.root)
            .await?;

        let records: Vec<ProofRecord> = built
            .proofs
            .iter()
            .map(|p| ProofRecord {
                whitelist_name: whitelist_name.to_string(),
                whitelist_address: p.address.clone(),
                whitelist_amount_wei: p.amount_wei.clone(),
                merkle_proof: p.proof.clone(),
            })
            .collect();

        if let Err(insert_err) = self.proofs.batch_insert(records, MAX_RETRIES).await {
            if let Err(compensate_err) = self
                .roots
                .transition(
                    whitelist_name,
                    &built.root,
                    ExpectedStatus::Exactly(WhitelistStatus::Creating),
                    WhitelistStatus::Failed,
                )
                .await
            {
                error!(
                    whitelist_name,
                    error = %compensate_err,
                    "compensating transition to FAILED did not apply; root row stuck at CREATING"
                );
            }
            return Err(insert_err.into());
        }

        self.roots
            .transition(
                whitelist_name,
                &built.root,
                ExpectedStatus::Exactly(WhitelistStatus::Creating),
                WhitelistStatus::Completed,
            )
            .await?;

        Ok(built.root)
    }

    /// `DeleteTree` protocol:
    /// 1. Read root row; refuse if absent or mid-transition.
    /// 2. Conditional transition to DELETING.
    /// 3. Enumerate + bulk-delete proofs, then delete the root row.
    /// 4. On step-3 failure, compensate back to FAILED.
    pub async fn delete_tree(&self, whitelist_name: &str) -> ServiceResult<()> {
        let row = self
            .roots
            .get(whitelist_name)
            .await?
            .ok_or_else(|| ServiceError::Validation("no Merkle tree exists for this whitelist".to_string()))?;

        if matches!(row.status, WhitelistStatus::Creating | WhitelistStatus::Deleting) {
            return Err(ServiceError::Validation(format!(
                "whitelist is mid-transition ({}); try again later",
                row.status
            )));
        }

        self.roots
            .transition(
                whitelist_name,
                &row.merkle_root,
                ExpectedStatus::OneOf(vec![WhitelistStatus::Completed, WhitelistStatus::Failed]),
                WhitelistStatus::Deleting,
            )
            .await?;

        if let Err(err) = self.drain_and_delete_proofs(whitelist_name).await {
            warn!(whitelist_name, %err, "proof deletion failed; compensating to FAILED");
            if let Err(compensate_err) = self
                .roots
                .transition(
                    whitelist_name,
                    &row.merkle_root,
                    ExpectedStatus::Exactly(WhitelistStatus::Deleting),
                    WhitelistStatus::Failed,
                )
                .await
            {
                error!(
                    whitelist_name,
                    error = %compensate_err,
                    "compensating transition to FAILED did not apply; root row stuck at DELETING"
                );
            }
            return Err(err);
        }

        self.roots.delete(whitelist_name).await?;
        Ok(())
    }

    async fn drain_and_delete_proofs(&self, whitelist_name: &str) -> ServiceResult<()> {
        let rows = self.proofs.query_all(whitelist_name).await?;
        let addresses: Vec<String> = rows.into_iter().map(|r| r.whitelist_address).collect();
        if addresses.is_empty() {
            return Ok(());
        }
        self.proofs
            .batch_delete(whitelist_name, addresses, MAX_RETRIES)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;
    use crate::object_store::MemoryObjectStore;

    fn lifecycle() -> (TreeLifecycle, Arc<MemoryKvStore>) {
        let store = Arc::new(MemoryObjectStore::new());
        let kv = Arc::new(MemoryKvStore::new());
        let lifecycle = TreeLifecycle::new(
            "my-whitelist-bucket".to_string(),
            store,
            kv.clone(),
            kv.clone(),
        );
        (lifecycle, kv)
    }

    fn sample_csv() -> Vec<u8> {
        b"WhitelistAddress,WhitelistAmount\n\
0xd31Febd31f4A368bce3e0A38ba5E8031d31Fe803,6666.67\n\
0x9F2e35C1A9E2C6D8c6b0e3f1A2d4B5c6E7F8BA16,1250\n"
            .to_vec()
    }

    #[tokio::test]
    async fn create_tree_end_to_end_reaches_completed() {
        let (lifecycle, kv) = lifecycle();
        lifecycle
            .upload_whitelist("w0", sample_csv(), true)
            .await
            .unwrap();
        let root = lifecycle.create_tree("w0").await.unwrap();
        let row = RootsTable::get(&*kv, "w0").await.unwrap().unwrap();
        assert_eq!(row.status, WhitelistStatus::Completed);
        assert_eq!(row.merkle_root, root);
    }

    #[tokio::test]
    async fn create_tree_twice_second_call_conflicts() {
        let (lifecycle, _kv) = lifecycle();
        lifecycle
            .upload_whitelist("w0", sample_csv(), true)
            .await
            .unwrap();
        lifecycle.create_tree("w0").await.unwrap();
        let err = lifecycle.create_tree("w0").await.unwrap_err();
        assert!(matches!(err, ServiceError::ConditionalCheckFailed));
    }

    #[tokio::test]
    async fn bulk_insert_failure_leaves_root_failed_with_same_hash() {
        let (lifecycle, kv) = lifecycle();
        lifecycle
            .upload_whitelist("w0", sample_csv(), true)
            .await
            .unwrap();
        kv.fail_insert_chunk(0);
        let err = lifecycle.create_tree("w0").await.unwrap_err();
        assert!(matches!(err, ServiceError::InternalError(_)));

        let row = RootsTable::get(&*kv, "w0").await.unwrap().unwrap();
        assert_eq!(row.status, WhitelistStatus::Failed);
        let root_at_failure = row.merkle_root.clone();

        lifecycle.delete_tree("w0").await.unwrap();
        assert!(RootsTable::get(&*kv, "w0").await.unwrap().is_none());
        let _ = root_at_failure;
    }

    #[tokio::test]
    async fn delete_tree_round_trip_removes_root_and_proofs() {
        let (lifecycle, kv) = lifecycle();
        lifecycle
            .upload_whitelist("w0", sample_csv(), true)
            .await
            .unwrap();
        lifecycle.create_tree("w0").await.unwrap();
        lifecycle.delete_tree("w0").await.unwrap();
        assert!(RootsTable::get(&*kv, "w0").await.unwrap().is_none());
        use crate::kv::ProofsTable;
        assert!(kv.query_all("w0").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_whitelist_refuses_when_tree_exists() {
        let (lifecycle, _kv) = lifecycle();
        lifecycle
            .upload_whitelist("w0", sample_csv(), true)
            .await
            .unwrap();
        lifecycle.create_tree("w0").await.unwrap();
        let err = lifecycle.delete_whitelist("w0").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_tree_on_missing_whitelist_is_validation_error() {
        let (lifecycle, _kv) = lifecycle();
        let err = lifecycle.delete_tree("does-not-exist").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
