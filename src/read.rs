//! Read path: `getMerkleRoot`, `getMerkleProof`,
//! `getMerkleProofs`, `getMerkleRoots`, and `getMerkleTrees`.

use std::sync::Arc;

use crate::error::{ServiceError, ServiceResult};
use crate::kv::{Page, ProofRecord, ProofsTable, RootRecord, RootsTable, WhitelistStatus};
use crate::merkle::normalize_address;

/// A Merkle tree's projected view for `getMerkleTrees`:
/// the root row plus a `ready` flag derived from its status.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleTreeView {
    pub whitelist_name: String,
    pub merkle_root: String,
    pub status: WhitelistStatus,
    pub ready: bool,
}

impl From<RootRecord> for MerkleTreeView {
    fn from(row: RootRecord) -> Self {
        let ready = row.status == WhitelistStatus::Completed;
        Self {
            whitelist_name: row.whitelist_name,
            merkle_root: row.merkle_root,
            status: row.status,
            ready,
        }
    }
}

/// Serves the read-only query surface against the roots and proofs
/// tables. Holds only `Arc<dyn ...>` handles, same shape as
/// `TreeLifecycle`, so the two can share a single KV backend instance.
pub struct ReadPath {
    roots: Arc<dyn RootsTable>,
    proofs: Arc<dyn ProofsTable>,
}

impl ReadPath {
    pub fn new(roots: Arc<dyn RootsTable>, proofs: Arc<dyn ProofsTable>) -> Self {
        Self { roots, proofs }
    }

    /// `getMerkleRoot`: the current root hash for a whitelist,
    /// regardless of status.
    pub async fn get_merkle_root(&self, whitelist_name: &str) -> ServiceResult<RootRecord> {
        self.roots
            .get(whitelist_name)
            .await?
            .ok_or(ServiceError::ResourceNotFound)
    }

    /// `getMerkleProof`: checksum-normalizes the requested address
    /// before lookup,
    /// and refuses while the tree isn't COMPLETED.
    pub async fn get_merkle_proof(
        &self,
        whitelist_name: &str,
        whitelist_address: &str,
    ) -> ServiceResult<ProofRecord> {
        let root = self
            .roots
            .get(whitelist_name)
            .await?
            .ok_or_else(|| ServiceError::Validation(format!("whitelist \"{whitelist_name}\" not found")))?;

        if root.status != WhitelistStatus::Completed {
            return Err(ServiceError::Validation(format!(
                "whitelist \"{whitelist_name}\" is not ready (status: {})",
                root.status
            )));
        }

        let normalized = normalize_address(whitelist_address)?;
        self.proofs
            .get(whitelist_name, &normalized)
            .await?
            .ok_or(ServiceError::ResourceNotFound)
    }

    /// `getMerkleProofs`: every proof row for a whitelist, fully
    /// drained regardless of page size.
    pub async fn get_merkle_proofs(&self, whitelist_name: &str) -> ServiceResult<Vec<ProofRecord>> {
        Ok(self.proofs.query_all(whitelist_name).await?)
    }

    /// `getMerkleRoots`: paginated scan of every root row.
    pub async fn get_merkle_roots(
        &self,
        page_size: u32,
        starting_token: Option<&str>,
    ) -> ServiceResult<Page<RootRecord>> {
        Ok(self.roots.scan(page_size, starting_token).await?)
    }

    /// `getMerkleTrees`: like `getMerkleRoots` but projected into the
    /// API's `ready`-flagged view.
    pub async fn get_merkle_trees(
        &self,
        page_size: u32,
        starting_token: Option<&str>,
    ) -> ServiceResult<Page<MerkleTreeView>> {
        let page = self.roots.scan(page_size, starting_token).await?;
        Ok(Page {
            items: page.items.into_iter().map(MerkleTreeView::from).collect(),
            next_token: page.next_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{ExpectedStatus, MemoryKvStore};

    fn read_path() -> (ReadPath, Arc<MemoryKvStore>) {
        let kv = Arc::new(MemoryKvStore::new());
        (ReadPath::new(kv.clone(), kv.clone()), kv)
    }

    #[tokio::test]
    async fn get_merkle_root_returns_not_found_for_unknown_whitelist() {
        let (read, _kv) = read_path();
        let err = read.get_merkle_root("nope").await.unwrap_err();
        assert!(matches!(err, ServiceError::ResourceNotFound));
    }

    #[tokio::test]
    async fn get_merkle_proof_refuses_when_not_completed() {
        let (read, kv) = read_path();
        kv.insert_creating("w0", "0xroot").await.unwrap();
        let err = read
            .get_merkle_proof("w0", "0xd31Febd31f4A368bce3e0A38ba5E8031d31Fe803")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn get_merkle_proof_normalizes_case_before_lookup() {
        let (read, kv) = read_path();
        kv.insert_creating("w0", "0xroot").await.unwrap();
        kv.transition(
            "w0",
            "0xroot",
            ExpectedStatus::Exactly(WhitelistStatus::Creating),
            WhitelistStatus::Completed,
        )
        .await
        .unwrap();
        ProofsTable::batch_insert(
            &*kv,
            vec![ProofRecord {
                whitelist_name: "w0".to_string(),
                whitelist_address: "0xd31Febd31f4A368bce3e0A38ba5E8031d31Fe803".to_string(),
                whitelist_amount_wei: "1".to_string(),
                merkle_proof: String::new(),
            }],
            3,
        )
        .await
        .unwrap();

        let proof = read
            .get_merkle_proof("w0", "0xd31febd31f4a368bce3e0a38ba5e8031d31fe803")
            .await
            .unwrap();
        assert_eq!(proof.whitelist_amount_wei, "1");
    }

    #[tokio::test]
    async fn get_merkle_trees_projects_ready_flag() {
        let (read, kv) = read_path();
        kv.insert_creating("w0", "0xroot").await.unwrap();
        let page = read.get_merkle_trees(10, None).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(!page.items[0].ready);

        kv.transition(
            "w0",
            "0xroot",
            ExpectedStatus::Exactly(WhitelistStatus::Creating),
            WhitelistStatus::Completed,
        )
        .await
        .unwrap();
        let page = read.get_merkle_trees(10, None).await.unwrap();
        assert!(page.items[0].ready);
    }

    #[tokio::test]
    async fn get_merkle_roots_paginates_three_whitelists_with_page_size_two() {
        let (read, kv) = read_path();
        for name in ["a", "b", "c"] {
            kv.insert_creating(name, "0xroot").await.unwrap();
        }
        let first = read.get_merkle_roots(2, None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert!(first.next_token.is_some());
        let second = read
            .get_merkle_roots(2, first.next_token.as_deref())
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert!(second.next_token.is_none());
    }
}
