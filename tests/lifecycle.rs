//! End-to-end scenarios spanning the object store, KV adapter,
//! lifecycle orchestrator, and read path together.

use std::sync::Arc;

use merkle_whitelist_service::kv::{ExpectedStatus, MemoryKvStore, ProofsTable, RootsTable, WhitelistStatus};
use merkle_whitelist_service::object_store::MemoryObjectStore;
use merkle_whitelist_service::{ReadPath, ServiceError, TreeLifecycle};

fn harness() -> (TreeLifecycle, ReadPath, Arc<MemoryKvStore>) {
    let store = Arc::new(MemoryObjectStore::new());
    let kv = Arc::new(MemoryKvStore::new());
    let lifecycle = TreeLifecycle::new("my-whitelist-bucket".to_string(), store, kv.clone(), kv.clone());
    let read = ReadPath::new(kv.clone(), kv.clone());
    (lifecycle, read, kv)
}

fn csv(rows: &[&str]) -> Vec<u8> {
    let mut content = String::from("WhitelistAddress,WhitelistAmount\n");
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    content.into_bytes()
}

#[tokio::test]
async fn concurrent_create_tree_exactly_one_winner() {
    let (lifecycle, _read, _kv) = harness();
    lifecycle
        .upload_whitelist(
            "w0",
            csv(&["0xd31Febd31f4A368bce3e0A38ba5E8031d31Fe803,6666.67"]),
            true,
        )
        .await
        .unwrap();

    let lifecycle = Arc::new(lifecycle);
    let a = lifecycle.clone();
    let b = lifecycle.clone();
    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { a.create_tree("w0").await }),
        tokio::spawn(async move { b.create_tree("w0").await }),
    );

    let results = [ra.unwrap(), rb.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let conditional_failures = results
        .iter()
        .filter(|r| matches!(r, Err(ServiceError::ConditionalCheckFailed)))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(conditional_failures, 1);
}

#[tokio::test]
async fn bulk_proof_insert_failure_leaves_root_failed_then_delete_tree_cleans_up() {
    let (lifecycle, _read, kv) = harness();
    lifecycle
        .upload_whitelist(
            "w0",
            csv(&[
                "0xd31Febd31f4A368bce3e0A38ba5E8031d31Fe803,6666.67",
                "0x9F2e35C1A9E2C6D8c6b0e3f1A2d4B5c6E7F8BA16,1250",
            ]),
            true,
        )
        .await
        .unwrap();

    kv.fail_insert_chunk(0);
    let err = lifecycle.create_tree("w0").await.unwrap_err();
    assert!(matches!(err, ServiceError::InternalError(_)));

    let row = RootsTable::get(&*kv, "w0").await.unwrap().unwrap();
    assert_eq!(row.status, WhitelistStatus::Failed);
    let root_before_cleanup = row.merkle_root;

    lifecycle.delete_tree("w0").await.unwrap();
    assert!(RootsTable::get(&*kv, "w0").await.unwrap().is_none());
    assert!(ProofsTable::query_all(&*kv, "w0").await.unwrap().is_empty());
    assert!(!root_before_cleanup.is_empty());
}

#[tokio::test]
async fn get_merkle_proof_on_creating_tree_is_not_ready() {
    let (_lifecycle, read, kv) = harness();
    kv.insert_creating("w0", "0xroot").await.unwrap();

    let err = read
        .get_merkle_proof("w0", "0xd31Febd31f4A368bce3e0A38ba5E8031d31Fe803")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn delete_whitelist_refuses_while_root_row_exists_in_any_status() {
    let (lifecycle, _read, kv) = harness();
    lifecycle
        .upload_whitelist("w0", csv(&["0xd31Febd31f4A368bce3e0A38ba5E8031d31Fe803,1"]), true)
        .await
        .unwrap();
    kv.insert_creating("w0", "0xroot").await.unwrap();

    let err = lifecycle.delete_whitelist("w0").await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    kv.transition(
        "w0",
        "0xroot",
        ExpectedStatus::Exactly(WhitelistStatus::Creating),
        WhitelistStatus::Failed,
    )
    .await
    .unwrap();
    let err = lifecycle.delete_whitelist("w0").await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn get_merkle_roots_paginates_three_whitelists_page_size_two() {
    let (_lifecycle, read, kv) = harness();
    for name in ["whitelist-a", "whitelist-b", "whitelist-c"] {
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
