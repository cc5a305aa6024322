use std::sync::Arc;

use axum::middleware::from_fn;
use axum::routing::{delete, get, post};
use axum::{Extension, Router};

use crate::api::handlers::{
    create_tree_handler, delete_tree_handler, delete_whitelist_handler, get_proof_handler,
    get_proofs_handler, get_root_handler, get_roots_handler, get_trees_handler, health_handler,
    upload_whitelist_handler,
};
use crate::api::middleware::{group_gate, RequiredGroups};
use crate::server::AppState;

/// Wraps a single-route `Router` with its `RequiredGroups` gate, the
/// same `Extension` + `from_fn` layering applied to a whole sub-router,
/// scoped here to one route at a time since each route has its own
/// authorized-groups list.
fn gated(router: Router, groups: Vec<String>) -> Router {
    router
        .layer(from_fn(group_gate))
        .layer(Extension(RequiredGroups(groups)))
}

/// Builds the full route table. Layers apply
/// innermost-first, so the per-route group gate runs before the
/// shared `AppState` extension is even needed by it.
pub fn create_router(state: Arc<AppState>) -> Router {
    let groups = state.config.authorized_groups.clone();

    let upload_whitelist = gated(
        Router::new().route("/UploadWhitelist", post(upload_whitelist_handler)),
        groups.upload_whitelist,
    );
    let delete_whitelist = gated(
        Router::new().route("/Whitelist", delete(delete_whitelist_handler)),
        groups.delete_whitelist,
    );
    let create_tree = gated(
        Router::new().route("/CreateMerkleTree", post(create_tree_handler)),
        groups.create_tree,
    );
    let delete_tree = gated(
        Router::new().route("/MerkleTree", delete(delete_tree_handler)),
        groups.delete_tree,
    );
    let get_root = gated(
        Router::new().route("/MerkleRoot", get(get_root_handler)),
        groups.read_root,
    );
    let get_roots = gated(
        Router::new().route("/MerkleRoots", get(get_roots_handler)),
        groups.read_roots,
    );
    let get_proofs = gated(
        Router::new().route("/MerkleProofs", get(get_proofs_handler)),
        groups.read_proof,
    );

    // Open routes, safe for anonymous callers.
    let open_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/MerkleTrees", get(get_trees_handler))
        .route("/MerkleProof", get(get_proof_handler));

    open_routes
        .merge(upload_whitelist)
        .merge(delete_whitelist)
        .merge(create_tree)
        .merge(delete_tree)
        .merge(get_root)
        .merge(get_roots)
        .merge(get_proofs)
        .layer(Extension(state))
}
