//! One handler per route, each a thin translation between
//! axum extractors and the lifecycle orchestrator / read path, with
//! the envelope doing all error serialization.

mod create_tree;
mod delete_tree;
mod delete_whitelist;
mod get_proof;
mod get_proofs;
mod get_root;
mod get_roots;
mod get_trees;
mod upload_whitelist;

pub use create_tree::create_tree_handler;
pub use delete_tree::delete_tree_handler;
pub use delete_whitelist::delete_whitelist_handler;
pub use get_proof::get_proof_handler;
pub use get_proofs::get_proofs_handler;
pub use get_root::get_root_handler;
pub use get_roots::get_roots_handler;
pub use get_trees::get_trees_handler;
pub use upload_whitelist::upload_whitelist_handler;

use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// Liveness probe, unauthenticated.
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
