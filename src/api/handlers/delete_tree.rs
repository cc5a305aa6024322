use std::sync::Arc;

use axum::extract::Extension;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::api::envelope::respond;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMerkleTreeRequest {
    pub whitelist_name: String,
}

/// `DELETE /MerkleTree`.
pub async fn delete_tree_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<DeleteMerkleTreeRequest>,
) -> Response {
    let result = state.lifecycle.delete_tree(&request.whitelist_name).await;
    respond(result.map(|()| serde_json::json!({ "whitelistName": request.whitelist_name })))
}
