use std::sync::Arc;

use axum::extract::Extension;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::api::envelope::respond;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMerkleTreeRequest {
    pub whitelist_name: String,
}

/// `POST /CreateMerkleTree`.
pub async fn create_tree_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<CreateMerkleTreeRequest>,
) -> Response {
    let result = state.lifecycle.create_tree(&request.whitelist_name).await;
    respond(result.map(|root| {
        serde_json::json!({
            "whitelistName": request.whitelist_name,
            "merkleRoot": root,
        })
    }))
}
