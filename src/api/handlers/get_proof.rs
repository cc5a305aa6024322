use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::response::Response;
use serde::Deserialize;

use crate::api::envelope::respond;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMerkleProofQuery {
    pub whitelist_name: String,
    pub whitelist_address: String,
}

/// `GET /MerkleProof`, open to anonymous callers.
pub async fn get_proof_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<GetMerkleProofQuery>,
) -> Response {
    let result = state
        .read
        .get_merkle_proof(&query.whitelist_name, &query.whitelist_address)
        .await;
    respond(result)
}
