use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::response::Response;
use serde::Deserialize;

use crate::api::envelope::respond;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMerkleProofsQuery {
    pub whitelist_name: String,
}

/// `GET /MerkleProofs`.
pub async fn get_proofs_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<GetMerkleProofsQuery>,
) -> Response {
    let result = state.read.get_merkle_proofs(&query.whitelist_name).await;
    respond(result)
}
