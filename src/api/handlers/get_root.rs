use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::response::Response;
use serde::Deserialize;

use crate::api::envelope::respond;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMerkleRootQuery {
    pub whitelist_name: String,
}

/// `GET /MerkleRoot`.
pub async fn get_root_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<GetMerkleRootQuery>,
) -> Response {
    let result = state.read.get_merkle_root(&query.whitelist_name).await;
    respond(result)
}
