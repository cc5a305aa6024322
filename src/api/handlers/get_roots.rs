use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::response::Response;
use serde::Deserialize;

use crate::api::envelope::respond;
use crate::error::ServiceError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMerkleRootsQuery {
    pub page_size: u32,
    pub starting_token: Option<String>,
}

/// `GET /MerkleRoots`. `pageSize` must be in `[1, 1000]`.
pub async fn get_roots_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<GetMerkleRootsQuery>,
) -> Response {
    let result = async {
        if !(1..=1000).contains(&query.page_size) {
            return Err(ServiceError::Validation(
                "pageSize must be between 1 and 1000".to_string(),
            ));
        }
        state
            .read
            .get_merkle_roots(query.page_size, query.starting_token.as_deref())
            .await
    }
    .await;

    respond(result)
}
