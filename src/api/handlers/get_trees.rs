use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::response::Response;
use serde::Deserialize;

use crate::api::envelope::respond;
use crate::error::ServiceError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMerkleTreesQuery {
    pub page_size: u32,
    pub starting_token: Option<String>,
}

/// `GET /MerkleTrees`, open to anonymous callers —
/// the one read endpoint safe for that, since each row is projected
/// down to name/root/ready.
pub async fn get_trees_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<GetMerkleTreesQuery>,
) -> Response {
    let result = async {
        if !(1..=1000).contains(&query.page_size) {
            return Err(ServiceError::Validation(
                "pageSize must be between 1 and 1000".to_string(),
            ));
        }
        state
            .read
            .get_merkle_trees(query.page_size, query.starting_token.as_deref())
            .await
    }
    .await;

    respond(result)
}
