use std::sync::Arc;

use axum::extract::Extension;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::api::envelope::respond;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteWhitelistRequest {
    pub whitelist_name: String,
}

/// `DELETE /Whitelist`.
pub async fn delete_whitelist_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<DeleteWhitelistRequest>,
) -> Response {
    let result = state.lifecycle.delete_whitelist(&request.whitelist_name).await;
    respond(result.map(|()| serde_json::json!({ "whitelistName": request.whitelist_name })))
}
