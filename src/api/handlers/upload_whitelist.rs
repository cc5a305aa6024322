use std::sync::Arc;

use axum::extract::Extension;
use axum::response::Response;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::api::envelope::respond;
use crate::error::ServiceError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadWhitelistRequest {
    pub whitelist_name: String,
    pub whitelist_base64_content: String,
    #[serde(default)]
    pub allow_overwrite: bool,
}

/// `POST /UploadWhitelist`.
pub async fn upload_whitelist_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<UploadWhitelistRequest>,
) -> Response {
    let result = async {
        let bytes = STANDARD
            .decode(&request.whitelist_base64_content)
            .map_err(|e| ServiceError::Validation(format!("invalid base64 content: {e}")))?;
        state
            .lifecycle
            .upload_whitelist(&request.whitelist_name, bytes, request.allow_overwrite)
            .await
    }
    .await;

    respond(result.map(|()| serde_json::json!({ "whitelistName": request.whitelist_name })))
}
