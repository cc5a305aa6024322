use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use crate::error::ServiceError;

/// Response envelope shared by every route: `success` plus
/// either `data` or an `errorCode`/`errorMessage` pair.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(rename = "errorCode", skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error_code: None,
            error_message: None,
        }
    }
}

/// Wraps a handler's `Result<T, ServiceError>` into the envelope,
/// choosing the HTTP status from `ServiceError::http_status`.
pub fn respond<T: Serialize>(result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(Envelope::ok(data))).into_response(),
        Err(err) => {
            let status =
                StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::OK);
            let envelope: Envelope<()> = Envelope {
                success: false,
                data: None,
                error_code: Some(err.code()),
                error_message: Some(err.to_string()),
            };
            (status, Json(envelope)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_carries_data_and_no_error_fields() {
        let envelope = Envelope::ok("hello");
        assert!(envelope.success);
        assert!(matches!(envelope.data, Some("hello")));
        assert!(envelope.error_code.is_none());
    }
}
