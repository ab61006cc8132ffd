//! HTTP mapping for `ChurnError`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use churnserve_core::error::{ChurnError, ClientCode};

/// Handler error; wraps the shared error so it can become a response.
#[derive(Debug)]
pub struct ApiError(pub ChurnError);

impl From<ChurnError> for ApiError {
    fn from(e: ChurnError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if self.0.client_code().is_client_error() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.client_code();
        // Server-side detail stays in the logs.
        let message = match code {
            ClientCode::ValidationFailed => self.0.to_string(),
            ClientCode::StorageUnavailable => "prediction could not be stored".to_string(),
            ClientCode::Internal => "internal error".to_string(),
        };
        let body = Json(json!({
            "error": {
                "code": code.as_str(),
                "message": message,
            }
        }));
        (self.status(), body).into_response()
    }
}
