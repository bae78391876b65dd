use crate::utils::error::ProxyError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::OperationNotAllowed { .. } => StatusCode::FORBIDDEN,
            ProxyError::InvalidRequest { .. } | ProxyError::ValidationError { .. } => {
                StatusCode::BAD_REQUEST
            }
            ProxyError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// 上游錯誤原文回傳 `{"error": "..."}`
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(
                "❌ Request failed: {} (Category: {:?}, Severity: {:?})",
                self,
                self.category(),
                self.severity()
            );
        } else {
            tracing::warn!("⚠️ Request rejected: {}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
