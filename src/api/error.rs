//! 错误到 HTTP 响应的映射
//!
//! 响应体统一为 `{"error": {"code": "...", "message": "..."}}`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::error::{AppError, BusinessError, LlmError, StorageError};

impl AppError {
    /// HTTP 状态码和错误代码
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Business(e) => match e {
                BusinessError::MissingUser => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
                BusinessError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                BusinessError::Unauthorized { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
                BusinessError::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
                BusinessError::InvalidTransition { .. } => {
                    (StatusCode::CONFLICT, "INVALID_TRANSITION")
                }
                BusinessError::StepNotAllowed { .. } => (StatusCode::CONFLICT, "STEP_NOT_ALLOWED"),
            },
            AppError::Llm(LlmError::MissingCredential) => {
                (StatusCode::SERVICE_UNAVAILABLE, "LLM_NOT_CONFIGURED")
            }
            AppError::Llm(_) => (StatusCode::BAD_GATEWAY, "LLM_ERROR"),
            AppError::Storage(StorageError::EmptyUpload | StorageError::UnsupportedType { .. }) => {
                (StatusCode::BAD_REQUEST, "BAD_UPLOAD")
            }
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::Config(_) | AppError::Other(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!("❌ 请求失败 [{}]: {}", code, self);
        } else {
            warn!("⚠️ 请求被拒绝 [{}]: {}", code, self);
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
