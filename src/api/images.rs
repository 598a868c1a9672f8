//! 示意图上传接口

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::debug;

use crate::api::auth::CurrentUser;
use crate::api::AppState;
use crate::error::{AppError, AppResult, StorageError};

/// 上传大小上限
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// POST /images
///
/// multipart 表单中的 `image` 字段
pub async fn upload_image(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation("image", e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::validation("image", e.to_string()))?;
        debug!(
            "用户 {} 上传图片: {} ({} 字节)",
            user.id(),
            content_type,
            bytes.len()
        );

        let url = state.images.store(&content_type, bytes.to_vec()).await?;
        return Ok((StatusCode::CREATED, Json(UploadResponse { url })));
    }

    Err(StorageError::EmptyUpload.into())
}

pub fn image_routes() -> Router<AppState> {
    Router::new()
        .route("/images", post(upload_image))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
