//! 可用模型列表

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::AppState;
use crate::error::AppResult;

#[derive(Debug, Serialize)]
pub struct ModelList {
    /// 当前配置使用的模型
    pub current: String,
    pub models: Vec<String>,
}

/// GET /models
pub async fn list_models(State(state): State<AppState>) -> AppResult<Json<ModelList>> {
    let models = state.model.list_models().await?;
    Ok(Json(ModelList {
        current: state.model.name().to_string(),
        models,
    }))
}

pub fn model_routes() -> Router<AppState> {
    Router::new().route("/models", get(list_models))
}
