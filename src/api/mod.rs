//! HTTP 接口层
//!
//! 只负责把请求翻译成服务 / 流程调用，不包含业务规则

pub mod ai_models;
pub mod auth;
pub mod entries;
pub mod error;
pub mod health;
pub mod images;
pub mod submissions;

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::services::{EntryService, ImageStore, ReviewModel, SubmissionService};
use crate::workflow::{AutosaveRegistry, DraftSink, EntryFlow, ReviewFlow};

pub use auth::{CurrentUser, USER_HEADER};

/// 所有接口共享的状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub entries: EntryService,
    pub submissions: SubmissionService,
    pub flow: EntryFlow,
    pub review: Arc<ReviewFlow>,
    pub autosave: Arc<AutosaveRegistry>,
    pub images: Arc<dyn ImageStore>,
    pub model: Arc<dyn ReviewModel>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: Config,
        pool: SqlitePool,
        model: Arc<dyn ReviewModel>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        let entries = EntryService::new(pool.clone());
        let submissions = SubmissionService::new(pool);

        let sink: Arc<dyn DraftSink> = Arc::new(entries.clone());
        let autosave = AutosaveRegistry::new(sink, config.autosave_debounce(), config.autosave_idle());

        Self {
            flow: EntryFlow::new(entries.clone(), submissions.clone()),
            review: Arc::new(ReviewFlow::new(
                entries.clone(),
                submissions.clone(),
                model.clone(),
            )),
            autosave: Arc::new(autosave),
            config: Arc::new(config),
            entries,
            submissions,
            images,
            model,
            startup_time: Utc::now(),
        }
    }
}

/// 组装全部路由
pub fn build_router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .merge(health::health_routes())
        .merge(entries::entry_routes())
        .merge(submissions::submission_routes())
        .merge(images::image_routes())
        .merge(ai_models::model_routes())
        .nest_service("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
