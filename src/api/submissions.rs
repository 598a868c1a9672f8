//! 提交记录和 AI 审核接口

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::auth::CurrentUser;
use crate::api::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{Submission, SubmissionUpdate};
use crate::workflow::ReviewEvent;

/// 创建提交的请求体
///
/// 步骤号只能由 `/workflow/advance` 写入，请求里带 `step` 会被拒绝。
#[derive(Debug, Default, Deserialize)]
pub struct CreateSubmissionRequest {
    #[serde(default)]
    pub step: Option<u8>,
}

/// GET /entries/:entry_id/submissions
pub async fn list_submissions(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(entry_id): Path<Uuid>,
) -> AppResult<Json<Vec<Submission>>> {
    Ok(Json(
        state
            .submissions
            .list_entry_submissions(user.id(), entry_id)
            .await?,
    ))
}

/// POST /entries/:entry_id/submissions
pub async fn create_submission(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(entry_id): Path<Uuid>,
    request: Option<Json<CreateSubmissionRequest>>,
) -> AppResult<(StatusCode, Json<Submission>)> {
    if let Some(Json(CreateSubmissionRequest { step: Some(step) })) = request {
        return Err(AppError::validation(
            "step",
            format!("步骤 {} 只能通过流程推进写入", step),
        ));
    }

    let submission = state.submissions.create_submission(user.id(), entry_id).await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

/// GET /submissions/:submission_id
pub async fn get_submission(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(submission_id): Path<Uuid>,
) -> AppResult<Json<Submission>> {
    Ok(Json(
        state
            .submissions
            .get_submission(user.id(), submission_id)
            .await?,
    ))
}

/// PATCH /submissions/:submission_id
pub async fn update_submission(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(submission_id): Path<Uuid>,
    Json(update): Json<SubmissionUpdate>,
) -> AppResult<Json<Submission>> {
    Ok(Json(
        state
            .submissions
            .update_submission(user.id(), submission_id, update)
            .await?,
    ))
}

/// POST /submissions/:submission_id/review
///
/// 校验失败直接返回错误；校验通过后以 SSE 推送 `partial`，
/// 最后是 `completed` 或 `failed`。
pub async fn review_submission(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(submission_id): Path<Uuid>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let job = state.review.prepare(user.id(), submission_id).await?;
    let ctx = job.ctx().clone();

    let (tx, mut rx) = mpsc::channel::<ReviewEvent>(32);
    tokio::spawn(async move {
        // 结果已经写回提交记录并通过事件推送
        let _ = job.run(tx).await;
    });

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    debug!("{} SSE: {}", ctx, event.name());
                    yield Ok(Event::default().event(event.name()).data(json));
                }
                Err(e) => warn!("{} SSE: 事件序列化失败: {}", ctx, e),
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}

pub fn submission_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/entries/:entry_id/submissions",
            get(list_submissions).post(create_submission),
        )
        .route(
            "/submissions/:submission_id",
            get(get_submission).patch(update_submission),
        )
        .route("/submissions/:submission_id/review", post(review_submission))
}
