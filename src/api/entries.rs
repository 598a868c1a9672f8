//! 条目、自动保存和流程接口

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::auth::CurrentUser;
use crate::api::AppState;
use crate::error::AppResult;
use crate::models::{Entry, EntryDraft};
use crate::workflow::{AdvanceOutcome, AutosaveStatus, WorkflowView};

/// 条目详情：条目本身 + 当前流程步骤
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    pub entry: Entry,
    /// 四个选项都填写后才能选择正确答案
    pub can_select_correct_answer: bool,
    pub workflow: WorkflowView,
}

#[derive(Debug, Deserialize)]
pub struct JumpRequest {
    pub target: u8,
}

/// GET /entries
pub async fn list_entries(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Entry>>> {
    Ok(Json(state.entries.list_entries(user.id()).await?))
}

/// POST /entries
pub async fn create_entry(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<(StatusCode, Json<Entry>)> {
    let entry = state.entries.create_entry(user.id()).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /entries/:entry_id
pub async fn get_entry(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(entry_id): Path<Uuid>,
) -> AppResult<Json<EntryView>> {
    let entry = state.entries.get_entry(user.id(), entry_id).await?;
    let workflow = state.flow.current_state(user.id(), entry_id).await?;

    Ok(Json(EntryView {
        can_select_correct_answer: entry.can_select_correct_answer(),
        entry,
        workflow: workflow.view(),
    }))
}

/// PUT /entries/:entry_id
pub async fn save_entry(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(entry_id): Path<Uuid>,
    Json(draft): Json<EntryDraft>,
) -> AppResult<Json<Entry>> {
    Ok(Json(
        state.entries.save_entry(user.id(), entry_id, draft).await?,
    ))
}

/// DELETE /entries/:entry_id
pub async fn delete_entry(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(entry_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.entries.delete_entry(user.id(), entry_id).await?;
    state.autosave.remove(user.id(), entry_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /entries/:entry_id/autosave
///
/// 立即返回；静默期过后才真正保存。
pub async fn push_autosave(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(entry_id): Path<Uuid>,
    Json(draft): Json<EntryDraft>,
) -> AppResult<(StatusCode, Json<AutosaveStatus>)> {
    state.entries.ensure_owner(user.id(), entry_id).await?;
    draft.validate_draft()?;

    let status = state.autosave.edit(user.id(), entry_id, draft)?;
    Ok((StatusCode::ACCEPTED, Json(status)))
}

/// GET /entries/:entry_id/autosave
pub async fn autosave_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(entry_id): Path<Uuid>,
) -> AppResult<Json<AutosaveStatus>> {
    state.entries.ensure_owner(user.id(), entry_id).await?;
    Ok(Json(state.autosave.status(user.id(), entry_id)?))
}

/// POST /entries/:entry_id/workflow/advance
pub async fn advance_workflow(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(entry_id): Path<Uuid>,
) -> AppResult<Json<AdvanceOutcome>> {
    Ok(Json(state.flow.advance(user.id(), entry_id).await?))
}

/// POST /entries/:entry_id/workflow/jump
pub async fn jump_workflow(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(entry_id): Path<Uuid>,
    Json(request): Json<JumpRequest>,
) -> AppResult<Json<WorkflowView>> {
    let state = state.flow.jump(user.id(), entry_id, request.target).await?;
    Ok(Json(state.view()))
}

pub fn entry_routes() -> Router<AppState> {
    Router::new()
        .route("/entries", get(list_entries).post(create_entry))
        .route(
            "/entries/:entry_id",
            get(get_entry).put(save_entry).delete(delete_entry),
        )
        .route(
            "/entries/:entry_id/autosave",
            get(autosave_status).post(push_autosave),
        )
        .route("/entries/:entry_id/workflow/advance", post(advance_workflow))
        .route("/entries/:entry_id/workflow/jump", post(jump_workflow))
}
