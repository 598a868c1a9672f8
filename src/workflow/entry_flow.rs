//! 条目录入流程 - 流程层
//!
//! 流程顺序：
//! 1. 填写题目 → 完整校验、标记已提交、创建待审核的提交记录
//! 2. AI 审核 → 最近一次提交必须已完成
//! 3. 完善解答 → 流程结束，客户端回到条目列表
//!
//! 步骤不单独存储，而是由提交记录上的 `step` 推算。

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult, BusinessError};
use crate::models::{Submission, SubmissionStatus};
use crate::services::{EntryService, SubmissionService};
use crate::workflow::steps::{WorkflowState, WorkflowStep, WorkflowView};

/// 前进一步的结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceOutcome {
    pub workflow: WorkflowView,
    /// 本次创建或推进的提交记录
    pub submission: Option<Submission>,
}

/// 条目录入流程
#[derive(Clone)]
pub struct EntryFlow {
    entries: EntryService,
    submissions: SubmissionService,
}

impl EntryFlow {
    pub fn new(entries: EntryService, submissions: SubmissionService) -> Self {
        Self {
            entries,
            submissions,
        }
    }

    /// 由提交记录推算当前步骤
    pub async fn current_state(&self, user_id: &str, entry_id: Uuid) -> AppResult<WorkflowState> {
        let submissions = self
            .submissions
            .list_entry_submissions(user_id, entry_id)
            .await?;
        Ok(WorkflowState::resume(
            submissions.iter().filter_map(|s| s.step),
        ))
    }

    /// 完成当前步骤并前进
    pub async fn advance(&self, user_id: &str, entry_id: Uuid) -> AppResult<AdvanceOutcome> {
        let state = self.current_state(user_id, entry_id).await?;

        let submission = match state.current() {
            Some(WorkflowStep::Details) => {
                self.entries.submit_entry(user_id, entry_id).await?;
                let submission = self
                    .submissions
                    .create_stepped_submission(user_id, entry_id, WorkflowStep::Details.number())
                    .await?;
                Some(submission)
            }
            Some(step) => {
                let latest = self.latest_submission(user_id, entry_id).await?;
                if step == WorkflowStep::AiReview && latest.status != SubmissionStatus::Completed {
                    return Err(AppError::Business(BusinessError::InvalidTransition {
                        from: latest.status.as_str().to_string(),
                        to: WorkflowStep::Solution.label().to_string(),
                    }));
                }
                let updated = self
                    .submissions
                    .record_step(user_id, latest.submission_id, step.number())
                    .await?;
                Some(updated)
            }
            None => None,
        };

        let next = state.advance();
        match next.current() {
            Some(step) => info!("[条目 #{}] ➡️ 进入步骤 {}", entry_id, step),
            None => info!("[条目 #{}] 🎉 流程完成", entry_id),
        }

        Ok(AdvanceOutcome {
            workflow: next.view(),
            submission,
        })
    }

    /// 回到之前的步骤查看，不修改任何记录
    pub async fn jump(&self, user_id: &str, entry_id: Uuid, target: u8) -> AppResult<WorkflowState> {
        let step = WorkflowStep::from_number(target)
            .ok_or_else(|| AppError::validation("target", format!("不存在的步骤: {}", target)))?;
        let state = self.current_state(user_id, entry_id).await?;
        state.jump_to(step)
    }

    /// 步骤号最大的提交，步骤相同时取最新的一条
    async fn latest_submission(&self, user_id: &str, entry_id: Uuid) -> AppResult<Submission> {
        // 列表按创建时间倒序；max_by_key 在相等时返回最后一个，所以先反转
        self.submissions
            .list_entry_submissions(user_id, entry_id)
            .await?
            .into_iter()
            .rev()
            .filter(|s| s.step.is_some())
            .max_by_key(|s| s.step)
            .ok_or_else(|| AppError::not_found("Submission", entry_id.to_string()))
    }
}
