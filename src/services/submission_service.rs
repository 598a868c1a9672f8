//! 提交记录服务 - 业务能力层
//!
//! 负责 AI 审核记录的创建和状态流转；权限以父条目的所有者为准

use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{entries, submissions};
use crate::error::{AppError, AppResult};
use crate::models::{Submission, SubmissionUpdate};
use crate::services::ensure_same_user;

/// 提交记录服务
#[derive(Clone)]
pub struct SubmissionService {
    pool: SqlitePool,
}

impl SubmissionService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 为条目创建一条待处理的提交记录（不带步骤号，不影响流程进度）
    pub async fn create_submission(&self, user_id: &str, entry_id: Uuid) -> AppResult<Submission> {
        self.insert(user_id, entry_id, None).await
    }

    /// 创建带步骤号的提交记录，只由条目流程调用
    pub(crate) async fn create_stepped_submission(
        &self,
        user_id: &str,
        entry_id: Uuid,
        step: u8,
    ) -> AppResult<Submission> {
        self.insert(user_id, entry_id, Some(step)).await
    }

    async fn insert(&self, user_id: &str, entry_id: Uuid, step: Option<u8>) -> AppResult<Submission> {
        let owner = entries::load_entry_owner(&self.pool, entry_id)
            .await?
            .ok_or_else(|| AppError::not_found("Entry", entry_id.to_string()))?;
        ensure_same_user(&owner, user_id, "提交")?;

        let submission = Submission::new_pending(entry_id, user_id, step);
        submissions::insert_submission(&self.pool, &submission).await?;
        info!(
            "📨 新建提交 #{} (条目 #{})",
            submission.submission_id, entry_id
        );
        Ok(submission)
    }

    pub async fn get_submission(&self, user_id: &str, submission_id: Uuid) -> AppResult<Submission> {
        self.ensure_owner(user_id, submission_id, "查看").await?;
        self.load(submission_id).await
    }

    /// 列出条目下的提交记录，新的在前
    pub async fn list_entry_submissions(
        &self,
        user_id: &str,
        entry_id: Uuid,
    ) -> AppResult<Vec<Submission>> {
        let owner = entries::load_entry_owner(&self.pool, entry_id)
            .await?
            .ok_or_else(|| AppError::not_found("Entry", entry_id.to_string()))?;
        ensure_same_user(&owner, user_id, "查看")?;

        submissions::list_submissions_by_entry(&self.pool, entry_id).await
    }

    /// 更新状态和 AI 回答
    ///
    /// 先校验父条目的所有者，再校验状态流转；任一失败都不会修改记录。
    pub async fn update_submission(
        &self,
        user_id: &str,
        submission_id: Uuid,
        update: SubmissionUpdate,
    ) -> AppResult<Submission> {
        self.ensure_owner(user_id, submission_id, "更新").await?;

        let current = self.load(submission_id).await?;
        current.status.ensure_transition(update.status)?;

        submissions::update_submission(&self.pool, submission_id, &update).await?;
        debug!(
            "提交 #{} 状态: {} -> {}",
            submission_id, current.status, update.status
        );
        self.load(submission_id).await
    }

    /// 记录提交到达的流程步骤
    pub async fn record_step(
        &self,
        user_id: &str,
        submission_id: Uuid,
        step: u8,
    ) -> AppResult<Submission> {
        self.ensure_owner(user_id, submission_id, "更新").await?;
        submissions::update_submission_step(&self.pool, submission_id, step).await?;
        self.load(submission_id).await
    }

    async fn ensure_owner(
        &self,
        user_id: &str,
        submission_id: Uuid,
        action: &'static str,
    ) -> AppResult<()> {
        let owner = submissions::load_submission_owner(&self.pool, submission_id)
            .await?
            .ok_or_else(|| AppError::not_found("Submission", submission_id.to_string()))?;
        ensure_same_user(&owner.entry_owner, user_id, action)
    }

    async fn load(&self, submission_id: Uuid) -> AppResult<Submission> {
        submissions::load_submission(&self.pool, submission_id)
            .await?
            .ok_or_else(|| AppError::not_found("Submission", submission_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::error::BusinessError;
    use crate::models::SubmissionStatus;
    use crate::services::EntryService;

    async fn setup() -> (EntryService, SubmissionService, Uuid) {
        let pool = memory_pool().await;
        let entries = EntryService::new(pool.clone());
        let entry = entries.create_entry("alice").await.unwrap();
        (entries, SubmissionService::new(pool), entry.entry_id)
    }

    #[tokio::test]
    async fn test_foreign_update_is_rejected_without_mutation() {
        let (_, service, entry_id) = setup().await;
        let submission = service
            .create_stepped_submission("alice", entry_id, 1)
            .await
            .unwrap();

        let err = service
            .update_submission(
                "mallory",
                submission.submission_id,
                SubmissionUpdate::status(SubmissionStatus::Processing),
            )
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());

        let after = service
            .get_submission("alice", submission.submission_id)
            .await
            .unwrap();
        assert_eq!(after, submission);
    }

    #[tokio::test]
    async fn test_status_flow() {
        let (_, service, entry_id) = setup().await;
        let submission = service
            .create_stepped_submission("alice", entry_id, 1)
            .await
            .unwrap();
        let id = submission.submission_id;

        let err = service
            .update_submission("alice", id, SubmissionUpdate::status(SubmissionStatus::Completed))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Business(BusinessError::InvalidTransition { .. })
        ));

        service
            .update_submission("alice", id, SubmissionUpdate::status(SubmissionStatus::Processing))
            .await
            .unwrap();
        let done = service
            .update_submission(
                "alice",
                id,
                SubmissionUpdate {
                    status: SubmissionStatus::Completed,
                    ai_answer_mc: Some("B".to_string()),
                    ai_answer_long: Some("Four.".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(done.status, SubmissionStatus::Completed);
        assert_eq!(done.ai_answer_mc.as_deref(), Some("B"));

        let stepped = service.record_step("alice", id, 2).await.unwrap();
        assert_eq!(stepped.step, Some(2));
    }

    #[tokio::test]
    async fn test_create_and_list_require_ownership() {
        let (_, service, entry_id) = setup().await;

        assert!(service
            .create_submission("mallory", entry_id)
            .await
            .unwrap_err()
            .is_unauthorized());
        assert!(service
            .list_entry_submissions("mallory", entry_id)
            .await
            .unwrap_err()
            .is_unauthorized());
        assert!(service
            .create_submission("alice", Uuid::new_v4())
            .await
            .unwrap_err()
            .is_not_found());

        service.create_submission("alice", entry_id).await.unwrap();
        let listed = service.list_entry_submissions("alice", entry_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].step, None);
    }
}
