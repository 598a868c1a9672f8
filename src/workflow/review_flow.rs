//! AI 审核流程 - 流程层
//!
//! 核心职责：定义"一次提交"的审核流程
//!
//! 流程顺序：
//! 1. 校验提交记录属于当前用户 → 标记为 processing
//! 2. 流式调用模型 → 每个部分结果合并后推送给客户端
//! 3. 成功：写回 AI 答案并标记 completed；失败：标记 failed

use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult, LlmError};
use crate::models::{AiAnswer, Submission, SubmissionStatus, SubmissionUpdate};
use crate::services::{EntryService, ReviewModel, ReviewRequest, SubmissionService};
use crate::stream::reduce;
use crate::utils::logging::truncate_text;
use crate::workflow::review_ctx::ReviewCtx;

/// 推送给客户端的审核事件
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReviewEvent {
    /// 目前为止累积的结果
    Partial { answer: AiAnswer },
    /// 审核完成，附带更新后的提交记录
    Completed {
        submission: Submission,
        answer: AiAnswer,
    },
    Failed { message: String },
}

impl ReviewEvent {
    /// SSE 事件名
    pub fn name(&self) -> &'static str {
        match self {
            ReviewEvent::Partial { .. } => "partial",
            ReviewEvent::Completed { .. } => "completed",
            ReviewEvent::Failed { .. } => "failed",
        }
    }
}

/// AI 审核流程
///
/// - 编排"校验 → 流式调用 → 写回"的顺序
/// - 不持有任何连接，只依赖业务能力（services）
/// - 每次调用互不影响：没有并发上限、没有取消、不自动重试
pub struct ReviewFlow {
    entries: EntryService,
    submissions: SubmissionService,
    model: Arc<dyn ReviewModel>,
}

impl ReviewFlow {
    pub fn new(
        entries: EntryService,
        submissions: SubmissionService,
        model: Arc<dyn ReviewModel>,
    ) -> Self {
        Self {
            entries,
            submissions,
            model,
        }
    }

    /// 校验并把提交记录标记为处理中
    ///
    /// 这一步失败时直接返回错误，不会开始流式调用。
    pub async fn prepare(&self, user_id: &str, submission_id: Uuid) -> AppResult<ReviewJob> {
        let submission = self.submissions.get_submission(user_id, submission_id).await?;
        let entry = self.entries.get_entry(user_id, submission.entry_id).await?;
        let ctx = ReviewCtx::new(user_id, entry.entry_id, submission_id);

        self.submissions
            .update_submission(
                user_id,
                submission_id,
                SubmissionUpdate::status(SubmissionStatus::Processing),
            )
            .await?;
        info!("{} 题干: {}", ctx, truncate_text(&entry.question, 80));

        Ok(ReviewJob {
            ctx,
            request: ReviewRequest::from_entry(&entry),
            submissions: self.submissions.clone(),
            model: self.model.clone(),
        })
    }
}

/// 一次已经准备好的审核
pub struct ReviewJob {
    ctx: ReviewCtx,
    request: ReviewRequest,
    submissions: SubmissionService,
    model: Arc<dyn ReviewModel>,
}

impl ReviewJob {
    pub fn ctx(&self) -> &ReviewCtx {
        &self.ctx
    }

    /// 执行审核，事件发送到 `events`
    ///
    /// 客户端断开后事件发送失败会被忽略，审核照常完成并写回。
    pub async fn run(self, events: mpsc::Sender<ReviewEvent>) -> AppResult<AiAnswer> {
        info!("{} 🤖 开始 AI 审核 (模型: {})", self.ctx, self.model.name());

        match self.review(&events).await {
            Ok((submission, answer)) => {
                info!(
                    "{} ✓ AI 审核完成，答案: {}",
                    self.ctx, answer.ai_answer_multiple_choice
                );
                let _ = events
                    .send(ReviewEvent::Completed {
                        submission,
                        answer: answer.clone(),
                    })
                    .await;
                Ok(answer)
            }
            Err(e) => {
                error!("{} ❌ AI 审核失败: {}", self.ctx, e);
                self.mark_failed().await;
                let _ = events
                    .send(ReviewEvent::Failed {
                        message: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    }

    /// 流式获取答案并写回，任一步失败都走同一个失败分支
    async fn review(&self, events: &mpsc::Sender<ReviewEvent>) -> AppResult<(Submission, AiAnswer)> {
        let answer = self.stream_answer(events).await?;
        let submission = self.complete(&answer).await?;
        Ok((submission, answer))
    }

    async fn stream_answer(&self, events: &mpsc::Sender<ReviewEvent>) -> AppResult<AiAnswer> {
        let mut partials = self.model.stream_review(self.request.clone()).await?;

        let mut answer = AiAnswer::default();
        while let Some(partial) = partials.next().await {
            answer = reduce(answer, &partial?);
            let _ = events
                .send(ReviewEvent::Partial {
                    answer: answer.clone(),
                })
                .await;
        }

        if answer.ai_answer_multiple_choice.trim().is_empty() {
            return Err(AppError::Llm(LlmError::MalformedOutput {
                model: self.model.name().to_string(),
                response: "缺少 aiAnswerMultipleChoice".to_string(),
            }));
        }
        Ok(answer)
    }

    async fn complete(&self, answer: &AiAnswer) -> AppResult<Submission> {
        let letter = match answer.letter() {
            Some(letter) => letter.as_str().to_string(),
            None => {
                warn!(
                    "{} ⚠️ AI 答案不是有效的选项字母: '{}'",
                    self.ctx, answer.ai_answer_multiple_choice
                );
                answer.ai_answer_multiple_choice.trim().to_string()
            }
        };

        self.submissions
            .update_submission(
                &self.ctx.user_id,
                self.ctx.submission_id,
                SubmissionUpdate {
                    status: SubmissionStatus::Completed,
                    ai_answer_mc: Some(letter),
                    ai_answer_long: Some(answer.explanation.clone()),
                },
            )
            .await
    }

    async fn mark_failed(&self) {
        if let Err(e) = self
            .submissions
            .update_submission(
                &self.ctx.user_id,
                self.ctx.submission_id,
                SubmissionUpdate::status(SubmissionStatus::Failed),
            )
            .await
        {
            warn!("{} ⚠️ 无法标记提交为失败: {}", self.ctx, e);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::models::{AnswerChoices, ChoiceLetter, EntryDraft, PartialAiAnswer, Subject};
    use crate::services::PartialStream;
    use futures::future::BoxFuture;

    /// 按顺序吐出预设部分结果的假模型
    pub(crate) struct ScriptedModel {
        pub partials: Vec<PartialAiAnswer>,
        /// 吐完部分结果后以错误结束
        pub fail: bool,
    }

    impl ReviewModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        fn stream_review(&self, _request: ReviewRequest) -> BoxFuture<'_, AppResult<PartialStream>> {
            let mut items: Vec<AppResult<PartialAiAnswer>> =
                self.partials.iter().cloned().map(Ok).collect();
            if self.fail {
                items.push(Err(AppError::Llm(LlmError::StreamFailed {
                    model: "scripted".to_string(),
                    message: "connection reset".to_string(),
                })));
            }
            Box::pin(async move { Ok(Box::pin(futures::stream::iter(items)) as PartialStream) })
        }

        fn list_models(&self) -> BoxFuture<'_, AppResult<Vec<String>>> {
            Box::pin(async { Ok(vec!["scripted".to_string()]) })
        }
    }

    pub(crate) fn scripted_partials() -> Vec<PartialAiAnswer> {
        vec![
            PartialAiAnswer {
                ai_answer_multiple_choice: Some("B".to_string()),
                ..PartialAiAnswer::default()
            },
            PartialAiAnswer {
                explanation: Some("Two plus two".to_string()),
                ..PartialAiAnswer::default()
            },
            PartialAiAnswer {
                ai_answer_multiple_choice: Some("B".to_string()),
                explanation: Some("Two plus two is four.".to_string()),
                solution: None,
                key_points: Some(vec!["addition".to_string()]),
            },
        ]
    }

    async fn setup(model: ScriptedModel) -> (ReviewFlow, SubmissionService, Uuid) {
        let pool = memory_pool().await;
        let entries = EntryService::new(pool.clone());
        let submissions = SubmissionService::new(pool);

        let entry = entries.create_entry("alice").await.unwrap();
        let draft = EntryDraft {
            subject: Some(Subject::Math),
            question: "2 + 2 = ?".to_string(),
            image: None,
            answer_choices: AnswerChoices::new([
                "3".to_string(),
                "4".to_string(),
                "5".to_string(),
                "6".to_string(),
            ]),
            answer_multiple_choice: Some(ChoiceLetter::B),
            answer_long: "Four.".to_string(),
            hint: "Count.".to_string(),
        };
        entries.save_entry("alice", entry.entry_id, draft).await.unwrap();
        let submission = submissions
            .create_submission("alice", entry.entry_id)
            .await
            .unwrap();

        let flow = ReviewFlow::new(entries, submissions.clone(), Arc::new(model));
        (flow, submissions, submission.submission_id)
    }

    async fn drain(mut rx: mpsc::Receiver<ReviewEvent>) -> Vec<ReviewEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_review_completes_submission() {
        let (flow, submissions, submission_id) = setup(ScriptedModel {
            partials: scripted_partials(),
            fail: false,
        })
        .await;

        let job = flow.prepare("alice", submission_id).await.unwrap();
        let (tx, rx) = mpsc::channel(16);
        let answer = job.run(tx).await.unwrap();
        assert_eq!(answer.explanation, "Two plus two is four.");

        let events = drain(rx).await;
        let names: Vec<_> = events.iter().map(ReviewEvent::name).collect();
        assert_eq!(names, vec!["partial", "partial", "partial", "completed"]);

        let stored = submissions.get_submission("alice", submission_id).await.unwrap();
        assert_eq!(stored.status, SubmissionStatus::Completed);
        assert_eq!(stored.ai_answer_mc.as_deref(), Some("B"));
        assert_eq!(stored.ai_answer_long.as_deref(), Some("Two plus two is four."));
    }

    #[tokio::test]
    async fn test_stream_error_marks_failed_and_allows_retry() {
        let (flow, submissions, submission_id) = setup(ScriptedModel {
            partials: scripted_partials()[..1].to_vec(),
            fail: true,
        })
        .await;

        let job = flow.prepare("alice", submission_id).await.unwrap();
        let (tx, rx) = mpsc::channel(16);
        assert!(job.run(tx).await.is_err());

        let events = drain(rx).await;
        assert!(matches!(events.last(), Some(ReviewEvent::Failed { .. })));

        let stored = submissions.get_submission("alice", submission_id).await.unwrap();
        assert_eq!(stored.status, SubmissionStatus::Failed);

        // 失败后可以手动重新发起
        assert!(flow.prepare("alice", submission_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_write_back_error_is_reported() {
        let (flow, submissions, submission_id) = setup(ScriptedModel {
            partials: scripted_partials(),
            fail: false,
        })
        .await;

        let job = flow.prepare("alice", submission_id).await.unwrap();
        // 审核进行中记录被标记为失败，写回时状态流转不合法
        submissions
            .update_submission(
                "alice",
                submission_id,
                SubmissionUpdate::status(SubmissionStatus::Failed),
            )
            .await
            .unwrap();

        let (tx, rx) = mpsc::channel(16);
        let err = job.run(tx).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Business(crate::error::BusinessError::InvalidTransition { .. })
        ));

        let events = drain(rx).await;
        let names: Vec<_> = events.iter().map(ReviewEvent::name).collect();
        assert_eq!(names, vec!["partial", "partial", "partial", "failed"]);

        let stored = submissions.get_submission("alice", submission_id).await.unwrap();
        assert_eq!(stored.status, SubmissionStatus::Failed);
    }

    #[tokio::test]
    async fn test_prepare_checks_owner_and_status() {
        let (flow, submissions, submission_id) = setup(ScriptedModel {
            partials: scripted_partials(),
            fail: false,
        })
        .await;

        assert!(flow
            .prepare("mallory", submission_id)
            .await
            .err()
            .is_some_and(|e| e.is_unauthorized()));
        let stored = submissions.get_submission("alice", submission_id).await.unwrap();
        assert_eq!(stored.status, SubmissionStatus::Pending);

        let job = flow.prepare("alice", submission_id).await.unwrap();
        let (tx, _rx) = mpsc::channel(16);
        job.run(tx).await.unwrap();

        // 已完成的提交不能再次审核
        assert!(flow.prepare("alice", submission_id).await.is_err());
    }

    #[tokio::test]
    async fn test_disconnected_client_still_completes() {
        let (flow, submissions, submission_id) = setup(ScriptedModel {
            partials: scripted_partials(),
            fail: false,
        })
        .await;

        let job = flow.prepare("alice", submission_id).await.unwrap();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        job.run(tx).await.unwrap();

        let stored = submissions.get_submission("alice", submission_id).await.unwrap();
        assert_eq!(stored.status, SubmissionStatus::Completed);
    }
}
