use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult, BusinessError};

/// 提交状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl SubmissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Processing => "processing",
            SubmissionStatus::Completed => "completed",
            SubmissionStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SubmissionStatus::Pending),
            "processing" => Some(SubmissionStatus::Processing),
            "completed" => Some(SubmissionStatus::Completed),
            "failed" => Some(SubmissionStatus::Failed),
            _ => None,
        }
    }

    /// 是否允许流转到 `next`
    ///
    /// `failed -> processing` 对应用户手动重新发起审核。
    pub fn can_transition_to(self, next: SubmissionStatus) -> bool {
        use SubmissionStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Failed, Processing)
        )
    }

    pub fn ensure_transition(self, next: SubmissionStatus) -> AppResult<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::Business(BusinessError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            }))
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次 AI 审核记录
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub submission_id: Uuid,
    pub entry_id: Uuid,
    pub user_id: String,
    pub status: SubmissionStatus,
    /// AI 给出的选项字母
    pub ai_answer_mc: Option<String>,
    /// AI 给出的解析
    pub ai_answer_long: Option<String>,
    /// 该记录到达的流程步骤
    pub step: Option<u8>,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    pub fn new_pending(entry_id: Uuid, user_id: impl Into<String>, step: Option<u8>) -> Self {
        Self {
            submission_id: Uuid::new_v4(),
            entry_id,
            user_id: user_id.into(),
            status: SubmissionStatus::Pending,
            ai_answer_mc: None,
            ai_answer_long: None,
            step,
            created_at: crate::models::now(),
        }
    }
}

/// 提交记录的更新内容
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionUpdate {
    pub status: SubmissionStatus,
    #[serde(default)]
    pub ai_answer_mc: Option<String>,
    #[serde(default)]
    pub ai_answer_long: Option<String>,
}

impl SubmissionUpdate {
    pub fn status(status: SubmissionStatus) -> Self {
        Self {
            status,
            ai_answer_mc: None,
            ai_answer_long: None,
        }
    }
}
