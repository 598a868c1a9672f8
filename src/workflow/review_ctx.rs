//! AI 审核上下文
//!
//! 封装"我正在审核哪个条目的哪次提交"这一信息

use std::fmt::Display;

use uuid::Uuid;

/// AI 审核上下文
#[derive(Debug, Clone)]
pub struct ReviewCtx {
    /// 发起审核的用户
    pub user_id: String,

    pub entry_id: Uuid,

    pub submission_id: Uuid,
}

impl ReviewCtx {
    pub fn new(user_id: impl Into<String>, entry_id: Uuid, submission_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            entry_id,
            submission_id,
        }
    }
}

impl Display for ReviewCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[条目 #{} 提交 #{}]",
            short_id(&self.entry_id),
            short_id(&self.submission_id)
        )
    }
}

/// 日志里只显示 UUID 的前 8 位
fn short_id(id: &Uuid) -> String {
    id.simple().to_string().chars().take(8).collect()
}
