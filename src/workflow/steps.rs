//! 条目录入流程的步骤状态
//!
//! 状态是一个普通的值，由调用方持有；每次请求都从提交记录重新推算。

use serde::Serialize;

use crate::error::{AppError, AppResult, BusinessError};

/// 流程结束后跳转的位置
pub const FINISHED_REDIRECT: &str = "/entries";

/// 流程步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    /// 填写题目
    Details,
    /// AI 审核
    AiReview,
    /// 完善解答
    Solution,
}

impl WorkflowStep {
    pub const ALL: [WorkflowStep; 3] = [
        WorkflowStep::Details,
        WorkflowStep::AiReview,
        WorkflowStep::Solution,
    ];

    pub const LAST: WorkflowStep = WorkflowStep::Solution;

    /// 步骤编号，从 1 开始
    pub fn number(self) -> u8 {
        match self {
            WorkflowStep::Details => 1,
            WorkflowStep::AiReview => 2,
            WorkflowStep::Solution => 3,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.number() == n)
    }

    pub fn label(self) -> &'static str {
        match self {
            WorkflowStep::Details => "Question Details",
            WorkflowStep::AiReview => "AI Review",
            WorkflowStep::Solution => "Solution",
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}. {}", self.number(), self.label())
    }
}

/// 当前所在的步骤，或者已经走完
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    At(WorkflowStep),
    Finished,
}

impl WorkflowState {
    pub fn start() -> Self {
        WorkflowState::At(WorkflowStep::Details)
    }

    /// 从已有提交记录的步骤号推算：停在 `max(step) + 1`
    pub fn resume<I>(steps: I) -> Self
    where
        I: IntoIterator<Item = u8>,
    {
        let reached = steps.into_iter().max().unwrap_or(0);
        Self::from_position(reached.saturating_add(1))
    }

    fn from_position(n: u8) -> Self {
        match WorkflowStep::from_number(n.max(1)) {
            Some(step) => WorkflowState::At(step),
            None => WorkflowState::Finished,
        }
    }

    /// 位置编号；结束状态排在最后一步之后
    pub fn position(self) -> u8 {
        match self {
            WorkflowState::At(step) => step.number(),
            WorkflowState::Finished => WorkflowStep::LAST.number() + 1,
        }
    }

    pub fn current(self) -> Option<WorkflowStep> {
        match self {
            WorkflowState::At(step) => Some(step),
            WorkflowState::Finished => None,
        }
    }

    pub fn is_finished(self) -> bool {
        self == WorkflowState::Finished
    }

    /// 前进一步；最后一步之后是结束状态
    pub fn advance(self) -> Self {
        match self {
            WorkflowState::At(step) => step
                .next()
                .map(WorkflowState::At)
                .unwrap_or(WorkflowState::Finished),
            WorkflowState::Finished => WorkflowState::Finished,
        }
    }

    /// 只能回到之前的步骤
    pub fn jump_to(self, target: WorkflowStep) -> AppResult<Self> {
        if target.number() < self.position() {
            Ok(WorkflowState::At(target))
        } else {
            Err(AppError::Business(BusinessError::StepNotAllowed {
                from: self.position(),
                to: target.number(),
            }))
        }
    }

    /// 结束后客户端应跳转到的位置
    pub fn redirect(self) -> Option<&'static str> {
        self.is_finished().then_some(FINISHED_REDIRECT)
    }

    pub fn view(self) -> WorkflowView {
        WorkflowView {
            step: self.current().map(WorkflowStep::number),
            label: self.current().map(WorkflowStep::label),
            finished: self.is_finished(),
            redirect: self.redirect(),
            steps: WorkflowStep::ALL
                .into_iter()
                .map(|step| StepView {
                    step: step.number(),
                    label: step.label(),
                    completed: step.number() < self.position(),
                })
                .collect(),
        }
    }
}

/// 返回给客户端的流程状态
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowView {
    pub step: Option<u8>,
    pub label: Option<&'static str>,
    pub finished: bool,
    pub redirect: Option<&'static str>,
    pub steps: Vec<StepView>,
}

/// 进度条上的一个步骤
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepView {
    pub step: u8,
    pub label: &'static str,
    pub completed: bool,
}
