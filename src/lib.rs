//! # STEM Collect
//!
//! 一个用于录入 STEM 选择题并由 AI 审核的 Rust 服务
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 存储层（DB）
//! - `db/` - 只负责读写 `entries` / `submissions` 两张表
//! - 时间以定长 RFC3339 字符串存储，按字符串排序即按时间排序
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个操作前先校验所有者
//! - `EntryService` - 条目增删改查、草稿保存、提交
//! - `SubmissionService` - 提交记录和状态流转
//! - `LlmService` - 流式 AI 审核能力（`ReviewModel`）
//! - `LocalImageStore` - 示意图存储能力（`ImageStore`）
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个条目"和"一次审核"的完整流程
//! - `EntryFlow` - 三步流程（填写 → AI 审核 → 解答）
//! - `ReviewFlow` - 校验 → 流式调用 → 写回
//! - `AutosaveRegistry` - 防抖自动保存
//! - `stream/` - 流式 JSON 的增量解析与合并
//!
//! ### ④ 接口层（API）
//! - `api/` - axum 路由，把请求翻译成服务 / 流程调用
//! - `App` - 连接数据库、组装状态、启动 HTTP 服务
//!
//! ## 模块结构

pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod stream;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use api::{build_router, AppState};
pub use app::App;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{AiAnswer, Entry, EntryDraft, PartialAiAnswer, Submission, SubmissionStatus};
pub use services::{ImageStore, LlmService, LocalImageStore, ReviewModel};
pub use workflow::{EntryFlow, ReviewFlow, WorkflowState, WorkflowStep};
