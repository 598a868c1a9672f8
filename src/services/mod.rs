pub mod entry_service;
pub mod image_store;
pub mod llm_service;
pub mod submission_service;

pub use entry_service::EntryService;
pub use image_store::{ImageStore, LocalImageStore};
pub use llm_service::{LlmService, PartialStream, ReviewModel, ReviewRequest};
pub use submission_service::SubmissionService;

use crate::error::{AppError, AppResult};

/// 记录所有者必须是当前用户
pub(crate) fn ensure_same_user(owner: &str, user_id: &str, action: &'static str) -> AppResult<()> {
    if owner == user_id {
        Ok(())
    } else {
        Err(AppError::unauthorized(action))
    }
}
