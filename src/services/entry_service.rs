//! 条目服务 - 业务能力层
//!
//! 负责条目的增删改查，所有修改前都先校验所有者

use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::entries;
use crate::error::{AppError, AppResult};
use crate::models::{Entry, EntryDraft, EntryStatus};
use crate::services::ensure_same_user;

/// 条目服务
///
/// 职责：
/// - 创建空白条目、列出用户条目
/// - 保存表单草稿（自动保存和手动保存共用）
/// - 完整校验后标记为已提交
/// - 只能操作自己的条目
#[derive(Clone)]
pub struct EntryService {
    pool: SqlitePool,
}

impl EntryService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 为用户创建空白条目
    pub async fn create_entry(&self, user_id: &str) -> AppResult<Entry> {
        let entry = Entry::new_blank(user_id);
        entries::insert_entry(&self.pool, &entry).await?;
        info!("📝 新建条目 #{} (用户: {})", entry.entry_id, user_id);
        Ok(entry)
    }

    /// 读取条目，只能读取自己的
    pub async fn get_entry(&self, user_id: &str, entry_id: Uuid) -> AppResult<Entry> {
        let entry = entries::load_entry(&self.pool, entry_id)
            .await?
            .ok_or_else(|| AppError::not_found("Entry", entry_id.to_string()))?;
        ensure_same_user(&entry.user_id, user_id, "查看")?;
        Ok(entry)
    }

    /// 列出用户的条目，新的在前
    pub async fn list_entries(&self, user_id: &str) -> AppResult<Vec<Entry>> {
        entries::list_entries_by_user(&self.pool, user_id).await
    }

    /// 保存表单草稿
    ///
    /// 草稿只做宽松校验；完整校验在提交时进行。
    pub async fn save_entry(
        &self,
        user_id: &str,
        entry_id: Uuid,
        draft: EntryDraft,
    ) -> AppResult<Entry> {
        let mut entry = self.get_entry(user_id, entry_id).await?;
        draft.validate_draft()?;

        entry.apply_draft(draft);
        entries::update_entry(&self.pool, &entry).await?;
        debug!("💾 条目 #{} 已保存", entry_id);
        Ok(entry)
    }

    /// 完整校验并标记为已提交
    pub async fn submit_entry(&self, user_id: &str, entry_id: Uuid) -> AppResult<Entry> {
        let mut entry = self.get_entry(user_id, entry_id).await?;
        entry.draft().validate_complete()?;

        if entry.status != EntryStatus::Submitted {
            entry.status = EntryStatus::Submitted;
            entry.updated_at = crate::models::now();
            entries::update_entry(&self.pool, &entry).await?;
        }
        info!("✓ 条目 #{} 已提交", entry_id);
        Ok(entry)
    }

    /// 删除条目及其提交记录
    pub async fn delete_entry(&self, user_id: &str, entry_id: Uuid) -> AppResult<()> {
        self.ensure_owner(user_id, entry_id).await?;
        entries::delete_entry(&self.pool, entry_id).await?;
        info!("🗑️ 条目 #{} 已删除", entry_id);
        Ok(())
    }

    /// 校验条目存在且属于该用户
    pub async fn ensure_owner(&self, user_id: &str, entry_id: Uuid) -> AppResult<()> {
        let owner = entries::load_entry_owner(&self.pool, entry_id)
            .await?
            .ok_or_else(|| AppError::not_found("Entry", entry_id.to_string()))?;
        ensure_same_user(&owner, user_id, "修改")
    }
}
