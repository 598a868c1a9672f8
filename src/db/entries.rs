//! 条目表读写

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::{decode_time, decode_uuid, encode_time};
use crate::error::{AppError, AppResult};
use crate::models::{AnswerChoices, ChoiceLetter, Entry, EntryStatus, Subject};

const ENTRY_COLUMNS: &str = "entry_id, user_id, subject, question, image, answer_choices, \
     answer_multiple_choice, answer_long, hint, status, created_at, updated_at";

/// 插入新条目
pub async fn insert_entry(pool: &SqlitePool, entry: &Entry) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO entries (entry_id, user_id, subject, question, image, answer_choices,
                             answer_multiple_choice, answer_long, hint, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.entry_id.to_string())
    .bind(&entry.user_id)
    .bind(entry.subject.map(Subject::as_str).unwrap_or(""))
    .bind(&entry.question)
    .bind(&entry.image)
    .bind(serde_json::to_string(&entry.answer_choices)?)
    .bind(entry.answer_multiple_choice.map(ChoiceLetter::as_str))
    .bind(&entry.answer_long)
    .bind(&entry.hint)
    .bind(entry.status.as_str())
    .bind(encode_time(&entry.created_at))
    .bind(encode_time(&entry.updated_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// 按 ID 读取条目
pub async fn load_entry(pool: &SqlitePool, entry_id: Uuid) -> AppResult<Option<Entry>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM entries WHERE entry_id = ?",
        ENTRY_COLUMNS
    ))
    .bind(entry_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(|row| entry_from_row(&row)).transpose()
}

/// 只读取条目所有者，用于权限判断
pub async fn load_entry_owner(pool: &SqlitePool, entry_id: Uuid) -> AppResult<Option<String>> {
    let owner = sqlx::query_scalar("SELECT user_id FROM entries WHERE entry_id = ?")
        .bind(entry_id.to_string())
        .fetch_optional(pool)
        .await?;
    Ok(owner)
}

/// 列出用户的所有条目，新的在前
pub async fn list_entries_by_user(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<Entry>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM entries WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        ENTRY_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(entry_from_row).collect()
}

/// 写回表单字段和状态
pub async fn update_entry(pool: &SqlitePool, entry: &Entry) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE entries SET
            subject = ?,
            question = ?,
            image = ?,
            answer_choices = ?,
            answer_multiple_choice = ?,
            answer_long = ?,
            hint = ?,
            status = ?,
            updated_at = ?
        WHERE entry_id = ?
        "#,
    )
    .bind(entry.subject.map(Subject::as_str).unwrap_or(""))
    .bind(&entry.question)
    .bind(&entry.image)
    .bind(serde_json::to_string(&entry.answer_choices)?)
    .bind(entry.answer_multiple_choice.map(ChoiceLetter::as_str))
    .bind(&entry.answer_long)
    .bind(&entry.hint)
    .bind(entry.status.as_str())
    .bind(encode_time(&entry.updated_at))
    .bind(entry.entry_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// 删除条目及其所有提交记录，返回是否删除了条目
pub async fn delete_entry(pool: &SqlitePool, entry_id: Uuid) -> AppResult<bool> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM submissions WHERE entry_id = ?")
        .bind(entry_id.to_string())
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM entries WHERE entry_id = ?")
        .bind(entry_id.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(result.rows_affected() > 0)
}

fn entry_from_row(row: &SqliteRow) -> AppResult<Entry> {
    let entry_id: String = row.get("entry_id");
    let subject: String = row.get("subject");
    let answer_choices: String = row.get("answer_choices");
    let letter: Option<String> = row.get("answer_multiple_choice");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    let subject = match subject.as_str() {
        "" => None,
        s => Some(Subject::from_str(s).ok_or_else(|| AppError::corrupt("subject", s))?),
    };
    let answer_multiple_choice = match letter.as_deref() {
        None | Some("") => None,
        Some(s) => Some(
            ChoiceLetter::parse(s).ok_or_else(|| AppError::corrupt("answer_multiple_choice", s))?,
        ),
    };
    let answer_choices: AnswerChoices = serde_json::from_str(&answer_choices)
        .map_err(|_| AppError::corrupt("answer_choices", &answer_choices))?;

    Ok(Entry {
        entry_id: decode_uuid("entry_id", &entry_id)?,
        user_id: row.get("user_id"),
        subject,
        question: row.get("question"),
        image: row.get("image"),
        answer_choices,
        answer_multiple_choice,
        answer_long: row.get("answer_long"),
        hint: row.get("hint"),
        status: EntryStatus::from_str(&status).ok_or_else(|| AppError::corrupt("status", &status))?,
        created_at: decode_time("created_at", &created_at)?,
        updated_at: decode_time("updated_at", &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::models::EntryDraft;

    #[tokio::test]
    async fn test_insert_load_update() {
        let pool = memory_pool().await;
        let mut entry = Entry::new_blank("alice");
        insert_entry(&pool, &entry).await.unwrap();

        let loaded = load_entry(&pool, entry.entry_id).await.unwrap().unwrap();
        assert_eq!(loaded, entry);

        entry.apply_draft(EntryDraft {
            subject: Some(Subject::Physics),
            question: "Which force keeps planets in orbit?".to_string(),
            answer_choices: AnswerChoices::try_from(vec![
                "Gravity".to_string(),
                "Friction".to_string(),
                "Magnetism".to_string(),
                "Tension".to_string(),
            ])
            .unwrap(),
            answer_multiple_choice: Some(ChoiceLetter::A),
            ..Default::default()
        });
        update_entry(&pool, &entry).await.unwrap();

        let loaded = load_entry(&pool, entry.entry_id).await.unwrap().unwrap();
        assert_eq!(loaded.subject, Some(Subject::Physics));
        assert_eq!(loaded.answer_multiple_choice, Some(ChoiceLetter::A));
        assert_eq!(loaded.answer_choices.get(ChoiceLetter::C), "Magnetism");
        assert_eq!(
            load_entry_owner(&pool, entry.entry_id).await.unwrap().as_deref(),
            Some("alice")
        );
    }

    #[tokio::test]
    async fn test_list_is_per_user_newest_first() {
        let pool = memory_pool().await;
        let mut older = Entry::new_blank("alice");
        older.created_at = older.created_at - chrono::Duration::minutes(5);
        let newer = Entry::new_blank("alice");
        let other = Entry::new_blank("bob");
        for entry in [&older, &newer, &other] {
            insert_entry(&pool, entry).await.unwrap();
        }

        let listed = list_entries_by_user(&pool, "alice").await.unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|e| e.entry_id).collect();
        assert_eq!(ids, vec![newer.entry_id, older.entry_id]);
    }

    #[tokio::test]
    async fn test_delete_missing_entry_reports_false() {
        let pool = memory_pool().await;
        assert!(!delete_entry(&pool, Uuid::new_v4()).await.unwrap());
    }
}
