//! 提交记录表读写

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::{decode_time, decode_uuid, encode_time};
use crate::error::{AppError, AppResult};
use crate::models::{Submission, SubmissionStatus, SubmissionUpdate};

const SUBMISSION_COLUMNS: &str =
    "submission_id, entry_id, user_id, status, ai_answer_mc, ai_answer_long, step, created_at";

/// 提交记录的归属信息（来自父条目）
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOwner {
    pub entry_id: Uuid,
    pub entry_owner: String,
}

pub async fn insert_submission(pool: &SqlitePool, submission: &Submission) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO submissions (submission_id, entry_id, user_id, status,
                                 ai_answer_mc, ai_answer_long, step, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(submission.submission_id.to_string())
    .bind(submission.entry_id.to_string())
    .bind(&submission.user_id)
    .bind(submission.status.as_str())
    .bind(&submission.ai_answer_mc)
    .bind(&submission.ai_answer_long)
    .bind(submission.step.map(i64::from))
    .bind(encode_time(&submission.created_at))
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load_submission(
    pool: &SqlitePool,
    submission_id: Uuid,
) -> AppResult<Option<Submission>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM submissions WHERE submission_id = ?",
        SUBMISSION_COLUMNS
    ))
    .bind(submission_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(|row| submission_from_row(&row)).transpose()
}

/// 读取提交记录的父条目及其所有者
pub async fn load_submission_owner(
    pool: &SqlitePool,
    submission_id: Uuid,
) -> AppResult<Option<SubmissionOwner>> {
    let row = sqlx::query(
        r#"
        SELECT s.entry_id AS entry_id, e.user_id AS entry_owner
        FROM submissions s
        INNER JOIN entries e ON e.entry_id = s.entry_id
        WHERE s.submission_id = ?
        "#,
    )
    .bind(submission_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let entry_id: String = row.get("entry_id");
            Ok(Some(SubmissionOwner {
                entry_id: decode_uuid("entry_id", &entry_id)?,
                entry_owner: row.get("entry_owner"),
            }))
        }
        None => Ok(None),
    }
}

/// 列出条目下的提交记录，新的在前
pub async fn list_submissions_by_entry(
    pool: &SqlitePool,
    entry_id: Uuid,
) -> AppResult<Vec<Submission>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM submissions WHERE entry_id = ? ORDER BY created_at DESC, rowid DESC",
        SUBMISSION_COLUMNS
    ))
    .bind(entry_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(submission_from_row).collect()
}

/// 更新状态和 AI 回答；回答为 `None` 时保留原值
pub async fn update_submission(
    pool: &SqlitePool,
    submission_id: Uuid,
    update: &SubmissionUpdate,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE submissions SET
            status = ?,
            ai_answer_mc = COALESCE(?, ai_answer_mc),
            ai_answer_long = COALESCE(?, ai_answer_long)
        WHERE submission_id = ?
        "#,
    )
    .bind(update.status.as_str())
    .bind(&update.ai_answer_mc)
    .bind(&update.ai_answer_long)
    .bind(submission_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn update_submission_step(
    pool: &SqlitePool,
    submission_id: Uuid,
    step: u8,
) -> AppResult<()> {
    sqlx::query("UPDATE submissions SET step = ? WHERE submission_id = ?")
        .bind(i64::from(step))
        .bind(submission_id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

fn submission_from_row(row: &SqliteRow) -> AppResult<Submission> {
    let submission_id: String = row.get("submission_id");
    let entry_id: String = row.get("entry_id");
    let status: String = row.get("status");
    let step: Option<i64> = row.get("step");
    let created_at: String = row.get("created_at");

    let step = step
        .map(|s| u8::try_from(s).map_err(|_| AppError::corrupt("step", s.to_string())))
        .transpose()?;

    Ok(Submission {
        submission_id: decode_uuid("submission_id", &submission_id)?,
        entry_id: decode_uuid("entry_id", &entry_id)?,
        user_id: row.get("user_id"),
        status: SubmissionStatus::from_str(&status)
            .ok_or_else(|| AppError::corrupt("status", &status))?,
        ai_answer_mc: row.get("ai_answer_mc"),
        ai_answer_long: row.get("ai_answer_long"),
        step,
        created_at: decode_time("created_at", &created_at)?,
    })
}
