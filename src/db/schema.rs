use sqlx::SqlitePool;

use crate::error::AppResult;

const CREATE_ENTRIES: &str = r#"
    CREATE TABLE IF NOT EXISTS entries (
        entry_id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        subject TEXT NOT NULL DEFAULT '',
        question TEXT NOT NULL DEFAULT '',
        image TEXT,
        answer_choices TEXT NOT NULL DEFAULT '[]',
        answer_multiple_choice TEXT,
        answer_long TEXT NOT NULL DEFAULT '',
        hint TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'in_progress',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
"#;

const CREATE_SUBMISSIONS: &str = r#"
    CREATE TABLE IF NOT EXISTS submissions (
        submission_id TEXT PRIMARY KEY,
        entry_id TEXT NOT NULL REFERENCES entries(entry_id) ON DELETE CASCADE,
        user_id TEXT NOT NULL,
        status TEXT NOT NULL,
        ai_answer_mc TEXT,
        ai_answer_long TEXT,
        step INTEGER,
        created_at TEXT NOT NULL
    )
"#;

const CREATE_INDEXES: [&str; 2] = [
    "CREATE INDEX IF NOT EXISTS idx_entries_user ON entries(user_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_submissions_entry ON submissions(entry_id, created_at)",
];

/// 建表（幂等）
pub async fn init_schema(pool: &SqlitePool) -> AppResult<()> {
    sqlx::query(CREATE_ENTRIES).execute(pool).await?;
    sqlx::query(CREATE_SUBMISSIONS).execute(pool).await?;
    for statement in CREATE_INDEXES {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
