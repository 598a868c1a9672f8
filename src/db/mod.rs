//! 数据库访问层
//!
//! 只负责读写 `entries` / `submissions` 两张表，不做权限判断。

pub mod entries;
pub mod schema;
pub mod submissions;

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{AppError, AppResult};

/// 连接数据库并建表
///
/// 内存数据库只能使用单连接，否则每个连接各自是一个空库。
pub async fn connect(database_url: &str) -> AppResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let in_memory = database_url.contains(":memory:");
    let pool = SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { 5 })
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    schema::init_schema(&pool).await?;
    info!("✓ 数据库已就绪: {}", database_url);

    Ok(pool)
}

/// 时间统一存成定长 RFC3339（微秒 + Z），保证按字符串排序即按时间排序
pub(crate) fn encode_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_time(field: &str, value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| AppError::corrupt(field, value))
}

pub(crate) fn decode_uuid(field: &str, value: &str) -> AppResult<uuid::Uuid> {
    uuid::Uuid::parse_str(value).map_err(|_| AppError::corrupt(field, value))
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_encoding_is_fixed_width() {
        let a = DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let b = DateTime::parse_from_rfc3339("2025-01-01T00:00:00.5Z")
            .unwrap()
            .with_timezone(&Utc);

        let (ea, eb) = (encode_time(&a), encode_time(&b));
        assert_eq!(ea.len(), eb.len());
        assert!(ea < eb);
        assert_eq!(decode_time("created_at", &eb).unwrap(), b);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_time("created_at", "yesterday").is_err());
        assert!(decode_uuid("entry_id", "not-a-uuid").is_err());
    }
}
