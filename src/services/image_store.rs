//! 图片存储服务 - 业务能力层
//!
//! 只负责"保存一张上传的示意图并给出访问地址"，不关心条目

use std::path::PathBuf;

use futures::future::BoxFuture;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppResult, StorageError};

/// 允许上传的图片类型及其扩展名，只收位图
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

/// 图片存储能力
pub trait ImageStore: Send + Sync {
    /// 保存图片，返回可公开访问的 URL
    fn store(&self, content_type: &str, bytes: Vec<u8>) -> BoxFuture<'_, AppResult<String>>;
}

/// 本地目录存储
///
/// 职责：
/// - 校验图片类型
/// - 以随机文件名写入上传目录
/// - 拼出 `{public_base_url}/uploads/{name}`
pub struct LocalImageStore {
    upload_dir: PathBuf,
    public_base_url: String,
}

impl LocalImageStore {
    pub fn new(upload_dir: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.upload_dir, &config.public_base_url)
    }

    pub fn upload_dir(&self) -> &PathBuf {
        &self.upload_dir
    }

    async fn write(&self, content_type: &str, bytes: Vec<u8>) -> AppResult<String> {
        if bytes.is_empty() {
            return Err(StorageError::EmptyUpload.into());
        }
        let ext = extension_for(content_type)?;

        let file_name = format!("{}.{}", Uuid::new_v4(), ext);
        let path = self.upload_dir.join(&file_name);
        debug!("写入图片: {} ({} 字节)", path.display(), bytes.len());

        let write_failed = |source| StorageError::WriteFailed {
            path: path.display().to_string(),
            source,
        };
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(write_failed)?;
        tokio::fs::write(&path, &bytes).await.map_err(write_failed)?;

        let url = format!("{}/uploads/{}", self.public_base_url, file_name);
        info!("✓ 图片已保存: {}", url);
        Ok(url)
    }
}

impl ImageStore for LocalImageStore {
    fn store(&self, content_type: &str, bytes: Vec<u8>) -> BoxFuture<'_, AppResult<String>> {
        let content_type = content_type.to_string();
        Box::pin(async move { self.write(&content_type, bytes).await })
    }
}

fn extension_for(content_type: &str) -> AppResult<&'static str> {
    let normalized = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    ALLOWED_TYPES
        .iter()
        .find(|(mime, _)| *mime == normalized)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| {
            StorageError::UnsupportedType {
                content_type: content_type.to_string(),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[tokio::test]
    async fn test_store_writes_file_and_returns_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path().join("uploads"), "http://localhost:3000/");

        let url = store
            .store("image/png", vec![0x89, b'P', b'N', b'G'])
            .await
            .unwrap();

        assert!(url.starts_with("http://localhost:3000/uploads/"));
        assert!(url.ends_with(".png"));

        let name = url.rsplit('/').next().unwrap();
        let written = std::fs::read(dir.path().join("uploads").join(name)).unwrap();
        assert_eq!(written, vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_store_rejects_bad_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), "http://localhost:3000");

        let empty = store.store("image/png", Vec::new()).await;
        assert!(matches!(
            empty,
            Err(AppError::Storage(StorageError::EmptyUpload))
        ));

        let pdf = store.store("application/pdf", vec![1, 2, 3]).await;
        assert!(matches!(
            pdf,
            Err(AppError::Storage(StorageError::UnsupportedType { .. }))
        ));

        let svg = store
            .store("image/svg+xml", b"<svg onload=\"alert(1)\"/>".to_vec())
            .await;
        assert!(matches!(
            svg,
            Err(AppError::Storage(StorageError::UnsupportedType { .. }))
        ));
    }

    #[test]
    fn test_extension_ignores_parameters() {
        assert_eq!(extension_for("image/JPEG; charset=binary").unwrap(), "jpg");
        assert_eq!(extension_for("image/webp").unwrap(), "webp");
    }
}
