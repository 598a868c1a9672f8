use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppResult, ConfigError};

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP 监听地址
    pub bind_addr: String,
    /// 数据库连接串
    pub database_url: String,
    /// 自动保存的静默期（毫秒）
    pub autosave_debounce_ms: u64,
    /// 自动保存任务空闲多久后退出（秒）
    pub autosave_idle_secs: u64,
    /// 上传图片的存放目录
    pub upload_dir: String,
    /// 对外访问的基础 URL，用于拼接图片地址
    pub public_base_url: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database_url: "sqlite://stem_collect.db?mode=rwc".to_string(),
            autosave_debounce_ms: 1000,
            autosave_idle_secs: 600,
            upload_dir: "uploads".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-1.5-flash-latest".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 先读取 TOML 配置文件（如果提供），再用环境变量覆盖
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let base = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(self.bind_addr),
            database_url: std::env::var("DATABASE_URL").unwrap_or(self.database_url),
            autosave_debounce_ms: std::env::var("AUTOSAVE_DEBOUNCE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.autosave_debounce_ms),
            autosave_idle_secs: std::env::var("AUTOSAVE_IDLE_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.autosave_idle_secs),
            upload_dir: std::env::var("UPLOAD_DIR").unwrap_or(self.upload_dir),
            public_base_url: std::env::var("PUBLIC_BASE_URL").unwrap_or(self.public_base_url),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
        }
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn autosave_idle(&self) -> Duration {
        Duration::from_secs(self.autosave_idle_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_toml_file_fills_missing_keys_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "autosave_debounce_ms = 250").unwrap();
        writeln!(file, "upload_dir = \"/tmp/stem-uploads\"").unwrap();

        let config = Config::from_toml_file(file.path()).unwrap();

        assert_eq!(config.autosave_debounce(), Duration::from_millis(250));
        assert_eq!(config.upload_dir, "/tmp/stem-uploads");
        assert_eq!(config.llm_model_name, Config::default().llm_model_name);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = Config::from_toml_file(Path::new("/nonexistent/stem_collect.toml"));
        assert!(matches!(
            result,
            Err(crate::error::AppError::Config(ConfigError::ReadFailed { .. }))
        ));
    }
}
