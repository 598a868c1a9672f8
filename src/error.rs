use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 数据库相关错误
    #[error("数据库错误: {0}")]
    Store(#[from] StoreError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 业务逻辑错误
    #[error("业务错误: {0}")]
    Business(#[from] BusinessError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件存储错误
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 数据库相关错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQL 执行失败
    #[error("SQL执行失败: {0}")]
    Query(#[from] sqlx::Error),
    /// 数据库中的字段无法解析
    #[error("字段 {field} 的值无法解析: '{value}'")]
    Corrupt { field: String, value: String },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 未配置 API 密钥
    #[error("未配置 LLM API 密钥")]
    MissingCredential,
    /// 构建请求失败
    #[error("构建 LLM 请求失败: {message}")]
    RequestBuildFailed { message: String },
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 流式响应中途失败
    #[error("LLM 流式响应中断 (模型: {model}): {message}")]
    StreamFailed { model: String, message: String },
    /// 返回内容为空或无法解析
    #[error("LLM 返回内容无法解析 (模型: {model}): {response}")]
    MalformedOutput { model: String, response: String },
    /// 模型列表获取失败
    #[error("获取模型列表失败 ({endpoint}): {message}")]
    ModelListFailed { endpoint: String, message: String },
}

/// 业务逻辑错误
#[derive(Debug, Error)]
pub enum BusinessError {
    /// 请求未携带用户身份
    #[error("缺少用户身份")]
    MissingUser,
    /// 记录不存在
    #[error("{kind} 不存在: {id}")]
    NotFound { kind: &'static str, id: String },
    /// 越权操作
    #[error("无权操作: 只能{action}自己的记录")]
    Unauthorized { action: &'static str },
    /// 表单校验失败
    #[error("字段 {field} 校验失败: {message}")]
    Validation { field: String, message: String },
    /// 非法的状态流转
    #[error("非法的状态流转: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    /// 不允许的步骤跳转
    #[error("只能回到之前的步骤 (当前: {from}, 目标: {to})")]
    StepNotAllowed { from: u8, to: u8 },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        source: toml::de::Error,
    },
}

/// 文件存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 上传内容为空
    #[error("上传的文件为空")]
    EmptyUpload,
    /// 不支持的文件类型
    #[error("不支持的文件类型: {content_type}")]
    UnsupportedType { content_type: String },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        source: std::io::Error,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Store(StoreError::Query(err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Other(format!("JSON解析失败: {}", err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建记录不存在错误
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        AppError::Business(BusinessError::NotFound {
            kind,
            id: id.into(),
        })
    }

    /// 创建越权错误
    pub fn unauthorized(action: &'static str) -> Self {
        AppError::Business(BusinessError::Unauthorized { action })
    }

    /// 创建表单校验错误
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Business(BusinessError::Validation {
            field: field.into(),
            message: message.into(),
        })
    }

    /// 创建数据损坏错误
    pub fn corrupt(field: impl Into<String>, value: impl Into<String>) -> Self {
        AppError::Store(StoreError::Corrupt {
            field: field.into(),
            value: value.into(),
        })
    }

    /// 创建LLM API调用错误
    pub fn llm_api_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }

    /// 是否为越权错误
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            AppError::Business(BusinessError::Unauthorized { .. })
        )
    }

    /// 是否为记录不存在错误
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::Business(BusinessError::NotFound { .. }))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlx_error_maps_to_store() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::Store(StoreError::Query(_))));
    }

    #[test]
    fn test_predicates() {
        assert!(AppError::unauthorized("修改").is_unauthorized());
        assert!(AppError::not_found("Entry", "x").is_not_found());
        assert!(!AppError::validation("hint", "不能为空").is_not_found());
    }
}
