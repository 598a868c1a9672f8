//! 当前用户身份
//!
//! 登录由前置网关负责，这里只读取它注入的 `x-user-id` 请求头。

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::{AppError, BusinessError};

pub const USER_HEADER: &str = "x-user-id";

/// 发起请求的用户
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| CurrentUser(value.to_string()))
            .ok_or(AppError::Business(BusinessError::MissingUser))
    }
}
