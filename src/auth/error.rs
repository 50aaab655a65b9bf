// ==========================================
// 校园服务工单系统 - 认证错误类型
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 单个表单字段错误
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("无权访问: {0}")]
    PermissionDenied(String),

    #[error("密码哈希格式错误: {0}")]
    MalformedHash(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type AuthResult<T> = Result<T, AuthError>;
