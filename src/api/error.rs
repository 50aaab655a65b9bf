// ==========================================
// 校园服务工单系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换下层错误为用户友好的错误消息
// ==========================================

use crate::auth::error::{AuthError, FieldError};
use crate::media::MediaError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 认证与权限
    // ==========================================
    #[error("用户名或密码错误")]
    InvalidCredentials,

    #[error("未登录或会话已过期")]
    Unauthenticated,

    #[error("无权访问: {0}")]
    PermissionDenied(String),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    /// 表单校验失败（带字段级错误）
    #[error("表单校验失败: {}", summarize(.0))]
    ValidationError(Vec<FieldError>),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("维修工忙碌: {0}")]
    WorkerBusy(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ApiError {
    /// 单字段校验错误
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![FieldError::new(field, message)])
    }

    /// 稳定错误代码（命令层 / CLI 输出）
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::PermissionDenied(_) => "PERMISSION_DENIED",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::WorkerBusy(_) => "WORKER_BUSY",
            ApiError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            ApiError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
            ApiError::DatabaseTransactionError(_) => "DATABASE_TRANSACTION_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "OTHER_ERROR",
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将Repository层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::PermissionDenied(msg) => ApiError::PermissionDenied(msg),
            AuthError::MalformedHash(msg) => ApiError::InternalError(format!("密码哈希损坏: {}", msg)),
            AuthError::Repository(e) => e.into(),
        }
    }
}

/// 图片错误按上传字段归类
pub fn media_error(field: &str, err: MediaError) -> ApiError {
    use crate::i18n::{t, t_with_args};
    match err {
        MediaError::Empty => ApiError::field(field, t("form.image_required")),
        MediaError::NotAnImage => ApiError::field(field, t("form.image_invalid")),
        MediaError::TooLarge { size, limit } => ApiError::field(
            field,
            t_with_args(
                "form.image_too_large",
                &[("size", &size.to_string()), ("limit", &limit.to_string())],
            ),
        ),
        MediaError::InvalidPath(p) => ApiError::InternalError(format!("非法的图片路径: {}", p)),
        MediaError::Io(e) => ApiError::InternalError(format!("图片读写失败: {}", e)),
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
