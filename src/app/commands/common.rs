use crate::api::error::{media_error, ApiError};
use crate::app::state::AppState;
use crate::auth::Session;
use crate::media::MediaError;
use crate::perf::PerfGuard;
use serde::{Deserialize, Serialize};

// ==========================================
// 公共工具：错误映射、会话解析、图片读取
// ==========================================

/// 错误响应（命令失败时输出）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: String,

    /// 错误消息
    pub message: String,

    /// 详细信息（可选）
    pub details: Option<serde_json::Value>,
}

/// 将ApiError转换为JSON字符串
pub(super) fn map_api_error(err: ApiError) -> String {
    let error_response = ErrorResponse {
        code: err.code().to_string(),
        message: err.to_string(),
        details: match &err {
            ApiError::ValidationError(field_errors) => {
                Some(serde_json::json!({ "field_errors": field_errors }))
            }
            ApiError::InvalidStateTransition { from, to } => {
                Some(serde_json::json!({ "from": from, "to": to }))
            }
            _ => None,
        },
    };

    serde_json::to_string(&error_response).unwrap_or_else(|_| err.to_string())
}

/// 序列化命令结果
pub(super) fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("序列化失败: {}", e))
}

/// 解析会话令牌, 并把操作人记到命令统计上
pub(super) fn authenticate(state: &AppState, token: &str, perf: &mut PerfGuard) -> Result<Session, String> {
    let session = state.auth_api.authenticate(token).map_err(map_api_error)?;
    perf.set_user(session.user_id);
    Ok(session)
}

/// 读取上传图片文件
///
/// 先按文件大小拦截超限图片, 不把整个文件读进内存
pub(super) fn read_image(state: &AppState, field: &str, path: &str) -> Result<Vec<u8>, String> {
    let unreadable = |e: std::io::Error| {
        map_api_error(ApiError::field(
            field,
            format!("无法读取图片文件 {}: {}", path, e),
        ))
    };

    let size = std::fs::metadata(path).map_err(unreadable)?.len();
    let limit = state
        .config_manager
        .get_max_image_bytes()
        .map_err(|e| map_api_error(e.into()))?;
    if size > limit {
        return Err(map_api_error(media_error(
            field,
            MediaError::TooLarge { size, limit },
        )));
    }
    std::fs::read(path).map_err(unreadable)
}
