// ==========================================
// 校园服务工单系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口, 供命令层调用
// 每个接口先通过会话守卫检查角色
// ==========================================

pub mod admin_api;
pub mod auth_api;
pub mod config_api;
pub mod error;
pub mod requestee_api;
pub mod worker_api;

// 重导出核心类型
pub use admin_api::{
    AdminApi, AdminDashboard, AssignableWorker, ManualAssignResult, ProfileUpdate,
    ProfileUpdateResult, UserSummary, CSV_HEADERS,
};
pub use auth_api::{AuthApi, LoginResult};
pub use config_api::ConfigApi;
pub use error::{ApiError, ApiResult};
pub use requestee_api::{CreateRequestForm, CreateRequestResult, RequesteeApi, RequesteeDashboard, ReviewResult};
pub use worker_api::{CompleteTaskResult, WorkerApi, WorkerDashboard};
