use crate::api::ProfileUpdate;
use crate::app::state::AppState;
use crate::domain::action_log::ActionType;
use crate::perf::PerfGuard;
use crate::repository::{RequestFilter, UserFilter};

use super::common::{authenticate, map_api_error, to_json};

// ==========================================
// 管理员相关命令
// ==========================================

pub fn manual_assign(
    state: &AppState,
    token: &str,
    request_id: i64,
    worker_id: i64,
) -> Result<String, String> {
    let mut perf = PerfGuard::new("cmd.manual_assign").for_request(request_id);
    let session = authenticate(state, token, &mut perf)?;
    let result = state
        .admin_api
        .manual_assign(&session, request_id, worker_id)
        .map_err(map_api_error)?;
    to_json(&result)
}

pub fn list_assignable_workers(state: &AppState, token: &str) -> Result<String, String> {
    let mut perf = PerfGuard::new("cmd.list_assignable_workers");
    let session = authenticate(state, token, &mut perf)?;
    let result = state
        .admin_api
        .list_assignable_workers(&session)
        .map_err(map_api_error)?;
    to_json(&result)
}

pub fn list_users(state: &AppState, token: &str, filter: &UserFilter) -> Result<String, String> {
    let mut perf = PerfGuard::new("cmd.list_users");
    let session = authenticate(state, token, &mut perf)?;
    let result = state
        .admin_api
        .list_users(&session, filter)
        .map_err(map_api_error)?;
    to_json(&result)
}

pub fn update_profile(
    state: &AppState,
    token: &str,
    user_id: i64,
    update: &ProfileUpdate,
) -> Result<String, String> {
    let mut perf = PerfGuard::new("cmd.update_profile");
    let session = authenticate(state, token, &mut perf)?;
    let result = state
        .admin_api
        .update_profile(&session, user_id, update)
        .map_err(map_api_error)?;
    to_json(&result)
}

pub fn set_user_active(
    state: &AppState,
    token: &str,
    user_id: i64,
    active: bool,
) -> Result<String, String> {
    let mut perf = PerfGuard::new("cmd.set_user_active");
    let session = authenticate(state, token, &mut perf)?;
    let result = state
        .admin_api
        .set_user_active(&session, user_id, active)
        .map_err(map_api_error)?;
    to_json(&result)
}

pub fn set_user_staff(
    state: &AppState,
    token: &str,
    user_id: i64,
    is_staff: bool,
) -> Result<String, String> {
    let mut perf = PerfGuard::new("cmd.set_user_staff");
    let session = authenticate(state, token, &mut perf)?;
    let result = state
        .admin_api
        .set_user_staff(&session, user_id, is_staff)
        .map_err(map_api_error)?;
    to_json(&result)
}

pub fn search_requests(
    state: &AppState,
    token: &str,
    filter: &RequestFilter,
    page: i64,
) -> Result<String, String> {
    let mut perf = PerfGuard::new("cmd.search_requests");
    let session = authenticate(state, token, &mut perf)?;
    let result = state
        .admin_api
        .search_requests(&session, filter, page)
        .map_err(map_api_error)?;
    to_json(&serde_json::json!({
        "page": result.page,
        "page_size": result.page_size,
        "page_count": result.page_count(),
        "total": result.total,
        "items": result.items,
    }))
}

/// 导出 CSV 到文件
pub fn export_requests_csv(
    state: &AppState,
    token: &str,
    filter: &RequestFilter,
    output_path: &str,
) -> Result<String, String> {
    let mut perf = PerfGuard::new("cmd.export_requests_csv");
    let session = authenticate(state, token, &mut perf)?;
    let file = std::fs::File::create(output_path)
        .map_err(|e| format!("无法创建导出文件 {}: {}", output_path, e))?;
    let rows = state
        .admin_api
        .export_requests_csv(&session, filter, std::io::BufWriter::new(file))
        .map_err(map_api_error)?;
    to_json(&serde_json::json!({ "path": output_path, "rows": rows }))
}

pub fn action_logs(
    state: &AppState,
    token: &str,
    action_type: Option<ActionType>,
    limit: i64,
) -> Result<String, String> {
    let mut perf = PerfGuard::new("cmd.action_logs");
    let session = authenticate(state, token, &mut perf)?;
    let result = state
        .admin_api
        .action_logs(&session, action_type, limit)
        .map_err(map_api_error)?;
    to_json(&result)
}

pub fn request_history(state: &AppState, token: &str, request_id: i64) -> Result<String, String> {
    let mut perf = PerfGuard::new("cmd.request_history").for_request(request_id);
    let session = authenticate(state, token, &mut perf)?;
    let result = state
        .admin_api
        .request_history(&session, request_id)
        .map_err(map_api_error)?;
    to_json(&result)
}
