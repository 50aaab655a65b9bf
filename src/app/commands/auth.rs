use crate::app::state::AppState;
use crate::auth::{DashboardKind, SignupForm};
use crate::perf::PerfGuard;
use serde::Serialize;

use super::common::{authenticate, map_api_error, to_json};

// ==========================================
// 账号与会话相关命令
// ==========================================

/// 初始化数据库（AppState 创建时已建表）
pub fn init_db(state: &AppState) -> Result<String, String> {
    let _perf = PerfGuard::new("cmd.init_db");
    let version = {
        let conn = state
            .conn
            .lock()
            .map_err(|e| format!("数据库锁获取失败: {}", e))?;
        crate::db::read_schema_version(&conn).map_err(|e| format!("读取schema版本失败: {}", e))?
    };
    to_json(&serde_json::json!({
        "db_path": state.db_path,
        "media_root": state.media_root,
        "schema_version": version,
    }))
}

pub fn create_admin(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
) -> Result<String, String> {
    let _perf = PerfGuard::new("cmd.create_admin");
    let user_id = state
        .auth_api
        .create_admin(username, email, password)
        .map_err(map_api_error)?;
    to_json(&serde_json::json!({ "user_id": user_id }))
}

pub fn signup(state: &AppState, form: &SignupForm) -> Result<String, String> {
    let _perf = PerfGuard::new("cmd.signup");
    let result = state.auth_api.signup(form).map_err(map_api_error)?;
    to_json(&result)
}

pub fn login(state: &AppState, username: &str, password: &str) -> Result<String, String> {
    let mut perf = PerfGuard::new("cmd.login");
    let result = state
        .auth_api
        .login(username, password)
        .map_err(map_api_error)?;
    perf.set_user(result.session.user_id);
    to_json(&result)
}

pub fn logout(state: &AppState, token: &str) -> Result<String, String> {
    let _perf = PerfGuard::new("cmd.logout");
    let message = state.auth_api.logout(token).map_err(map_api_error)?;
    to_json(&serde_json::json!({ "message": message }))
}

pub fn whoami(state: &AppState, token: &str) -> Result<String, String> {
    let _perf = PerfGuard::new("cmd.whoami");
    let user = state.auth_api.whoami(token).map_err(map_api_error)?;
    to_json(&user)
}

#[derive(Serialize)]
struct DashboardResponse<T: Serialize> {
    kind: DashboardKind,
    dashboard: T,
}

/// 按会话跳转到对应工作台
pub fn dashboard(state: &AppState, token: &str) -> Result<String, String> {
    let mut perf = PerfGuard::new("cmd.dashboard");
    let session = authenticate(state, token, &mut perf)?;
    let kind = session.dashboard_redirect();
    match kind {
        DashboardKind::Admin => to_json(&DashboardResponse {
            kind,
            dashboard: state.admin_api.dashboard(&session).map_err(map_api_error)?,
        }),
        DashboardKind::Requestee => to_json(&DashboardResponse {
            kind,
            dashboard: state
                .requestee_api
                .dashboard(&session)
                .map_err(map_api_error)?,
        }),
        DashboardKind::Worker => to_json(&DashboardResponse {
            kind,
            dashboard: state.worker_api.dashboard(&session).map_err(map_api_error)?,
        }),
    }
}
