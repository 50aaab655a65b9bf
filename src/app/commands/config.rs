use crate::app::state::AppState;
use crate::perf::PerfGuard;

use super::common::{authenticate, map_api_error, to_json};

// ==========================================
// 配置管理相关命令
// ==========================================

/// 查询所有配置
pub fn list_configs(state: &AppState, token: &str) -> Result<String, String> {
    let mut perf = PerfGuard::new("cmd.list_configs");
    let session = authenticate(state, token, &mut perf)?;
    let result = state
        .config_api
        .list_configs(&session)
        .map_err(map_api_error)?;
    to_json(&result)
}

/// 更新配置
pub fn update_config(state: &AppState, token: &str, key: &str, value: &str) -> Result<String, String> {
    let mut perf = PerfGuard::new("cmd.update_config");
    let session = authenticate(state, token, &mut perf)?;
    let result = state
        .config_api
        .update_config(&session, key, value)
        .map_err(map_api_error)?;
    to_json(&result)
}
