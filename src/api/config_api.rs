// ==========================================
// 校园服务工单系统 - 配置管理 API
// ==========================================
// 职责: 全局配置查询与更新（仅管理员）
// 红线: 每次更新记录 ActionLog
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::auth::Session;
use crate::config::{config_keys, ConfigEntry, ConfigManager};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::repository::ActionLogRepository;

// ==========================================
// ConfigApi - 配置管理 API
// ==========================================
pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl ConfigApi {
    pub fn new(config_manager: Arc<ConfigManager>, action_log_repo: Arc<ActionLogRepository>) -> Self {
        Self {
            config_manager,
            action_log_repo,
        }
    }

    /// 查询全部配置的生效值
    pub fn list_configs(&self, session: &Session) -> ApiResult<Vec<ConfigEntry>> {
        session.require_admin()?;
        Ok(self.config_manager.list_effective()?)
    }

    /// 更新配置
    ///
    /// # 返回
    /// 更新后的配置项
    pub fn update_config(&self, session: &Session, key: &str, value: &str) -> ApiResult<ConfigEntry> {
        session.require_admin()?;

        let key = key.trim();
        let value = value.trim();
        if key.is_empty() {
            return Err(ApiError::InvalidInput("配置键不能为空".to_string()));
        }
        if !config_keys::is_known(key) {
            return Err(ApiError::InvalidInput(format!("未知的配置键: {}", key)));
        }

        let previous = self.config_manager.get_global_config_value(key)?;
        self.config_manager.set_global_config_value(key, value)?;

        tracing::info!(key, value, admin = %session.username, "配置已更新");
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::ConfigUpdate, &session.username)
                .with_payload(serde_json::json!({
                    "key": key,
                    "value": value,
                    "previous": previous,
                }))
                .with_detail(format!("更新配置: {}={}", key, value)),
        )?;

        self.config_manager
            .list_effective()?
            .into_iter()
            .find(|e| e.key == key)
            .ok_or_else(|| ApiError::InternalError(format!("配置项丢失: {}", key)))
    }
}
