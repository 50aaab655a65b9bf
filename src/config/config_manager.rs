// ==========================================
// 校园服务工单系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 约束: 非法值回退默认值并告警, 不阻断业务
// ==========================================

use crate::db::SharedConnection;
use crate::engine::selection::WorkerSelection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: SharedConnection,
}

/// 单项配置的生效值
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub default_value: String,
    pub is_default: bool,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: SharedConnection) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入 global 配置（UPSERT）
    ///
    /// 只接受已知配置键, 且值必须可解析
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let value = value.trim();
        if !config_keys::is_valid_value(key, value) {
            return Err(RepositoryError::FieldValueError {
                field: key.to_string(),
                message: format!("非法配置值: {}", value),
            });
        }

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取并解析数值配置, 非法或越界时回退默认值
    fn get_positive<T>(&self, key: &str, default: T) -> RepositoryResult<T>
    where
        T: FromStr + Copy + ToString,
    {
        let raw = self.get_config_or_default(key, &default.to_string())?;
        let raw_value = raw.trim();
        match raw_value.parse::<T>() {
            Ok(v) if config_keys::is_valid_value(key, raw_value) => Ok(v),
            _ => {
                tracing::warn!(config_key = key, raw_value = %raw, "配置值非法，使用默认值");
                Ok(default)
            }
        }
    }

    // ===== 派单 =====

    pub fn get_worker_selection(&self) -> RepositoryResult<WorkerSelection> {
        let raw = self.get_config_or_default(
            config_keys::WORKER_SELECTION,
            WorkerSelection::default().to_db_str(),
        )?;
        Ok(WorkerSelection::parse(&raw).unwrap_or_else(|| {
            tracing::warn!(
                config_key = config_keys::WORKER_SELECTION,
                raw_value = %raw,
                "派单策略配置非法，使用 RANDOM"
            );
            WorkerSelection::default()
        }))
    }

    // ===== 账号与会话 =====

    pub fn get_session_ttl_hours(&self) -> RepositoryResult<i64> {
        self.get_positive(config_keys::SESSION_TTL_HOURS, defaults::SESSION_TTL_HOURS)
    }

    pub fn get_password_hash_iterations(&self) -> RepositoryResult<u32> {
        self.get_positive(config_keys::PASSWORD_HASH_ITERATIONS, defaults::PASSWORD_HASH_ITERATIONS)
    }

    pub fn get_password_min_length(&self) -> RepositoryResult<usize> {
        self.get_positive(config_keys::PASSWORD_MIN_LENGTH, defaults::PASSWORD_MIN_LENGTH)
    }

    // ===== 图片 =====

    pub fn get_max_image_bytes(&self) -> RepositoryResult<u64> {
        self.get_positive(config_keys::MAX_IMAGE_BYTES, defaults::MAX_IMAGE_BYTES)
    }

    // ===== 列表规模 =====

    pub fn get_dashboard_recent_limit(&self) -> RepositoryResult<i64> {
        self.get_positive(config_keys::DASHBOARD_RECENT_LIMIT, defaults::DASHBOARD_RECENT_LIMIT)
    }

    pub fn get_worker_history_limit(&self) -> RepositoryResult<i64> {
        self.get_positive(config_keys::WORKER_HISTORY_LIMIT, defaults::WORKER_HISTORY_LIMIT)
    }

    pub fn get_admin_page_size(&self) -> RepositoryResult<i64> {
        self.get_positive(config_keys::ADMIN_PAGE_SIZE, defaults::ADMIN_PAGE_SIZE)
    }

    /// 全部已知配置的生效值（按键排序）
    pub fn list_effective(&self) -> RepositoryResult<Vec<ConfigEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global'")?;
        let stored: BTreeMap<String, String> = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<_>>()?;

        let mut entries: Vec<ConfigEntry> = config_keys::ALL
            .iter()
            .map(|(key, default_value)| {
                let value = stored.get(*key).cloned();
                ConfigEntry {
                    key: key.to_string(),
                    is_default: value.is_none(),
                    value: value.unwrap_or_else(|| default_value.to_string()),
                    default_value: default_value.to_string(),
                }
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}

// ==========================================
// 默认值
// ==========================================
pub mod defaults {
    pub const SESSION_TTL_HOURS: i64 = 24 * 14;
    pub const PASSWORD_HASH_ITERATIONS: u32 = 260_000;
    pub const PASSWORD_MIN_LENGTH: usize = 8;
    pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;
    pub const DASHBOARD_RECENT_LIMIT: i64 = 15;
    pub const WORKER_HISTORY_LIMIT: i64 = 10;
    pub const ADMIN_PAGE_SIZE: i64 = 25;
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    use crate::engine::selection::WorkerSelection;

    // 派单
    pub const WORKER_SELECTION: &str = "worker_selection";

    // 账号与会话
    pub const SESSION_TTL_HOURS: &str = "session_ttl_hours";
    pub const PASSWORD_HASH_ITERATIONS: &str = "password_hash_iterations";
    pub const PASSWORD_MIN_LENGTH: &str = "password_min_length";

    // 图片
    pub const MAX_IMAGE_BYTES: &str = "max_image_bytes";

    // 列表规模
    pub const DASHBOARD_RECENT_LIMIT: &str = "dashboard_recent_limit";
    pub const WORKER_HISTORY_LIMIT: &str = "worker_history_limit";
    pub const ADMIN_PAGE_SIZE: &str = "admin_page_size";

    /// (键, 默认值)
    pub const ALL: [(&str, &str); 8] = [
        (WORKER_SELECTION, "RANDOM"),
        (SESSION_TTL_HOURS, "336"),
        (PASSWORD_HASH_ITERATIONS, "260000"),
        (PASSWORD_MIN_LENGTH, "8"),
        (MAX_IMAGE_BYTES, "5242880"),
        (DASHBOARD_RECENT_LIMIT, "15"),
        (WORKER_HISTORY_LIMIT, "10"),
        (ADMIN_PAGE_SIZE, "25"),
    ];

    pub fn is_known(key: &str) -> bool {
        ALL.iter().any(|(k, _)| *k == key)
    }

    /// 数值配置的取值范围 (闭区间)
    pub fn bounds(key: &str) -> Option<(u64, u64)> {
        match key {
            // 最长 10 年
            SESSION_TTL_HOURS => Some((1, 24 * 365 * 10)),
            PASSWORD_HASH_ITERATIONS => Some((1, u64::from(u32::MAX))),
            PASSWORD_MIN_LENGTH => Some((1, 128)),
            MAX_IMAGE_BYTES => Some((1, 256 * 1024 * 1024)),
            DASHBOARD_RECENT_LIMIT | WORKER_HISTORY_LIMIT | ADMIN_PAGE_SIZE => Some((1, 1000)),
            _ => None,
        }
    }

    /// 校验配置值
    pub fn is_valid_value(key: &str, value: &str) -> bool {
        if key == WORKER_SELECTION {
            return WorkerSelection::parse(value).is_some();
        }
        match (bounds(key), value.parse::<u64>()) {
            (Some((min, max)), Ok(v)) => (min..=max).contains(&v),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn setup() -> ConfigManager {
        let conn = crate::db::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_without_rows() {
        let config = setup();
        assert_eq!(config.get_worker_selection().unwrap(), WorkerSelection::Random);
        assert_eq!(config.get_session_ttl_hours().unwrap(), 336);
        assert_eq!(config.get_password_hash_iterations().unwrap(), 260_000);
        assert_eq!(config.get_max_image_bytes().unwrap(), 5_242_880);
        assert_eq!(config.get_dashboard_recent_limit().unwrap(), 15);
        assert_eq!(config.get_worker_history_limit().unwrap(), 10);
        assert_eq!(config.get_admin_page_size().unwrap(), 25);
    }

    #[test]
    fn test_set_and_read_back() {
        let config = setup();
        config
            .set_global_config_value(config_keys::WORKER_SELECTION, "first_free")
            .unwrap();
        config.set_global_config_value(config_keys::ADMIN_PAGE_SIZE, "10").unwrap();

        assert_eq!(config.get_worker_selection().unwrap(), WorkerSelection::FirstFree);
        assert_eq!(config.get_admin_page_size().unwrap(), 10);

        let entries = config.list_effective().unwrap();
        let page = entries.iter().find(|e| e.key == config_keys::ADMIN_PAGE_SIZE).unwrap();
        assert!(!page.is_default);
        assert_eq!(page.default_value, "25");
    }

    #[test]
    fn test_set_rejects_unknown_key_and_bad_value() {
        let config = setup();
        assert!(config.set_global_config_value("season_mode", "AUTO").is_err());
        assert!(config.set_global_config_value(config_keys::ADMIN_PAGE_SIZE, "0").is_err());
        assert!(config.set_global_config_value(config_keys::WORKER_SELECTION, "fastest").is_err());
    }

    #[test]
    fn test_set_rejects_out_of_range_values() {
        let config = setup();
        let cases = [
            (config_keys::SESSION_TTL_HOURS, "9999999999999"),
            (config_keys::SESSION_TTL_HOURS, "87601"),
            (config_keys::PASSWORD_HASH_ITERATIONS, "4294967296"),
            (config_keys::ADMIN_PAGE_SIZE, "1001"),
            (config_keys::MAX_IMAGE_BYTES, "18446744073709551615"),
        ];
        for (key, value) in cases {
            assert!(
                config.set_global_config_value(key, value).is_err(),
                "{}={} 应被拒绝",
                key,
                value
            );
        }

        config.set_global_config_value(config_keys::SESSION_TTL_HOURS, "87600").unwrap();
        config
            .set_global_config_value(config_keys::PASSWORD_HASH_ITERATIONS, "4294967295")
            .unwrap();
        assert_eq!(config.get_session_ttl_hours().unwrap(), 87_600);
        assert_eq!(config.get_password_hash_iterations().unwrap(), u32::MAX);
    }

    #[test]
    fn test_out_of_range_stored_value_falls_back_to_default() {
        let config = setup();
        {
            let conn = config.get_conn().unwrap();
            conn.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', 'session_ttl_hours', '9999999999999')",
                [],
            )
            .unwrap();
        }
        assert_eq!(config.get_session_ttl_hours().unwrap(), 336);
    }

    #[test]
    fn test_corrupt_value_falls_back_to_default() {
        let config = setup();
        {
            let conn = config.get_conn().unwrap();
            conn.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', 'worker_history_limit', 'lots')",
                [],
            )
            .unwrap();
        }
        assert_eq!(config.get_worker_history_limit().unwrap(), 10);
    }
}
