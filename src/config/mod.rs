// ==========================================
// 校园服务工单系统 - 配置层
// ==========================================
// 职责: 业务参数 (config_kv 表) 与进程级配置 (环境变量)
// ==========================================

pub mod app_config;
pub mod config_manager;

// 重导出核心配置管理器
pub use app_config::{get_default_db_path, get_default_media_root, AppConfig, LogFormat};
pub use config_manager::{config_keys, ConfigEntry, ConfigManager};
