// ==========================================
// 校园服务工单系统 - 进程级配置
// ==========================================
// 来源: 环境变量, 缺省时使用用户数据目录
// 说明: 业务参数在 config_kv 表中, 见 ConfigManager
// ==========================================

use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "CLEANIFY_DB_PATH";
pub const ENV_MEDIA_ROOT: &str = "CLEANIFY_MEDIA_ROOT";
pub const ENV_LOCALE: &str = "CLEANIFY_LOCALE";
pub const ENV_LOG_FORMAT: &str = "CLEANIFY_LOG_FORMAT";

const APP_DIR: &str = "cleanify";
const DB_FILE: &str = "cleanify.db";
const MEDIA_DIR: &str = "media";

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Plain
        }
    }
}

/// 进程级配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub media_root: PathBuf,
    pub locale: Option<String>,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            db_path: get_default_db_path(),
            media_root: get_default_media_root(),
            locale: env_non_empty(ENV_LOCALE),
            log_format: env_non_empty(ENV_LOG_FORMAT)
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
        }
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 应用数据目录（不存在时创建）
fn app_data_dir() -> PathBuf {
    match dirs::data_dir() {
        Some(data_dir) => {
            let dir = data_dir.join(APP_DIR);
            // 创建失败时由后续打开数据库报错
            std::fs::create_dir_all(&dir).ok();
            dir
        }
        None => PathBuf::from("."),
    }
}

/// 默认数据库路径
///
/// 优先级: CLEANIFY_DB_PATH > 用户数据目录/cleanify/cleanify.db > ./cleanify.db
pub fn get_default_db_path() -> String {
    if let Some(path) = env_non_empty(ENV_DB_PATH) {
        return path;
    }
    app_data_dir().join(DB_FILE).to_string_lossy().to_string()
}

/// 默认图片根目录
///
/// 优先级: CLEANIFY_MEDIA_ROOT > 用户数据目录/cleanify/media
pub fn get_default_media_root() -> PathBuf {
    if let Some(path) = env_non_empty(ENV_MEDIA_ROOT) {
        return PathBuf::from(path);
    }
    app_data_dir().join(MEDIA_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("plain"), LogFormat::Plain);
        assert_eq!(LogFormat::parse("yaml"), LogFormat::Plain);
    }
}
