// ==========================================
// 校园服务工单系统 - 应用层
// ==========================================
// 职责: 组装应用状态, 提供 JSON 命令供 CLI 调用
// ==========================================

pub mod commands;
pub mod state;

// 重导出
pub use crate::config::get_default_db_path;
pub use state::AppState;
