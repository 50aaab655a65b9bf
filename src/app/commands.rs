// ==========================================
// 校园服务工单系统 - 命令层（按域拆分）
// ==========================================
// 职责: 解析会话令牌, 调用 API, 结果序列化为 JSON 字符串
// 错误统一为 ErrorResponse JSON
// ==========================================

mod admin;
mod auth;
mod common;
mod config;
mod requestee;
mod worker;

pub use admin::*;
pub use auth::*;
pub use common::ErrorResponse;
pub use config::*;
pub use requestee::*;
pub use worker::*;
