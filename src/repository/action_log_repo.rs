// ==========================================
// 校园服务工单系统 - 操作日志数据仓储
// ==========================================
// 对齐: action_log 表
// 红线: 所有写入必须记录
// ==========================================

mod core;
mod queries;


pub(crate) use self::core::insert_with_conn;
pub use self::core::ActionLogRepository;
