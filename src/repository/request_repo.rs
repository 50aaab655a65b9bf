// ==========================================
// 校园服务工单系统 - 服务工单数据仓储
// ==========================================
// 对齐: service_request 表 (+ worker_rating 追加写)
// 红线: Repository 不含业务逻辑
// 红线: 状态写入均为条件更新, 条件不满足时返回 false 而不是报错
// ==========================================

mod core;
mod queries;
mod transitions;


pub use self::core::{RequestFilter, RequestPage, RequestRepository, RequestView};
pub use self::transitions::ReviewApplied;
