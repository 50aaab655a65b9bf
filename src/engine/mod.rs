// ==========================================
// 校园服务工单系统 - 引擎层
// ==========================================
// 职责: 派单 / 补派 / 评分汇总
// 红线: Engine 不拼 SQL, 所有结果必须记录日志
// ==========================================

pub mod assignment;
pub mod rating;
pub mod selection;

// 重导出核心引擎
pub use assignment::{AssignmentEngine, AssignmentOutcome, SYSTEM_ACTOR};
pub use rating::{average_rating, RatingEngine};
pub use selection::WorkerSelection;
