// ==========================================
// 校园服务工单系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、状态规则
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod request;
pub mod types;
pub mod user;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use request::{NewServiceRequest, RatingRecord, ReviewDecision, ServiceRequest};
pub use types::{Category, Rating, RequestStatus, Role};
pub use user::{NewUserAccount, UserAccount, UserProfile};
