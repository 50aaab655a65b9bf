// ==========================================
// 校园服务工单系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod action_log_repo;
pub(crate) mod codec;
pub mod error;
pub mod rating_repo;
pub mod request_repo;
pub mod session_repo;
pub mod user_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use rating_repo::RatingRepository;
pub use request_repo::{RequestFilter, RequestPage, RequestRepository, RequestView, ReviewApplied};
pub use session_repo::{SessionRecord, SessionRepository};
pub use user_repo::{UserFilter, UserRepository, UserWithProfile, WorkerCandidate};
