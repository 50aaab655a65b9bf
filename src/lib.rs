// ==========================================
// 校园服务工单系统 - 核心库
// ==========================================
// 角色: 报修人提交工单 → 自动派给同类别空闲维修工 → 维修工上传完工照片
//       → 报修人确认/驳回并评分; 管理员人工派单与查看看板
// 技术栈: Rust + SQLite
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 派单 / 补派 / 评分汇总
pub mod engine;

// 认证层 - 密码 / 表单 / 会话
pub mod auth;

// 图片存储
pub mod media;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// SQL 性能统计
pub mod perf;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装与 JSON 命令
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Category, Rating, RequestStatus, Role};

// 领域实体
pub use domain::{ActionLog, ActionType, ServiceRequest, UserAccount, UserProfile};

// 引擎
pub use engine::{AssignmentEngine, AssignmentOutcome, RatingEngine, WorkerSelection};

// API
pub use api::{AdminApi, AuthApi, ConfigApi, RequesteeApi, WorkerApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "Cleanify";
