// ==========================================
// 校园服务工单系统 - 应用状态
// ==========================================
// 职责: 打开数据库, 组装仓储 / 引擎 / API 实例
// 所有仓储共用一条连接 (Arc<Mutex<Connection>>)
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::api::{AdminApi, AuthApi, ConfigApi, RequesteeApi, WorkerApi};
use crate::config::{AppConfig, ConfigManager};
use crate::db::{open_initialized_connection, SharedConnection};
use crate::engine::{AssignmentEngine, RatingEngine};
use crate::media::MediaStore;
use crate::repository::{
    ActionLogRepository, RatingRepository, RequestRepository, SessionRepository, UserRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 图片根目录
    pub media_root: PathBuf,

    /// 账号与会话API
    pub auth_api: Arc<AuthApi>,

    /// 报修人API
    pub requestee_api: Arc<RequesteeApi>,

    /// 维修工API
    pub worker_api: Arc<WorkerApi>,

    /// 管理员API
    pub admin_api: Arc<AdminApi>,

    /// 配置管理API
    pub config_api: Arc<ConfigApi>,

    /// 配置管理器（命令层读取上传上限）
    pub config_manager: Arc<ConfigManager>,

    /// 派单引擎（维护命令与测试直接调用）
    pub assignment_engine: Arc<AssignmentEngine>,

    /// 共享连接（测试与维护命令直接访问）
    pub conn: SharedConnection,
}

impl AppState {
    /// 按进程配置创建
    pub fn from_config(config: &AppConfig) -> Result<Self, String> {
        Self::new(config.db_path.clone(), config.media_root.clone())
    }

    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并确保 schema 就绪
    /// 2. 初始化所有Repository
    /// 3. 初始化所有Engine
    /// 4. 创建所有API实例
    pub fn new(db_path: String, media_root: PathBuf) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, media_root = %media_root.display(), "初始化AppState");

        let mut conn = open_initialized_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        crate::perf::install_statement_counter(&mut conn);
        let conn: SharedConnection = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let user_repo = Arc::new(UserRepository::new(conn.clone()));
        let request_repo = Arc::new(RequestRepository::new(conn.clone()));
        let rating_repo = Arc::new(RatingRepository::new(conn.clone()));
        let session_repo = Arc::new(SessionRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        let media_store = Arc::new(MediaStore::new(media_root.clone()));

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let assignment_engine = Arc::new(AssignmentEngine::new(
            user_repo.clone(),
            request_repo.clone(),
            action_log_repo.clone(),
            config_manager.clone(),
        ));
        let rating_engine = Arc::new(RatingEngine::new(rating_repo, user_repo.clone()));

        // ==========================================
        // 初始化API层
        // ==========================================
        let auth_api = Arc::new(AuthApi::new(
            user_repo.clone(),
            session_repo.clone(),
            action_log_repo.clone(),
            config_manager.clone(),
            assignment_engine.clone(),
        ));

        let requestee_api = Arc::new(RequesteeApi::new(
            request_repo.clone(),
            action_log_repo.clone(),
            assignment_engine.clone(),
            rating_engine.clone(),
            media_store.clone(),
            config_manager.clone(),
        ));

        let worker_api = Arc::new(WorkerApi::new(
            user_repo.clone(),
            request_repo.clone(),
            action_log_repo.clone(),
            assignment_engine.clone(),
            media_store,
            config_manager.clone(),
        ));

        let admin_api = Arc::new(AdminApi::new(
            user_repo,
            request_repo,
            session_repo,
            action_log_repo.clone(),
            assignment_engine.clone(),
            rating_engine,
            config_manager.clone(),
        ));

        let config_api = Arc::new(ConfigApi::new(config_manager.clone(), action_log_repo));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            media_root,
            auth_api,
            requestee_api,
            worker_api,
            admin_api,
            config_api,
            config_manager,
            assignment_engine,
            conn,
        })
    }
}
