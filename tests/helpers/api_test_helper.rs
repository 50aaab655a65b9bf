// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 提供API层集成测试的通用辅助函数
// ==========================================

#![allow(dead_code)]

#[path = "../test_helpers.rs"]
mod test_helpers;

use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::params;
use tempfile::{NamedTempFile, TempDir};

pub use test_helpers::{jpeg_bytes, png_bytes};

use cleanify::api::{CreateRequestForm, CreateRequestResult, LoginResult};
use cleanify::app::AppState;
use cleanify::auth::{Session, SignupForm};
use cleanify::config::{config_keys, ConfigManager};
use cleanify::domain::{Category, RequestStatus, Role};

/// 测试账号统一密码
pub const TEST_PASSWORD: &str = "Sturdy-Lamp-42";

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// - 使用临时数据库文件与临时图片目录
/// - 派单策略固定为 FIRST_FREE（结果可预测）
/// - 密码哈希迭代次数降低（加快测试）
pub struct ApiTestEnv {
    pub db_path: String,
    pub state: AppState,
    pub config_manager: Arc<ConfigManager>,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
    _media_dir: TempDir,
}

impl ApiTestEnv {
    pub fn new() -> Result<Self, String> {
        cleanify::logging::init_test();

        let (temp_file, db_path) = test_helpers::create_test_db()
            .map_err(|e| format!("创建测试数据库失败: {}", e))?;
        let media_dir = test_helpers::create_media_dir()
            .map_err(|e| format!("创建图片目录失败: {}", e))?;

        let state = AppState::new(db_path.clone(), media_dir.path().to_path_buf())?;
        let config_manager = state.config_manager.clone();
        config_manager
            .set_global_config_value(config_keys::WORKER_SELECTION, "FIRST_FREE")
            .map_err(|e| e.to_string())?;
        config_manager
            .set_global_config_value(config_keys::PASSWORD_HASH_ITERATIONS, "1000")
            .map_err(|e| e.to_string())?;

        Ok(Self {
            db_path,
            state,
            config_manager,
            _temp_file: temp_file,
            _media_dir: media_dir,
        })
    }

    // ==========================================
    // 账号
    // ==========================================

    pub fn signup_form(username: &str, role: Role, category: Option<Category>) -> SignupForm {
        SignupForm {
            username: username.to_string(),
            email: format!("{}@campus.edu", username),
            first_name: String::new(),
            last_name: String::new(),
            password1: TEST_PASSWORD.to_string(),
            password2: TEST_PASSWORD.to_string(),
            role: Some(role),
            category,
        }
    }

    pub fn signup(&self, username: &str, role: Role, category: Option<Category>) -> LoginResult {
        self.state
            .auth_api
            .signup(&Self::signup_form(username, role, category))
            .expect("注册失败")
    }

    pub fn requestee(&self, username: &str) -> Session {
        self.signup(username, Role::Requestee, None).session
    }

    pub fn worker(&self, username: &str, category: Category) -> Session {
        self.signup(username, Role::Worker, Some(category)).session
    }

    pub fn admin(&self, username: &str) -> Session {
        self.state
            .auth_api
            .create_admin(username, &format!("{}@campus.edu", username), TEST_PASSWORD)
            .expect("创建管理员失败");
        self.state
            .auth_api
            .login(username, TEST_PASSWORD)
            .expect("管理员登录失败")
            .session
    }

    // ==========================================
    // 工单
    // ==========================================

    pub fn file_request(&self, session: &Session, category: Category, location: &str) -> CreateRequestResult {
        let form = CreateRequestForm {
            category: Some(category),
            location: location.to_string(),
            description: Some("test".to_string()),
        };
        self.state
            .requestee_api
            .create_request(session, &form, &png_bytes())
            .expect("提交报修失败")
    }

    pub fn complete(&self, worker: &Session, request_id: i64) {
        self.state
            .worker_api
            .complete_task(worker, request_id, &jpeg_bytes())
            .expect("提交完工失败");
    }

    // ==========================================
    // 直接读库（断言用）
    // ==========================================

    pub fn request_status(&self, request_id: i64) -> RequestStatus {
        let conn = self.state.conn.lock().unwrap();
        let raw: String = conn
            .query_row(
                "SELECT status FROM service_request WHERE request_id = ?1",
                params![request_id],
                |row| row.get(0),
            )
            .unwrap();
        RequestStatus::parse(&raw).unwrap()
    }

    pub fn assigned_worker(&self, request_id: i64) -> Option<i64> {
        let conn = self.state.conn.lock().unwrap();
        conn.query_row(
            "SELECT assigned_worker_id FROM service_request WHERE request_id = ?1",
            params![request_id],
            |row| row.get(0),
        )
        .unwrap()
    }

    pub fn completion_image(&self, request_id: i64) -> Option<String> {
        let conn = self.state.conn.lock().unwrap();
        conn.query_row(
            "SELECT completion_image FROM service_request WHERE request_id = ?1",
            params![request_id],
            |row| row.get(0),
        )
        .unwrap()
    }

    pub fn is_busy(&self, user_id: i64) -> bool {
        let conn = self.state.conn.lock().unwrap();
        conn.query_row(
            "SELECT is_busy FROM user_profile WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .unwrap()
    }

    /// 直接改写忙碌标记（模拟过期的候选列表 / 脏数据）
    pub fn set_busy(&self, user_id: i64, busy: bool) {
        let conn = self.state.conn.lock().unwrap();
        conn.execute(
            "UPDATE user_profile SET is_busy = ?2 WHERE user_id = ?1",
            params![user_id, busy],
        )
        .unwrap();
    }

    pub fn average_rating(&self, user_id: i64) -> Option<f64> {
        let conn = self.state.conn.lock().unwrap();
        conn.query_row(
            "SELECT average_rating FROM user_profile WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .unwrap()
    }

    pub fn count_actions(&self, action_type: &str) -> i64 {
        let conn = self.state.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM action_log WHERE action_type = ?1",
            params![action_type],
            |row| row.get(0),
        )
        .unwrap()
    }

    pub fn session_count(&self, user_id: i64) -> i64 {
        let conn = self.state.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM user_session WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .unwrap()
    }

    /// 把会话改为已过期
    pub fn expire_session(&self, token: &str) {
        let conn = self.state.conn.lock().unwrap();
        conn.execute(
            "UPDATE user_session SET expires_at = ?2 WHERE token = ?1",
            params![token, "2000-01-01 00:00:00.000000"],
        )
        .unwrap();
    }

    pub fn media_path(&self, relative: &str) -> PathBuf {
        self.state.media_root.join(relative)
    }
}
