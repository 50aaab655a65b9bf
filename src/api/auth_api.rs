// ==========================================
// 校园服务工单系统 - 账号与会话 API
// ==========================================
// 职责: 注册 / 登录 / 登出 / 会话解析 / 管理员初始化
// 红线: 注册必须记录 ActionLog; 维修工注册后立即补派
// ==========================================

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::error::{ApiError, ApiResult};
use crate::auth::session::generate_token;
use crate::auth::validator::{is_valid_email, is_valid_username, validate_password};
use crate::auth::{hash_password, validate_signup_form, verify_password, DashboardKind, FieldError, Session, SignupForm};
use crate::config::ConfigManager;
use crate::db::now_utc;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::types::Role;
use crate::domain::user::{NewUserAccount, UserAccount, UserProfile};
use crate::engine::{AssignmentEngine, AssignmentOutcome};
use crate::i18n::{t, t_with_args};
use crate::repository::error::RepositoryError;
use crate::repository::{ActionLogRepository, SessionRecord, SessionRepository, UserRepository, UserWithProfile};

/// 登录 / 注册结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResult {
    pub session: Session,
    pub dashboard: DashboardKind,
    pub message: String,
    /// 维修工注册后的补派结果
    pub rebalance: Option<AssignmentOutcome>,
}

// ==========================================
// AuthApi - 账号与会话 API
// ==========================================
pub struct AuthApi {
    user_repo: Arc<UserRepository>,
    session_repo: Arc<SessionRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    config_manager: Arc<ConfigManager>,
    assignment_engine: Arc<AssignmentEngine>,
}

impl AuthApi {
    pub fn new(
        user_repo: Arc<UserRepository>,
        session_repo: Arc<SessionRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        config_manager: Arc<ConfigManager>,
        assignment_engine: Arc<AssignmentEngine>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            action_log_repo,
            config_manager,
            assignment_engine,
        }
    }

    /// 注册并登录
    ///
    /// # 流程
    /// 1. 表单校验 + 用户名/邮箱唯一性
    /// 2. 账号与档案同事务创建
    /// 3. 维修工触发补派
    /// 4. 签发会话
    pub fn signup(&self, form: &SignupForm) -> ApiResult<LoginResult> {
        let min_len = self.config_manager.get_password_min_length()?;
        let mut errors = validate_signup_form(form, min_len);

        let username = form.username.trim();
        let email = form.email.trim();
        if !errors.iter().any(|e| e.field == "username") && self.user_repo.username_exists(username)? {
            errors.push(FieldError::new("username", t("form.username_taken")));
        }
        if !errors.iter().any(|e| e.field == "email") && self.user_repo.email_exists(email)? {
            errors.push(FieldError::new("email", t("form.email_taken")));
        }
        if !errors.is_empty() {
            return Err(ApiError::ValidationError(errors));
        }

        // validate_signup_form 已保证 role 存在
        let role = form
            .role
            .ok_or_else(|| ApiError::field("role", t("form.role_required")))?;
        let category = form.effective_category();

        let iterations = self.config_manager.get_password_hash_iterations()?;
        let account = NewUserAccount {
            username: username.to_string(),
            email: email.to_string(),
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            password_hash: hash_password(&form.password1, iterations)?,
            is_staff: false,
        };

        let user_id = match self.user_repo.create_user(&account, role, category) {
            Ok(id) => id,
            Err(RepositoryError::UniqueConstraintViolation(_)) => {
                return Err(ApiError::field("username", t("form.username_taken")));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(user_id, username, %role, ?category, "新用户注册");
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::Signup, username)
                .with_target_user(user_id)
                .with_payload(json!({
                    "role": role.to_db_str(),
                    "category": category.map(|c| c.to_db_str()),
                })),
        )?;

        let rebalance = if role == Role::Worker {
            self.assignment_engine.rebalance_for_worker(user_id)?
        } else {
            None
        };

        let user = self.load_user(user_id)?;
        let mut result = self.issue_session(&user.account, &user.profile)?;
        result.message = t_with_args("auth.signup_success", &[("username", username)]);
        result.rebalance = rebalance;
        Ok(result)
    }

    /// 登录
    ///
    /// 用户不存在 / 停用 / 密码错误统一返回 InvalidCredentials
    pub fn login(&self, username: &str, password: &str) -> ApiResult<LoginResult> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(ApiError::InvalidCredentials);
        }

        let account = match self.user_repo.find_by_username(username)? {
            Some(a) if a.is_active => a,
            Some(_) => {
                tracing::info!(username, "停用账号尝试登录");
                return Err(ApiError::InvalidCredentials);
            }
            None => return Err(ApiError::InvalidCredentials),
        };

        if !verify_password(password, &account.password_hash)? {
            tracing::info!(username, "密码错误");
            return Err(ApiError::InvalidCredentials);
        }

        let purged = self.session_repo.purge_expired(now_utc())?;
        if purged > 0 {
            tracing::debug!(purged, "已清理过期会话");
        }

        let profile = self
            .user_repo
            .find_profile(account.user_id)?
            .ok_or_else(|| ApiError::NotFound(format!("用户档案(id={})不存在", account.user_id)))?;

        let mut result = self.issue_session(&account, &profile)?;
        result.message = t_with_args("auth.login_success", &[("username", &account.username)]);
        Ok(result)
    }

    /// 登出（令牌不存在时同样成功）
    pub fn logout(&self, token: &str) -> ApiResult<String> {
        if self.session_repo.delete(token.trim())? {
            tracing::info!("会话已注销");
        }
        Ok(t("auth.logout"))
    }

    /// 解析会话令牌
    ///
    /// 过期会话会被删除; 账号停用后会话立即失效
    pub fn authenticate(&self, token: &str) -> ApiResult<Session> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ApiError::Unauthenticated);
        }

        let Some(record) = self.session_repo.find_active(token, now_utc())? else {
            // 可能是过期会话, 顺带删除
            self.session_repo.delete(token)?;
            return Err(ApiError::Unauthenticated);
        };

        let user = match self.user_repo.find_with_profile(record.user_id)? {
            Some(u) if u.account.is_active => u,
            _ => {
                self.session_repo.delete(token)?;
                return Err(ApiError::Unauthenticated);
            }
        };

        Ok(Session {
            token: record.token,
            user_id: user.account.user_id,
            username: user.account.username,
            role: user.profile.role,
            is_staff: user.account.is_staff,
            expires_at: record.expires_at,
        })
    }

    /// 当前用户账号 + 档案
    pub fn whoami(&self, token: &str) -> ApiResult<UserWithProfile> {
        let session = self.authenticate(token)?;
        self.load_user(session.user_id)
    }

    /// 创建管理员账号（命令行初始化）
    pub fn create_admin(&self, username: &str, email: &str, password: &str) -> ApiResult<i64> {
        let username = username.trim();
        let email = email.trim();

        let mut errors = Vec::new();
        if !is_valid_username(username) {
            errors.push(FieldError::new("username", t("form.username_invalid")));
        } else if self.user_repo.username_exists(username)? {
            errors.push(FieldError::new("username", t("form.username_taken")));
        }
        if !is_valid_email(email) {
            errors.push(FieldError::new("email", t("form.email_invalid")));
        } else if self.user_repo.email_exists(email)? {
            errors.push(FieldError::new("email", t("form.email_taken")));
        }
        let min_len = self.config_manager.get_password_min_length()?;
        for message in validate_password(password, min_len, &[("username", username), ("email address", email)]) {
            errors.push(FieldError::new("password", message));
        }
        if !errors.is_empty() {
            return Err(ApiError::ValidationError(errors));
        }

        let iterations = self.config_manager.get_password_hash_iterations()?;
        let account = NewUserAccount {
            username: username.to_string(),
            email: email.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: hash_password(password, iterations)?,
            is_staff: true,
        };
        let user_id = self.user_repo.create_user(&account, Role::Requestee, None)?;

        tracing::info!(user_id, username, "管理员账号已创建");
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::Signup, username)
                .with_target_user(user_id)
                .with_payload(json!({ "role": Role::Requestee.to_db_str(), "is_staff": true })),
        )?;
        Ok(user_id)
    }

    // ==========================================
    // 内部方法
    // ==========================================

    fn load_user(&self, user_id: i64) -> ApiResult<UserWithProfile> {
        self.user_repo
            .find_with_profile(user_id)?
            .ok_or_else(|| ApiError::NotFound(format!("用户(id={})不存在", user_id)))
    }

    fn issue_session(&self, account: &UserAccount, profile: &UserProfile) -> ApiResult<LoginResult> {
        let now = now_utc();
        let ttl_hours = self.config_manager.get_session_ttl_hours()?;
        let expires_at = Duration::try_hours(ttl_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| ApiError::InvalidInput(format!("会话有效期越界: {} 小时", ttl_hours)))?;
        let record = SessionRecord {
            token: generate_token(),
            user_id: account.user_id,
            created_at: now,
            expires_at,
        };
        self.session_repo.insert(&record)?;
        self.user_repo.touch_last_login(account.user_id, now)?;

        let session = Session {
            token: record.token,
            user_id: account.user_id,
            username: account.username.clone(),
            role: profile.role,
            is_staff: account.is_staff,
            expires_at: record.expires_at,
        };
        let dashboard = session.dashboard_redirect();
        Ok(LoginResult {
            session,
            dashboard,
            message: String::new(),
            rebalance: None,
        })
    }
}
