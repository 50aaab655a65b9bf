// ==========================================
// 校园服务工单系统 - 管理员 API
// ==========================================
// 职责: 管理看板 / 人工派单 / 用户档案维护 / 工单检索与导出 / 审计查询
// 红线: 所有接口要求 is_staff; 写操作记录 ActionLog
// 红线: 人工派单允许跨类别, 但必须是空闲且启用的维修工
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::error::{ApiError, ApiResult};
use crate::auth::Session;
use crate::config::ConfigManager;
use crate::db::now_utc;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::types::{Category, RequestStatus, Role};
use crate::domain::user::UserProfile;
use crate::engine::{AssignmentEngine, AssignmentOutcome, RatingEngine};
use crate::i18n::{t, t_with_args};
use crate::repository::{
    ActionLogRepository, RequestRepository, RequestView, SessionRepository, UserFilter,
    UserRepository, UserWithProfile,
};

mod requests;
mod users;

pub use self::requests::CSV_HEADERS;

// ==========================================
// 返回类型
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: RequestStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: i64,
}

/// 管理看板
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminDashboard {
    pub status_counts: Vec<StatusCount>,
    pub total_requests: i64,
    pub pending_by_category: Vec<CategoryCount>,
    pub free_workers: i64,
    pub busy_workers: i64,
    pub recent_pending: Vec<RequestView>,
    pub recent_assigned: Vec<RequestView>,
    pub recent_pending_approval: Vec<RequestView>,
    pub recent_completed: Vec<RequestView>,
}

/// 人工派单下拉选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignableWorker {
    pub user_id: i64,
    pub username: String,
    pub category: Option<Category>,
    pub is_busy: bool,
    /// "username [Category] (Busy|Free)"
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualAssignResult {
    pub request: RequestView,
    pub category_mismatch: bool,
    pub message: String,
}

/// 用户列表行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub role: Role,
    pub category: Option<Category>,
    pub is_busy: bool,
    pub average_rating: Option<f64>,
    pub rating_display: String,
}

impl From<UserWithProfile> for UserSummary {
    fn from(user: UserWithProfile) -> Self {
        let rating_display = user
            .profile
            .rating_display()
            .unwrap_or_else(|| t("common.not_rated"));
        Self {
            user_id: user.account.user_id,
            username: user.account.username,
            email: user.account.email,
            is_active: user.account.is_active,
            is_staff: user.account.is_staff,
            role: user.profile.role,
            category: user.profile.category,
            is_busy: user.profile.is_busy,
            average_rating: user.profile.average_rating,
            rating_display,
        }
    }
}

/// 档案编辑（整体替换）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub role: Role,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub is_busy: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileUpdateResult {
    pub user: UserSummary,
    pub warnings: Vec<String>,
    pub rebalance: Option<AssignmentOutcome>,
    pub message: String,
}

// ==========================================
// AdminApi - 管理员 API
// ==========================================
pub struct AdminApi {
    user_repo: Arc<UserRepository>,
    request_repo: Arc<RequestRepository>,
    session_repo: Arc<SessionRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    assignment_engine: Arc<AssignmentEngine>,
    rating_engine: Arc<RatingEngine>,
    config_manager: Arc<ConfigManager>,
}

impl AdminApi {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_repo: Arc<UserRepository>,
        request_repo: Arc<RequestRepository>,
        session_repo: Arc<SessionRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        assignment_engine: Arc<AssignmentEngine>,
        rating_engine: Arc<RatingEngine>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            user_repo,
            request_repo,
            session_repo,
            action_log_repo,
            assignment_engine,
            rating_engine,
            config_manager,
        }
    }

    // ==========================================
    // 管理看板
    // ==========================================

    pub fn dashboard(&self, session: &Session) -> ApiResult<AdminDashboard> {
        session.require_admin()?;

        let limit = self.config_manager.get_dashboard_recent_limit()?;
        let status_counts: Vec<StatusCount> = self
            .request_repo
            .count_by_status()?
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect();
        let total_requests = status_counts.iter().map(|c| c.count).sum();
        let pending_by_category = self
            .request_repo
            .count_pending_by_category()?
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect();
        let (free_workers, busy_workers) = self.user_repo.count_workers_by_busy()?;

        Ok(AdminDashboard {
            status_counts,
            total_requests,
            pending_by_category,
            free_workers,
            busy_workers,
            recent_pending: self
                .request_repo
                .list_recent_by_status(RequestStatus::Pending, limit)?,
            recent_assigned: self
                .request_repo
                .list_recent_by_status(RequestStatus::Assigned, limit)?,
            recent_pending_approval: self
                .request_repo
                .list_recent_by_status(RequestStatus::PendingApproval, limit)?,
            recent_completed: self
                .request_repo
                .list_recent_by_status(RequestStatus::Completed, limit)?,
        })
    }

    // ==========================================
    // 人工派单
    // ==========================================

    /// 可派单维修工（启用账号, 含忙碌者以便展示）
    pub fn list_assignable_workers(&self, session: &Session) -> ApiResult<Vec<AssignableWorker>> {
        session.require_admin()?;

        let filter = UserFilter {
            role: Some(Role::Worker),
            category: None,
            active_only: true,
        };
        let workers = self
            .user_repo
            .list_users(&filter)?
            .into_iter()
            .map(|u| {
                let category_label = u
                    .profile
                    .category
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let busy_label = if u.profile.is_busy { "Busy" } else { "Free" };
                AssignableWorker {
                    label: format!("{} [{}] ({})", u.account.username, category_label, busy_label),
                    user_id: u.account.user_id,
                    username: u.account.username,
                    category: u.profile.category,
                    is_busy: u.profile.is_busy,
                }
            })
            .collect();
        Ok(workers)
    }

    /// 人工派单
    ///
    /// # 错误
    /// - NotFound: 工单不存在
    /// - InvalidStateTransition: 工单不是 Pending
    /// - InvalidInput: 目标不是启用的维修工
    /// - WorkerBusy: 维修工忙碌
    pub fn manual_assign(
        &self,
        session: &Session,
        request_id: i64,
        worker_id: i64,
    ) -> ApiResult<ManualAssignResult> {
        session.require_admin()?;

        let request = self
            .request_repo
            .find_by_id(request_id)?
            .ok_or_else(|| ApiError::NotFound(format!("工单(id={})不存在", request_id)))?;
        if request.status != RequestStatus::Pending {
            return Err(ApiError::InvalidStateTransition {
                from: request.status.to_string(),
                to: RequestStatus::Assigned.to_string(),
            });
        }

        let worker = match self.user_repo.find_with_profile(worker_id)? {
            Some(u) if u.account.is_active && u.profile.is_worker() => u,
            _ => {
                return Err(ApiError::InvalidInput(format!(
                    "用户(id={})不是可派单的维修工",
                    worker_id
                )))
            }
        };
        let worker_name = worker.account.username.clone();
        if worker.profile.is_busy {
            return Err(ApiError::WorkerBusy(t_with_args(
                "admin.worker_busy",
                &[("worker", &worker_name)],
            )));
        }

        if !self
            .request_repo
            .assign_to_worker(request_id, worker_id, now_utc())?
        {
            // 条件写入失败: 判断是工单还是维修工状态已变化
            let status = self
                .request_repo
                .find_by_id(request_id)?
                .map(|r| r.status)
                .unwrap_or(RequestStatus::Pending);
            if status != RequestStatus::Pending {
                return Err(ApiError::InvalidStateTransition {
                    from: status.to_string(),
                    to: RequestStatus::Assigned.to_string(),
                });
            }
            return Err(ApiError::WorkerBusy(t_with_args(
                "admin.worker_busy",
                &[("worker", &worker_name)],
            )));
        }

        let category_mismatch = worker.profile.category != Some(request.category);
        let worker_category = worker
            .profile
            .category
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        if category_mismatch {
            tracing::warn!(
                request_id,
                worker_id,
                %worker_category,
                category = %request.category,
                "人工派单跨类别"
            );
        }
        tracing::info!(request_id, worker_id, admin = %session.username, "工单已人工派单");

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::ManualAssign, &session.username)
                .with_request(request_id)
                .with_target_user(worker_id)
                .with_payload(json!({
                    "category": request.category.to_db_str(),
                    "worker_category": worker.profile.category.map(|c| c.to_db_str()),
                    "category_mismatch": category_mismatch,
                })),
        )?;

        let mut message = t_with_args(
            "admin.assigned",
            &[("worker", &worker_name), ("request", &request_id.to_string())],
        );
        if category_mismatch {
            message.push(' ');
            message.push_str(&t_with_args(
                "admin.category_mismatch",
                &[
                    ("worker_category", &worker_category),
                    ("category", &request.category.to_string()),
                ],
            ));
        }

        Ok(ManualAssignResult {
            request: self.load_view(request_id)?,
            category_mismatch,
            message,
        })
    }

    fn load_view(&self, request_id: i64) -> ApiResult<RequestView> {
        self.request_repo
            .find_view(request_id)?
            .ok_or_else(|| ApiError::NotFound(format!("工单(id={})不存在", request_id)))
    }

    fn load_user(&self, user_id: i64) -> ApiResult<UserWithProfile> {
        self.user_repo
            .find_with_profile(user_id)?
            .ok_or_else(|| ApiError::NotFound(format!("用户(id={})不存在", user_id)))
    }
}

/// 档案整体替换后规范化
fn apply_profile_update(existing: &UserProfile, update: &ProfileUpdate) -> (UserProfile, bool) {
    let mut profile = UserProfile {
        user_id: existing.user_id,
        role: update.role,
        category: update.category,
        average_rating: existing.average_rating,
        is_busy: update.is_busy,
    };
    let missing_category = profile.normalize();
    (profile, missing_category)
}
