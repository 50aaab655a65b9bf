// ==========================================
// 校园服务工单系统 - 维修工 API
// ==========================================
// 职责: 维修工工作台 / 提交完工照片
// 红线: 完工后立即为该维修工补派下一张待派工单
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::error::{media_error, ApiError, ApiResult};
use crate::auth::Session;
use crate::config::ConfigManager;
use crate::db::now_utc;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::types::{Category, RequestStatus};
use crate::engine::{AssignmentEngine, AssignmentOutcome};
use crate::i18n::{t, t_with_args};
use crate::media::{MediaFolder, MediaStore};
use crate::repository::{ActionLogRepository, RequestRepository, RequestView, UserRepository};

/// 维修工工作台
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerDashboard {
    pub category: Option<Category>,
    pub is_busy: bool,
    pub average_rating: Option<f64>,
    /// "4.50 / 5.00" 或未评分提示
    pub rating_display: String,
    pub current_task: Option<RequestView>,
    /// 最近完成的工单（确认时间倒序）
    pub completed: Vec<RequestView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteTaskResult {
    pub request: RequestView,
    /// 完工后的补派结果
    pub next_task: Option<AssignmentOutcome>,
    pub message: String,
}

// ==========================================
// WorkerApi - 维修工 API
// ==========================================
pub struct WorkerApi {
    user_repo: Arc<UserRepository>,
    request_repo: Arc<RequestRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    assignment_engine: Arc<AssignmentEngine>,
    media_store: Arc<MediaStore>,
    config_manager: Arc<ConfigManager>,
}

impl WorkerApi {
    pub fn new(
        user_repo: Arc<UserRepository>,
        request_repo: Arc<RequestRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        assignment_engine: Arc<AssignmentEngine>,
        media_store: Arc<MediaStore>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            user_repo,
            request_repo,
            action_log_repo,
            assignment_engine,
            media_store,
            config_manager,
        }
    }

    /// 维修工工作台
    ///
    /// 打开工作台时先校正忙碌标记
    pub fn dashboard(&self, session: &Session) -> ApiResult<WorkerDashboard> {
        session.require_worker()?;

        let is_busy = self.assignment_engine.reconcile_busy(session.user_id)?;
        let profile = self
            .user_repo
            .find_profile(session.user_id)?
            .ok_or_else(|| ApiError::NotFound(format!("用户档案(id={})不存在", session.user_id)))?;

        let history_limit = self.config_manager.get_worker_history_limit()?;
        let current_task = self.request_repo.find_current_task(session.user_id)?;
        let completed = self
            .request_repo
            .list_completed_by_worker(session.user_id, history_limit)?;

        Ok(WorkerDashboard {
            category: profile.category,
            is_busy,
            average_rating: profile.average_rating,
            rating_display: profile
                .rating_display()
                .unwrap_or_else(|| t("common.not_rated")),
            current_task,
            completed,
        })
    }

    /// 提交完工照片: Assigned → Pending Approval
    pub fn complete_task(
        &self,
        session: &Session,
        request_id: i64,
        image: &[u8],
    ) -> ApiResult<CompleteTaskResult> {
        session.require_worker()?;

        if self
            .request_repo
            .find_for_worker(request_id, session.user_id, RequestStatus::Assigned)?
            .is_none()
        {
            return Err(ApiError::NotFound(t("request.not_found")));
        }

        let max_bytes = self.config_manager.get_max_image_bytes()?;
        let completion_image = self
            .media_store
            .save(MediaFolder::CompletionImages, image, max_bytes)
            .map_err(|e| media_error("completion_image", e))?;

        let submitted = self.request_repo.submit_completion(
            request_id,
            session.user_id,
            &completion_image,
            now_utc(),
        )?;
        if !submitted {
            if let Err(e) = self.media_store.delete(&completion_image) {
                tracing::warn!(path = %completion_image, error = %e, "清理完工照片失败");
            }
            return Err(ApiError::NotFound(t("request.not_found")));
        }

        tracing::info!(request_id, worker = %session.username, "维修工已提交完工");
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::SubmitCompletion, &session.username)
                .with_request(request_id)
                .with_target_user(session.user_id)
                .with_payload(json!({ "completion_image": completion_image })),
        )?;

        let next_task = self.assignment_engine.rebalance_for_worker(session.user_id)?;
        let message = match next_task.as_ref().and_then(|o| {
            o.assigned_worker()
                .filter(|(worker_id, _)| *worker_id == session.user_id)
                .map(|_| o.request_id())
        }) {
            Some(next_id) => format!(
                "{} {}",
                t("task.completed"),
                t_with_args("task.next_assigned", &[("request", &next_id.to_string())])
            ),
            None => t("task.completed"),
        };

        Ok(CompleteTaskResult {
            request: self
                .request_repo
                .find_view(request_id)?
                .ok_or_else(|| ApiError::NotFound(format!("工单(id={})不存在", request_id)))?,
            next_task,
            message,
        })
    }
}
