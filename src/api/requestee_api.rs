// ==========================================
// 校园服务工单系统 - 报修人 API
// ==========================================
// 职责: 报修人工作台 / 提交报修 / 确认或驳回完工
// 红线: 报修人只能操作自己的工单; 所有写操作记录 ActionLog
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::error::{media_error, ApiError, ApiResult};
use crate::auth::{FieldError, Session};
use crate::config::ConfigManager;
use crate::db::now_utc;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::request::{NewServiceRequest, ReviewDecision};
use crate::domain::types::{Category, Rating, RequestStatus};
use crate::engine::{AssignmentEngine, AssignmentOutcome, RatingEngine};
use crate::i18n::{t, t_with_args};
use crate::media::{validate_image, MediaFolder, MediaStore};
use crate::repository::{ActionLogRepository, RequestRepository, RequestView};

/// 地点字段最大长度
pub const LOCATION_MAX_LEN: usize = 255;

/// 报修表单
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRequestForm {
    pub category: Option<Category>,
    pub location: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// 报修人工作台
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequesteeDashboard {
    /// 待确认工单（需要报修人操作）
    pub pending_approval: Vec<RequestView>,
    /// 其余工单（按更新时间倒序）
    pub other: Vec<RequestView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequestResult {
    pub request: RequestView,
    pub outcome: AssignmentOutcome,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResult {
    pub request: RequestView,
    pub decision: ReviewDecision,
    pub worker_average: Option<f64>,
    /// 驳回后的重新派单结果
    pub reassignment: Option<AssignmentOutcome>,
    pub message: String,
}

// ==========================================
// RequesteeApi - 报修人 API
// ==========================================
pub struct RequesteeApi {
    request_repo: Arc<RequestRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    assignment_engine: Arc<AssignmentEngine>,
    rating_engine: Arc<RatingEngine>,
    media_store: Arc<MediaStore>,
    config_manager: Arc<ConfigManager>,
}

impl RequesteeApi {
    pub fn new(
        request_repo: Arc<RequestRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        assignment_engine: Arc<AssignmentEngine>,
        rating_engine: Arc<RatingEngine>,
        media_store: Arc<MediaStore>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            request_repo,
            action_log_repo,
            assignment_engine,
            rating_engine,
            media_store,
            config_manager,
        }
    }

    /// 报修人工作台
    pub fn dashboard(&self, session: &Session) -> ApiResult<RequesteeDashboard> {
        session.require_requestee()?;

        let (pending_approval, other) = self
            .request_repo
            .list_by_requestee(session.user_id)?
            .into_iter()
            .partition(|v| v.request.status == RequestStatus::PendingApproval);

        Ok(RequesteeDashboard {
            pending_approval,
            other,
        })
    }

    /// 提交报修并立即尝试派单
    ///
    /// # 流程
    /// 1. 表单与图片校验（一次返回全部字段错误）
    /// 2. 保存图片 → 写入工单 (Pending)
    /// 3. 自动派单
    pub fn create_request(
        &self,
        session: &Session,
        form: &CreateRequestForm,
        image: &[u8],
    ) -> ApiResult<CreateRequestResult> {
        session.require_requestee()?;

        let max_bytes = self.config_manager.get_max_image_bytes()?;
        let mut errors = Vec::new();

        let location = form.location.trim();
        if location.is_empty() {
            errors.push(FieldError::new("location", t("form.location_required")));
        } else if location.chars().count() > LOCATION_MAX_LEN {
            errors.push(FieldError::new("location", t("form.location_too_long")));
        }
        if form.category.is_none() {
            errors.push(FieldError::new("category", t("form.required")));
        }
        if let Err(e) = validate_image(image, max_bytes) {
            if let ApiError::ValidationError(mut field_errors) = media_error("request_image", e) {
                errors.append(&mut field_errors);
            }
        }
        let Some(category) = form.category.filter(|_| errors.is_empty()) else {
            return Err(ApiError::ValidationError(errors));
        };

        let request_image = self
            .media_store
            .save(MediaFolder::RequestImages, image, max_bytes)
            .map_err(|e| media_error("request_image", e))?;

        let new_request = NewServiceRequest {
            requestee_id: session.user_id,
            category,
            location: location.to_string(),
            description: form
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            request_image: request_image.clone(),
        };

        let request_id = match self.request_repo.insert(&new_request) {
            Ok(id) => id,
            Err(e) => {
                // 入库失败时清理已保存的图片
                if let Err(cleanup) = self.media_store.delete(&request_image) {
                    tracing::warn!(path = %request_image, error = %cleanup, "清理报修图片失败");
                }
                return Err(e.into());
            }
        };

        tracing::info!(request_id, requestee = %session.username, %category, "新报修已提交");
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::CreateRequest, &session.username)
                .with_request(request_id)
                .with_target_user(session.user_id)
                .with_payload(json!({
                    "category": category.to_db_str(),
                    "location": location,
                })),
        )?;

        let outcome = self.assignment_engine.assign_request(request_id)?;
        let message = match outcome.assigned_worker() {
            Some((_, worker)) => t_with_args("request.assigned", &[("worker", worker)]),
            None => t("request.pending_busy"),
        };

        Ok(CreateRequestResult {
            request: self.load_view(request_id)?,
            outcome,
            message,
        })
    }

    /// 确认或驳回完工
    ///
    /// # 参数
    /// - rating: 1-5, 两种结果都必填
    ///
    /// # 流程
    /// 1. 工单必须属于该报修人且为 Pending Approval
    /// 2. 写入评分记录与状态
    /// 3. 重算维修工平均分; 驳回时删除完工照片并重新派单
    pub fn review_request(
        &self,
        session: &Session,
        request_id: i64,
        approve: bool,
        rating: Option<u8>,
    ) -> ApiResult<ReviewResult> {
        session.require_requestee()?;

        if self
            .request_repo
            .find_for_requestee(request_id, session.user_id, RequestStatus::PendingApproval)?
            .is_none()
        {
            return Err(ApiError::NotFound(t("request.not_found")));
        }

        let rating = rating
            .and_then(Rating::new)
            .ok_or_else(|| ApiError::field("worker_rating", t("form.rating_required")))?;
        let decision = ReviewDecision::from_approved(approve);

        let applied = self
            .request_repo
            .apply_review(request_id, session.user_id, decision, rating, now_utc())?
            .ok_or_else(|| ApiError::NotFound(t("request.not_found")))?;

        if let Some(path) = &applied.removed_completion_image {
            match self.media_store.delete(path) {
                Ok(_) => {}
                Err(e) => tracing::warn!(request_id, path = %path, error = %e, "删除完工照片失败"),
            }
        }

        let worker_average = match applied.worker_id {
            Some(worker_id) => self.rating_engine.refresh_worker_average(worker_id)?,
            None => None,
        };

        let action_type = if decision.is_approved() {
            ActionType::Approve
        } else {
            ActionType::Reject
        };
        let mut log = ActionLog::new(action_type, &session.username)
            .with_request(request_id)
            .with_payload(json!({
                "rating": rating.value(),
                "rating_id": applied.rating_id,
                "worker_average": worker_average,
            }));
        if let Some(worker_id) = applied.worker_id {
            log = log.with_target_user(worker_id);
        }
        self.action_log_repo.insert(&log)?;

        tracing::info!(
            request_id,
            ?decision,
            rating = rating.value(),
            worker_id = ?applied.worker_id,
            "报修人已处理完工确认"
        );

        let (reassignment, message) = match decision {
            ReviewDecision::Approve => (None, t("request.approved")),
            ReviewDecision::Reject => {
                let outcome = self.assignment_engine.assign_request(request_id)?;
                let message = match outcome.assigned_worker() {
                    Some((_, worker)) => {
                        t_with_args("request.rejected_reassigned", &[("worker", worker)])
                    }
                    None => t("request.rejected_pending"),
                };
                (Some(outcome), message)
            }
        };

        Ok(ReviewResult {
            request: self.load_view(request_id)?,
            decision,
            worker_average,
            reassignment,
            message,
        })
    }

    fn load_view(&self, request_id: i64) -> ApiResult<RequestView> {
        self.request_repo
            .find_view(request_id)?
            .ok_or_else(|| ApiError::NotFound(format!("工单(id={})不存在", request_id)))
    }
}
