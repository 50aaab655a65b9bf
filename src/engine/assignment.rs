// ==========================================
// 校园服务工单系统 - 派单引擎
// ==========================================
// 职责: 自动派单 / 空闲维修工补派 / 忙碌标记校正
// 红线: Engine 不拼 SQL, 状态写入走仓储的条件更新
// 红线: 每个派单结果都要写 action_log
// ==========================================

use crate::config::ConfigManager;
use crate::db::now_utc;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::types::{Category, RequestStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::engine::selection::WorkerSelection;
use crate::repository::{ActionLogRepository, RequestRepository, UserRepository, WorkerCandidate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

/// 自动派单操作人
pub const SYSTEM_ACTOR: &str = "system";

/// 派单结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentOutcome {
    /// 工单不是 Pending, 未做任何修改
    Skipped {
        request_id: i64,
        status: RequestStatus,
    },
    /// 无空闲维修工, 工单保持 Pending
    NoWorkerAvailable {
        request_id: i64,
        category: Category,
    },
    Assigned {
        request_id: i64,
        worker_id: i64,
        worker_username: String,
    },
}

impl AssignmentOutcome {
    pub fn request_id(&self) -> i64 {
        match self {
            AssignmentOutcome::Skipped { request_id, .. }
            | AssignmentOutcome::NoWorkerAvailable { request_id, .. }
            | AssignmentOutcome::Assigned { request_id, .. } => *request_id,
        }
    }

    pub fn assigned_worker(&self) -> Option<(i64, &str)> {
        match self {
            AssignmentOutcome::Assigned {
                worker_id,
                worker_username,
                ..
            } => Some((*worker_id, worker_username.as_str())),
            _ => None,
        }
    }
}

// ==========================================
// AssignmentEngine - 派单引擎
// ==========================================
pub struct AssignmentEngine {
    user_repo: Arc<UserRepository>,
    request_repo: Arc<RequestRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    config_manager: Arc<ConfigManager>,
}

impl AssignmentEngine {
    pub fn new(
        user_repo: Arc<UserRepository>,
        request_repo: Arc<RequestRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            user_repo,
            request_repo,
            action_log_repo,
            config_manager,
        }
    }

    /// 为待派工单寻找空闲维修工
    ///
    /// # 流程
    /// 1. 工单不是 Pending → Skipped
    /// 2. 候选: 同类别 / 未忙碌 / 账号启用的维修工, 按配置策略排序
    /// 3. 依次尝试条件写入; 被并发写入抢先时换下一位
    /// 4. 无人可派 → NoWorkerAvailable
    #[instrument(skip(self))]
    pub fn assign_request(&self, request_id: i64) -> RepositoryResult<AssignmentOutcome> {
        let request = self
            .request_repo
            .find_by_id(request_id)?
            .ok_or_else(|| RepositoryError::not_found("ServiceRequest", request_id))?;

        if request.status != RequestStatus::Pending {
            tracing::debug!(request_id, status = %request.status, "工单非待派状态，跳过派单");
            return Ok(AssignmentOutcome::Skipped {
                request_id,
                status: request.status,
            });
        }

        let selection = self.config_manager.get_worker_selection()?;
        let candidates = selection.order(self.user_repo.list_free_workers(request.category)?);
        self.assign_to_candidates(request_id, request.category, selection, candidates)
    }

    /// 依次尝试候选维修工（已按策略排序）
    ///
    /// 候选列表可能已过期: 条件写入失败时, 工单仍 Pending 说明该维修工已忙碌,
    /// 换下一位; 工单已离开 Pending 则返回 Skipped
    pub fn assign_to_candidates(
        &self,
        request_id: i64,
        category: Category,
        selection: WorkerSelection,
        candidates: Vec<WorkerCandidate>,
    ) -> RepositoryResult<AssignmentOutcome> {
        let candidate_count = candidates.len();

        for candidate in candidates {
            if self
                .request_repo
                .assign_to_worker(request_id, candidate.user_id, now_utc())?
            {
                tracing::info!(
                    request_id,
                    worker_id = candidate.user_id,
                    worker = %candidate.username,
                    %category,
                    %selection,
                    "工单已自动派单"
                );
                self.action_log_repo.insert(
                    &ActionLog::new(ActionType::AutoAssign, SYSTEM_ACTOR)
                        .with_request(request_id)
                        .with_target_user(candidate.user_id)
                        .with_payload(json!({
                            "category": category.to_db_str(),
                            "selection": selection.to_db_str(),
                            "candidates": candidate_count,
                        })),
                )?;
                return Ok(AssignmentOutcome::Assigned {
                    request_id,
                    worker_id: candidate.user_id,
                    worker_username: candidate.username,
                });
            }

            let status = self
                .request_repo
                .find_by_id(request_id)?
                .map(|r| r.status)
                .ok_or_else(|| RepositoryError::not_found("ServiceRequest", request_id))?;
            if status != RequestStatus::Pending {
                tracing::debug!(request_id, %status, "派单过程中工单状态已变化");
                return Ok(AssignmentOutcome::Skipped { request_id, status });
            }
            tracing::debug!(request_id, worker_id = candidate.user_id, "候选维修工已忙碌，尝试下一位");
        }

        tracing::info!(request_id, %category, "无空闲维修工，工单保持待派");
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::NoWorkerFree, SYSTEM_ACTOR)
                .with_request(request_id)
                .with_payload(json!({ "category": category.to_db_str() })),
        )?;
        Ok(AssignmentOutcome::NoWorkerAvailable {
            request_id,
            category,
        })
    }

    /// 维修工空闲后补派其类别最早的待派工单
    ///
    /// # 返回
    /// - `None`: 不是维修工 / 忙碌 / 无类别 / 无待派工单
    #[instrument(skip(self))]
    pub fn rebalance_for_worker(&self, worker_id: i64) -> RepositoryResult<Option<AssignmentOutcome>> {
        let profile = match self.user_repo.find_profile(worker_id)? {
            Some(p) if p.is_worker() => p,
            Some(_) => {
                tracing::warn!(worker_id, "补派请求的用户不是维修工");
                return Ok(None);
            }
            None => {
                tracing::warn!(worker_id, "补派请求的用户不存在");
                return Ok(None);
            }
        };

        if profile.is_busy {
            tracing::debug!(worker_id, "维修工忙碌，不补派");
            return Ok(None);
        }

        let Some(category) = profile.category else {
            tracing::warn!(worker_id, "维修工未设置类别，不补派");
            return Ok(None);
        };

        match self.request_repo.find_oldest_pending(category)? {
            Some(request) => {
                tracing::info!(worker_id, request_id = request.request_id, "补派最早待派工单");
                Ok(Some(self.assign_request(request.request_id)?))
            }
            None => {
                tracing::debug!(worker_id, %category, "无待派工单");
                Ok(None)
            }
        }
    }

    /// 按是否存在 Assigned 工单校正忙碌标记
    ///
    /// # 返回
    /// 校正后的 is_busy
    #[instrument(skip(self))]
    pub fn reconcile_busy(&self, worker_id: i64) -> RepositoryResult<bool> {
        let profile = self
            .user_repo
            .find_profile(worker_id)?
            .ok_or_else(|| RepositoryError::not_found("UserProfile", worker_id))?;

        let busy = profile.is_worker() && self.request_repo.has_assigned(worker_id)?;
        if busy != profile.is_busy {
            self.user_repo.set_busy(worker_id, busy)?;
            tracing::info!(worker_id, from = profile.is_busy, to = busy, "忙碌标记已校正");
        }
        Ok(busy)
    }
}
