// ==========================================
// 校园服务工单系统 - 工单领域模型
// ==========================================
// 职责: 服务工单 (ServiceRequest) 与评分记录 (RatingRecord)
// 对齐: service_request / worker_rating 表
// ==========================================

use crate::domain::types::{Category, Rating, RequestStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// ServiceRequest - 服务工单
// ==========================================
// 红线: assigned_worker_id 与 assigned_at 同时存在或同时为空
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    // ===== 主键 =====
    pub request_id: i64,
    pub requestee_id: i64,

    // ===== 报修内容 =====
    pub category: Category,
    pub location: String,
    pub description: Option<String>,
    pub request_image: String,            // 相对 media_root 的路径
    pub completion_image: Option<String>, // 完工照片

    // ===== 状态 =====
    pub status: RequestStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,

    // ===== 派单 =====
    pub assigned_worker_id: Option<i64>,
    pub assigned_at: Option<NaiveDateTime>,

    // ===== 确认与评分 =====
    pub is_approved_by_requestee: bool,
    pub worker_rating: Option<Rating>,
    pub approved_at: Option<NaiveDateTime>,
}

impl ServiceRequest {
    pub fn is_assigned_to(&self, worker_id: i64) -> bool {
        self.assigned_worker_id == Some(worker_id)
    }

    /// 一行摘要（用于日志）
    pub fn summary(&self) -> String {
        let worker = self
            .assigned_worker_id
            .map(|w| format!(", worker={}", w))
            .unwrap_or_default();
        let rating = self
            .worker_rating
            .map(|r| format!(", rated={}", r.value()))
            .unwrap_or_default();
        format!(
            "ID:{} [{}] {}{}{}",
            self.request_id, self.category, self.status, worker, rating
        )
    }
}

// ==========================================
// NewServiceRequest - 待创建工单
// ==========================================
#[derive(Debug, Clone)]
pub struct NewServiceRequest {
    pub requestee_id: i64,
    pub category: Category,
    pub location: String,
    pub description: Option<String>,
    pub request_image: String,
}

// ==========================================
// ReviewDecision - 报修人确认结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn from_approved(approved: bool) -> Self {
        if approved {
            ReviewDecision::Approve
        } else {
            ReviewDecision::Reject
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, ReviewDecision::Approve)
    }
}

// ==========================================
// RatingRecord - 评分记录
// ==========================================
// 每次确认/驳回都会追加一条; 平均分基于全部历史记录计算
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingRecord {
    pub rating_id: i64,
    pub request_id: i64,
    pub worker_id: i64,
    pub requestee_id: i64,
    pub rating: Rating,
    pub approved: bool,
    pub created_at: NaiveDateTime,
}
