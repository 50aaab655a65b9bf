// ==========================================
// 校园服务工单系统 - 评分汇总引擎
// ==========================================
// 职责: 维修工平均分 = 全部历史评分的均值 (两位小数)
// 输入: worker_rating 表
// 输出: 更新 user_profile.average_rating
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{RatingRepository, UserRepository};
use std::sync::Arc;
use tracing::instrument;

/// 平均分（四舍五入到两位小数）, 无评分时为 None
pub fn average_rating(values: &[u8]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: u32 = values.iter().map(|v| u32::from(*v)).sum();
    let mean = f64::from(sum) / values.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}

pub struct RatingEngine {
    rating_repo: Arc<RatingRepository>,
    user_repo: Arc<UserRepository>,
}

impl RatingEngine {
    pub fn new(rating_repo: Arc<RatingRepository>, user_repo: Arc<UserRepository>) -> Self {
        Self {
            rating_repo,
            user_repo,
        }
    }

    /// 重算维修工平均分并写回档案
    ///
    /// 非维修工档案的平均分始终为空
    #[instrument(skip(self))]
    pub fn refresh_worker_average(&self, worker_id: i64) -> RepositoryResult<Option<f64>> {
        let profile = self
            .user_repo
            .find_profile(worker_id)?
            .ok_or_else(|| RepositoryError::not_found("UserProfile", worker_id))?;

        let average = if profile.is_worker() {
            let values: Vec<u8> = self
                .rating_repo
                .list_by_worker(worker_id)?
                .iter()
                .map(|record| record.rating.value())
                .collect();
            average_rating(&values)
        } else {
            None
        };

        if average != profile.average_rating {
            self.user_repo.set_average_rating(worker_id, average)?;
            tracing::info!(worker_id, ?average, "维修工平均分已更新");
        }
        Ok(average)
    }
}
