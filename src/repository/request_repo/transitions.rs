use super::core::RequestRepository;
use crate::db::format_ts;
use crate::domain::request::ReviewDecision;
use crate::domain::types::{Rating, RequestStatus, Role};
use crate::repository::error::RepositoryResult;
use crate::repository::rating_repo::insert_rating_with_conn;
use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension};

/// 确认/驳回写入结果
#[derive(Debug, Clone)]
pub struct ReviewApplied {
    pub decision: ReviewDecision,
    /// 完工时的维修工（驳回后工单上已清空）
    pub worker_id: Option<i64>,
    pub rating_id: Option<i64>,
    /// 驳回时被清除的完工照片路径, 由调用方删除文件
    pub removed_completion_image: Option<String>,
}

impl RequestRepository {
    // ==========================================
    // 状态写入（单事务, 条件更新）
    // ==========================================

    /// 派单: Pending → Assigned, 维修工 is_busy = true
    ///
    /// # 返回
    /// - `Ok(true)`: 写入成功
    /// - `Ok(false)`: 工单已不是 Pending, 或维修工已忙碌/不是维修工（事务回滚）
    pub fn assign_to_worker(
        &self,
        request_id: i64,
        worker_id: i64,
        at: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let ts = format_ts(&at);

        let request_rows = tx.execute(
            r#"
            UPDATE service_request
            SET status = ?2, assigned_worker_id = ?3, assigned_at = ?4, updated_at = ?4
            WHERE request_id = ?1 AND status = ?5
            "#,
            params![
                request_id,
                RequestStatus::Assigned.to_db_str(),
                worker_id,
                ts,
                RequestStatus::Pending.to_db_str(),
            ],
        )?;
        if request_rows == 0 {
            return Ok(false);
        }

        let worker_rows = tx.execute(
            "UPDATE user_profile SET is_busy = 1 WHERE user_id = ?1 AND role = ?2 AND is_busy = 0",
            params![worker_id, Role::Worker.to_db_str()],
        )?;
        if worker_rows == 0 {
            return Ok(false);
        }

        tx.commit()?;
        Ok(true)
    }

    /// 提交完工: Assigned → Pending Approval
    ///
    /// 维修工 is_busy 按剩余 Assigned 工单重新计算
    ///
    /// # 返回
    /// - `Ok(false)`: 工单不是该维修工的 Assigned 工单
    pub fn submit_completion(
        &self,
        request_id: i64,
        worker_id: i64,
        completion_image: &str,
        at: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            r#"
            UPDATE service_request
            SET status = ?3, completion_image = ?4, updated_at = ?5
            WHERE request_id = ?1 AND assigned_worker_id = ?2 AND status = ?6
            "#,
            params![
                request_id,
                worker_id,
                RequestStatus::PendingApproval.to_db_str(),
                completion_image,
                format_ts(&at),
                RequestStatus::Assigned.to_db_str(),
            ],
        )?;
        if rows == 0 {
            return Ok(false);
        }

        tx.execute(
            r#"
            UPDATE user_profile
            SET is_busy = EXISTS(
                SELECT 1 FROM service_request
                WHERE assigned_worker_id = ?1 AND status = ?2
            )
            WHERE user_id = ?1
            "#,
            params![worker_id, RequestStatus::Assigned.to_db_str()],
        )?;

        tx.commit()?;
        Ok(true)
    }

    /// 报修人确认/驳回
    ///
    /// - 两种结果均追加评分记录（有维修工时）
    /// - 确认: Completed, approved_at = at
    /// - 驳回: Pending, 清空维修工 / assigned_at / approved_at / 完工照片
    ///
    /// # 返回
    /// - `Ok(None)`: 工单不属于该报修人或不是 Pending Approval
    pub fn apply_review(
        &self,
        request_id: i64,
        requestee_id: i64,
        decision: ReviewDecision,
        rating: Rating,
        at: NaiveDateTime,
    ) -> RepositoryResult<Option<ReviewApplied>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let ts = format_ts(&at);

        let current: Option<(Option<i64>, Option<String>)> = tx
            .query_row(
                r#"
                SELECT assigned_worker_id, completion_image
                FROM service_request
                WHERE request_id = ?1 AND requestee_id = ?2 AND status = ?3
                "#,
                params![
                    request_id,
                    requestee_id,
                    RequestStatus::PendingApproval.to_db_str()
                ],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((worker_id, completion_image)) = current else {
            return Ok(None);
        };

        let rating_id = match worker_id {
            Some(worker_id) => Some(insert_rating_with_conn(
                &tx,
                request_id,
                worker_id,
                requestee_id,
                rating,
                decision.is_approved(),
                at,
            )?),
            None => None,
        };

        let removed_completion_image = match decision {
            ReviewDecision::Approve => {
                tx.execute(
                    r#"
                    UPDATE service_request
                    SET status = ?2, is_approved_by_requestee = 1, worker_rating = ?3,
                        approved_at = ?4, updated_at = ?4
                    WHERE request_id = ?1
                    "#,
                    params![
                        request_id,
                        RequestStatus::Completed.to_db_str(),
                        rating.value(),
                        ts
                    ],
                )?;
                None
            }
            ReviewDecision::Reject => {
                tx.execute(
                    r#"
                    UPDATE service_request
                    SET status = ?2, is_approved_by_requestee = 0, worker_rating = ?3,
                        assigned_worker_id = NULL, assigned_at = NULL, approved_at = NULL,
                        completion_image = NULL, updated_at = ?4
                    WHERE request_id = ?1
                    "#,
                    params![
                        request_id,
                        RequestStatus::Pending.to_db_str(),
                        rating.value(),
                        ts
                    ],
                )?;
                completion_image
            }
        };

        tx.commit()?;
        Ok(Some(ReviewApplied {
            decision,
            worker_id,
            rating_id,
            removed_completion_image,
        }))
    }
}
