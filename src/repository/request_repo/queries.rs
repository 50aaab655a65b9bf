use super::core::{map_request, map_view, RequestFilter, RequestPage, RequestRepository, RequestView, REQUEST_COLUMNS, VIEW_FROM};
use crate::domain::request::ServiceRequest;
use crate::domain::types::{Category, RequestStatus};
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Result as SqliteResult};

/// 检索条件 (?1 status, ?2 category, ?3 approved, ?4 关键字)
const SEARCH_WHERE: &str = r#"
    WHERE (?1 IS NULL OR r.status = ?1)
      AND (?2 IS NULL OR r.category = ?2)
      AND (?3 IS NULL OR r.is_approved_by_requestee = ?3)
      AND (?4 IS NULL
           OR r.location LIKE '%' || ?4 || '%'
           OR COALESCE(r.description, '') LIKE '%' || ?4 || '%'
           OR ra.username LIKE '%' || ?4 || '%'
           OR COALESCE(wa.username, '') LIKE '%' || ?4 || '%'
           OR r.category LIKE '%' || ?4 || '%')
"#;

impl RequestRepository {
    // ==========================================
    // 报修人 / 维修工视角
    // ==========================================

    /// 报修人自己的工单（最近更新在前）
    pub fn list_by_requestee(&self, requestee_id: i64) -> RepositoryResult<Vec<RequestView>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {}, ra.username, wa.username {} WHERE r.requestee_id = ?1 ORDER BY r.updated_at DESC, r.request_id DESC",
            REQUEST_COLUMNS, VIEW_FROM
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![requestee_id], map_view)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 维修工当前任务（Assigned, 正常情况下至多一条）
    pub fn find_current_task(&self, worker_id: i64) -> RepositoryResult<Option<RequestView>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {}, ra.username, wa.username {} WHERE r.assigned_worker_id = ?1 AND r.status = ?2 ORDER BY r.assigned_at DESC LIMIT 1",
            REQUEST_COLUMNS, VIEW_FROM
        );
        match conn.query_row(
            &sql,
            params![worker_id, RequestStatus::Assigned.to_db_str()],
            map_view,
        ) {
            Ok(view) => Ok(Some(view)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 维修工最近完成的工单（approved_at 倒序）
    pub fn list_completed_by_worker(&self, worker_id: i64, limit: i64) -> RepositoryResult<Vec<RequestView>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {}, ra.username, wa.username {} WHERE r.assigned_worker_id = ?1 AND r.status = ?2 ORDER BY r.approved_at DESC, r.request_id DESC LIMIT ?3",
            REQUEST_COLUMNS, VIEW_FROM
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![worker_id, RequestStatus::Completed.to_db_str(), limit],
                map_view,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 维修工是否存在 Assigned 工单
    pub fn has_assigned(&self, worker_id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM service_request WHERE assigned_worker_id = ?1 AND status = ?2)",
            params![worker_id, RequestStatus::Assigned.to_db_str()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    // ==========================================
    // 派单队列
    // ==========================================

    /// 某类别最早的待派工单（created_at, request_id 升序）
    pub fn find_oldest_pending(&self, category: Category) -> RepositoryResult<Option<ServiceRequest>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM service_request r WHERE r.status = ?1 AND r.category = ?2 ORDER BY r.created_at ASC, r.request_id ASC LIMIT 1",
            REQUEST_COLUMNS
        );
        match conn.query_row(
            &sql,
            params![RequestStatus::Pending.to_db_str(), category.to_db_str()],
            |row| map_request(row, 0),
        ) {
            Ok(request) => Ok(Some(request)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ==========================================
    // 管理员统计
    // ==========================================

    /// 各状态工单数（按 RequestStatus::ALL 顺序, 缺失补 0）
    pub fn count_by_status(&self) -> RepositoryResult<Vec<(RequestStatus, i64)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM service_request GROUP BY status")?;
        let raw = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(RequestStatus::ALL
            .iter()
            .map(|status| {
                let count = raw
                    .iter()
                    .find(|(s, _)| RequestStatus::parse(s) == Some(*status))
                    .map(|(_, c)| *c)
                    .unwrap_or(0);
                (*status, count)
            })
            .collect())
    }

    /// 各类别待派工单数（按 Category::ALL 顺序, 缺失补 0）
    pub fn count_pending_by_category(&self) -> RepositoryResult<Vec<(Category, i64)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) FROM service_request WHERE status = ?1 GROUP BY category",
        )?;
        let raw = stmt
            .query_map(params![RequestStatus::Pending.to_db_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(Category::ALL
            .iter()
            .map(|category| {
                let count = raw
                    .iter()
                    .find(|(c, _)| Category::parse(c) == Some(*category))
                    .map(|(_, n)| *n)
                    .unwrap_or(0);
                (*category, count)
            })
            .collect())
    }

    /// 某状态的最近工单
    ///
    /// 排序列随状态变化:
    /// - Pending: created_at
    /// - Assigned: assigned_at
    /// - Pending Approval: updated_at
    /// - Completed: approved_at
    pub fn list_recent_by_status(&self, status: RequestStatus, limit: i64) -> RepositoryResult<Vec<RequestView>> {
        let order_column = match status {
            RequestStatus::Pending => "r.created_at",
            RequestStatus::Assigned => "r.assigned_at",
            RequestStatus::PendingApproval => "r.updated_at",
            RequestStatus::Completed => "r.approved_at",
        };

        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {}, ra.username, wa.username {} WHERE r.status = ?1 ORDER BY {} DESC, r.request_id DESC LIMIT ?2",
            REQUEST_COLUMNS, VIEW_FROM, order_column
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![status.to_db_str(), limit], map_view)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    // ==========================================
    // 检索 / 导出
    // ==========================================

    /// 分页检索（created_at 倒序, page 从 1 开始）
    pub fn search(&self, filter: &RequestFilter, page: i64, page_size: i64) -> RepositoryResult<RequestPage> {
        let page = page.max(1);
        let page_size = page_size.max(1);

        let conn = self.get_conn()?;
        let status = filter.status.map(|s| s.to_db_str());
        let category = filter.category.map(|c| c.to_db_str());
        let query = filter.query_term();

        let count_sql = format!("SELECT COUNT(*) {} {}", VIEW_FROM, SEARCH_WHERE);
        let total: i64 = conn.query_row(
            &count_sql,
            params![status, category, filter.approved, query],
            |row| row.get(0),
        )?;

        // 偏移量溢出时页码必然越过末页
        let Some(offset) = (page - 1).checked_mul(page_size) else {
            return Ok(RequestPage {
                items: Vec::new(),
                total,
                page,
                page_size,
            });
        };

        let sql = format!(
            "SELECT {}, ra.username, wa.username {} {} ORDER BY r.created_at DESC, r.request_id DESC LIMIT ?5 OFFSET ?6",
            REQUEST_COLUMNS, VIEW_FROM, SEARCH_WHERE
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(
                params![
                    status,
                    category,
                    filter.approved,
                    query,
                    page_size,
                    offset
                ],
                map_view,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(RequestPage {
            items,
            total,
            page,
            page_size,
        })
    }

    /// 检索全部命中（导出用, 不分页）
    pub fn search_all(&self, filter: &RequestFilter) -> RepositoryResult<Vec<RequestView>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {}, ra.username, wa.username {} {} ORDER BY r.created_at DESC, r.request_id DESC",
            REQUEST_COLUMNS, VIEW_FROM, SEARCH_WHERE
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(
                params![
                    filter.status.map(|s| s.to_db_str()),
                    filter.category.map(|c| c.to_db_str()),
                    filter.approved,
                    filter.query_term()
                ],
                map_view,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(items)
    }
}
