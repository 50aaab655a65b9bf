use crate::db::{format_ts, now_utc, SharedConnection};
use crate::domain::request::{NewServiceRequest, ServiceRequest};
use crate::domain::types::{Category, RequestStatus};
use crate::repository::codec::{get_category, get_opt_rating, get_opt_ts, get_status, get_ts};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use serde::{Deserialize, Serialize};

/// service_request 全部列（固定顺序, 与 map_request 对应）
pub(super) const REQUEST_COLUMNS: &str = r#"
    r.request_id, r.requestee_id, r.category, r.location, r.description,
    r.request_image, r.completion_image, r.status, r.created_at, r.updated_at,
    r.assigned_worker_id, r.assigned_at, r.is_approved_by_requestee,
    r.worker_rating, r.approved_at
"#;

/// 工单视图查询（附带报修人 / 维修工用户名）
pub(super) const VIEW_FROM: &str = r#"
    FROM service_request r
    JOIN user_account ra ON ra.user_id = r.requestee_id
    LEFT JOIN user_account wa ON wa.user_id = r.assigned_worker_id
"#;

// ==========================================
// 读模型
// ==========================================

/// 工单 + 关联用户名
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestView {
    #[serde(flatten)]
    pub request: ServiceRequest,
    pub requestee_username: String,
    pub worker_username: Option<String>,
}

/// 工单检索条件（管理员列表 / 导出）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub category: Option<Category>,
    pub approved: Option<bool>,
    /// 模糊匹配: 地点 / 描述 / 报修人 / 维修工 / 类别
    pub query: Option<String>,
}

impl RequestFilter {
    pub(super) fn query_term(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// 分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestPage {
    pub items: Vec<RequestView>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

impl RequestPage {
    pub fn page_count(&self) -> i64 {
        if self.page_size <= 0 {
            return 0;
        }
        let full = self.total / self.page_size;
        if self.total % self.page_size == 0 {
            full
        } else {
            full + 1
        }
    }
}

// ==========================================
// RequestRepository - 服务工单仓储
// ==========================================
pub struct RequestRepository {
    conn: SharedConnection,
}

impl RequestRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新建工单（状态 Pending）
    ///
    /// # 返回
    /// - `Ok(request_id)`
    /// - `Err(ForeignKeyViolation)`: 报修人不存在
    pub fn insert(&self, new_request: &NewServiceRequest) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let now = format_ts(&now_utc());

        conn.execute(
            r#"
            INSERT INTO service_request (
                requestee_id, category, location, description, request_image,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            "#,
            params![
                new_request.requestee_id,
                new_request.category.to_db_str(),
                new_request.location,
                new_request.description,
                new_request.request_image,
                RequestStatus::Pending.to_db_str(),
                now,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub fn find_by_id(&self, request_id: i64) -> RepositoryResult<Option<ServiceRequest>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM service_request r WHERE r.request_id = ?1",
            REQUEST_COLUMNS
        );
        match conn.query_row(&sql, params![request_id], |row| map_request(row, 0)) {
            Ok(request) => Ok(Some(request)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_view(&self, request_id: i64) -> RepositoryResult<Option<RequestView>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {}, ra.username, wa.username {} WHERE r.request_id = ?1",
            REQUEST_COLUMNS, VIEW_FROM
        );
        match conn.query_row(&sql, params![request_id], map_view) {
            Ok(view) => Ok(Some(view)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按 (工单, 报修人, 状态) 定位工单; 任一不符即 None
    pub fn find_for_requestee(
        &self,
        request_id: i64,
        requestee_id: i64,
        status: RequestStatus,
    ) -> RepositoryResult<Option<ServiceRequest>> {
        Ok(self
            .find_by_id(request_id)?
            .filter(|r| r.requestee_id == requestee_id && r.status == status))
    }

    /// 按 (工单, 维修工, 状态) 定位工单; 任一不符即 None
    pub fn find_for_worker(
        &self,
        request_id: i64,
        worker_id: i64,
        status: RequestStatus,
    ) -> RepositoryResult<Option<ServiceRequest>> {
        Ok(self
            .find_by_id(request_id)?
            .filter(|r| r.is_assigned_to(worker_id) && r.status == status))
    }
}

// ==========================================
// 行映射
// ==========================================

pub(super) fn map_request(row: &Row<'_>, o: usize) -> SqliteResult<ServiceRequest> {
    Ok(ServiceRequest {
        request_id: row.get(o)?,
        requestee_id: row.get(o + 1)?,
        category: get_category(row, o + 2)?,
        location: row.get(o + 3)?,
        description: row.get(o + 4)?,
        request_image: row.get(o + 5)?,
        completion_image: row.get(o + 6)?,
        status: get_status(row, o + 7)?,
        created_at: get_ts(row, o + 8)?,
        updated_at: get_ts(row, o + 9)?,
        assigned_worker_id: row.get(o + 10)?,
        assigned_at: get_opt_ts(row, o + 11)?,
        is_approved_by_requestee: row.get(o + 12)?,
        worker_rating: get_opt_rating(row, o + 13)?,
        approved_at: get_opt_ts(row, o + 14)?,
    })
}

pub(super) fn map_view(row: &Row<'_>) -> SqliteResult<RequestView> {
    Ok(RequestView {
        request: map_request(row, 0)?,
        requestee_username: row.get(15)?,
        worker_username: row.get(16)?,
    })
}
