use super::*;

use std::io::Write;

use crate::db::format_ts;
use crate::repository::{RequestFilter, RequestPage};

/// 审计查询单次上限
const MAX_LOG_LIMIT: i64 = 500;

/// 导出列（顺序与 export_row 对应）
pub const CSV_HEADERS: [&str; 12] = [
    "request_id",
    "category",
    "location",
    "description",
    "status",
    "requestee",
    "worker",
    "created_at",
    "assigned_at",
    "approved",
    "worker_rating",
    "approved_at",
];

impl AdminApi {
    // ==========================================
    // 工单检索与导出
    // ==========================================

    /// 工单检索（created_at 倒序, 分页从 1 开始）
    pub fn search_requests(
        &self,
        session: &Session,
        filter: &RequestFilter,
        page: i64,
    ) -> ApiResult<RequestPage> {
        session.require_admin()?;
        let page_size = self.config_manager.get_admin_page_size()?;
        Ok(self.request_repo.search(filter, page.max(1), page_size)?)
    }

    /// 导出检索结果为 CSV
    ///
    /// # 返回
    /// 导出的行数（不含表头）
    pub fn export_requests_csv<W: Write>(
        &self,
        session: &Session,
        filter: &RequestFilter,
        writer: W,
    ) -> ApiResult<usize> {
        session.require_admin()?;

        let rows = self.request_repo.search_all(filter)?;
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(CSV_HEADERS).map_err(csv_error)?;
        for view in &rows {
            csv_writer.write_record(export_row(view)).map_err(csv_error)?;
        }
        csv_writer
            .flush()
            .map_err(|e| ApiError::InternalError(format!("CSV写入失败: {}", e)))?;

        tracing::info!(rows = rows.len(), admin = %session.username, "工单已导出");
        Ok(rows.len())
    }

    // ==========================================
    // 审计查询
    // ==========================================

    pub fn action_logs(
        &self,
        session: &Session,
        action_type: Option<ActionType>,
        limit: i64,
    ) -> ApiResult<Vec<ActionLog>> {
        session.require_admin()?;
        if limit <= 0 {
            return Err(ApiError::InvalidInput("limit 必须大于0".to_string()));
        }
        Ok(self
            .action_log_repo
            .list_recent(action_type, limit.min(MAX_LOG_LIMIT))?)
    }

    /// 单张工单的完整操作历史（时间升序）
    pub fn request_history(&self, session: &Session, request_id: i64) -> ApiResult<Vec<ActionLog>> {
        session.require_admin()?;
        if self.request_repo.find_by_id(request_id)?.is_none() {
            return Err(ApiError::NotFound(format!("工单(id={})不存在", request_id)));
        }
        Ok(self.action_log_repo.list_by_request(request_id)?)
    }
}

fn export_row(view: &RequestView) -> Vec<String> {
    let r = &view.request;
    vec![
        r.request_id.to_string(),
        r.category.to_string(),
        r.location.clone(),
        r.description.clone().unwrap_or_default(),
        r.status.to_string(),
        view.requestee_username.clone(),
        view.worker_username.clone().unwrap_or_default(),
        format_ts(&r.created_at),
        r.assigned_at.as_ref().map(format_ts).unwrap_or_default(),
        r.is_approved_by_requestee.to_string(),
        r.worker_rating
            .map(|rating| rating.label().to_string())
            .unwrap_or_default(),
        r.approved_at.as_ref().map(format_ts).unwrap_or_default(),
    ]
}

fn csv_error(err: csv::Error) -> ApiError {
    ApiError::InternalError(format!("CSV写入失败: {}", err))
}
